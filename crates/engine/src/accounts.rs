//! The module contains the `Account` entity and its store model.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError,
    lifecycle::{Audit, Audited},
    position::Positioned,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Current,
    Savings,
    Credit,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Savings => "savings",
            Self::Credit => "credit",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "current" => Ok(Self::Current),
            "savings" => Ok(Self::Savings),
            "credit" => Ok(Self::Credit),
            other => Err(EngineError::validation(
                "kind",
                format!("invalid account kind: {other}"),
            )),
        }
    }
}

/// A place money is kept: a wallet, a bank account, a credit line.
///
/// `amount_minor` is the current balance in minor units of the account's
/// currency. `closed` is a display flag and is independent of the
/// soft-delete lifecycle: a closed account is still active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub title: String,
    pub kind: AccountKind,
    pub amount_minor: i64,
    pub currency_id: i64,
    pub closed: bool,
    pub position: i64,
    pub audit: Audit,
}

impl Audited for Account {
    fn audit(&self) -> &Audit {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

impl Positioned for Account {
    fn position(&self) -> i64 {
        self.position
    }
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub kind: String,
    pub amount_minor: i64,
    pub currency_id: i64,
    pub closed: bool,
    pub position: i64,
    pub created_at: DateTimeUtc,
    pub created_by: String,
    pub updated_at: DateTimeUtc,
    pub updated_by: String,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::currencies::Entity",
        from = "Column::CurrencyId",
        to = "super::currencies::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Currencies,
    #[sea_orm(has_many = "super::operations::Entity")]
    Operations,
}

impl Related<super::currencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Currencies.def()
    }
}

impl Related<super::operations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Operations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::NotSet,
            title: ActiveValue::Set(value.title.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(value.amount_minor),
            currency_id: ActiveValue::Set(value.currency_id),
            closed: ActiveValue::Set(value.closed),
            position: ActiveValue::Set(value.position),
            created_at: ActiveValue::Set(value.audit.created_at),
            created_by: ActiveValue::Set(value.audit.created_by.clone()),
            updated_at: ActiveValue::Set(value.audit.updated_at),
            updated_by: ActiveValue::Set(value.audit.updated_by.clone()),
            deleted_at: ActiveValue::Set(value.audit.deleted_at),
            deleted_by: ActiveValue::Set(value.audit.deleted_by.clone()),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            title: model.title,
            kind: AccountKind::try_from(model.kind.as_str())?,
            amount_minor: model.amount_minor,
            currency_id: model.currency_id,
            closed: model.closed,
            position: model.position,
            audit: Audit {
                created_at: model.created_at,
                created_by: model.created_by,
                updated_at: model.updated_at,
                updated_by: model.updated_by,
                deleted_at: model.deleted_at,
                deleted_by: model.deleted_by,
            },
        })
    }
}
