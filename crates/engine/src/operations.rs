//! Operation primitives.
//!
//! An `Operation` is a dated money movement against one account. A transfer
//! is the same record with a second leg: the three `to_*` fields travel
//! together as a [`TransferLeg`], so "all three present or all absent" is
//! guaranteed by the type rather than by convention.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError,
    lifecycle::{Audit, Audited},
    position::Positioned,
};

pub use crate::categories::OperationKind;

/// Destination side of a transfer operation.
///
/// `to_amount_minor` is denominated in the destination account's currency,
/// which is why a transfer carries two amounts instead of converting at read
/// time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLeg {
    pub to_account_id: i64,
    pub to_currency_id: i64,
    pub to_amount_minor: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub id: i64,
    pub kind: OperationKind,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub comment: Option<String>,
    pub category_id: Option<i64>,
    pub account_id: i64,
    pub currency_id: i64,
    pub transfer: Option<TransferLeg>,
    pub position: i64,
    pub audit: Audit,
}

impl Operation {
    /// Returns `true` when the operation carries a destination leg.
    #[must_use]
    pub fn is_transfer(&self) -> bool {
        self.transfer.is_some()
    }
}

impl Audited for Operation {
    fn audit(&self) -> &Audit {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

impl Positioned for Operation {
    fn position(&self) -> i64 {
        self.position
    }
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "operations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub kind: String,
    pub occurred_at: DateTimeUtc,
    pub amount_minor: i64,
    pub comment: Option<String>,
    pub category_id: Option<i64>,
    pub account_id: i64,
    pub currency_id: i64,
    pub to_account_id: Option<i64>,
    pub to_currency_id: Option<i64>,
    pub to_amount_minor: Option<i64>,
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
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::ToAccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    ToAccounts,
    #[sea_orm(
        belongs_to = "super::currencies::Entity",
        from = "Column::CurrencyId",
        to = "super::currencies::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Currencies,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Categories,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Operation> for ActiveModel {
    fn from(value: &Operation) -> Self {
        Self {
            id: ActiveValue::NotSet,
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            occurred_at: ActiveValue::Set(value.occurred_at),
            amount_minor: ActiveValue::Set(value.amount_minor),
            comment: ActiveValue::Set(value.comment.clone()),
            category_id: ActiveValue::Set(value.category_id),
            account_id: ActiveValue::Set(value.account_id),
            currency_id: ActiveValue::Set(value.currency_id),
            to_account_id: ActiveValue::Set(value.transfer.map(|leg| leg.to_account_id)),
            to_currency_id: ActiveValue::Set(value.transfer.map(|leg| leg.to_currency_id)),
            to_amount_minor: ActiveValue::Set(value.transfer.map(|leg| leg.to_amount_minor)),
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

impl TryFrom<Model> for Operation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let transfer = match (
            model.to_account_id,
            model.to_currency_id,
            model.to_amount_minor,
        ) {
            (None, None, None) => None,
            (Some(to_account_id), Some(to_currency_id), Some(to_amount_minor)) => {
                Some(TransferLeg {
                    to_account_id,
                    to_currency_id,
                    to_amount_minor,
                })
            }
            _ => {
                return Err(EngineError::validation(
                    "transfer",
                    "stored transfer leg is incomplete",
                ));
            }
        };

        Ok(Self {
            id: model.id,
            kind: OperationKind::try_from(model.kind.as_str())?,
            occurred_at: model.occurred_at,
            amount_minor: model.amount_minor,
            comment: model.comment,
            category_id: model.category_id,
            account_id: model.account_id,
            currency_id: model.currency_id,
            transfer,
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
