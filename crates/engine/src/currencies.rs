//! The module contains the `Currency` entity and its store model.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    lifecycle::{Audit, Audited},
    position::Positioned,
};

/// A user-defined currency.
///
/// `exchange_rate` expresses the value of one minor unit of this currency in
/// minor units of the **main** currency; the main currency itself carries a
/// rate of exactly `1.0` and acts as the pivot for every conversion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub id: i64,
    pub title: String,
    pub short_name: String,
    pub exchange_rate: f64,
    pub position: i64,
    pub audit: Audit,
}

impl Currency {
    /// Exchange rate of the main currency.
    pub const MAIN_RATE: f64 = 1.0;

    /// Returns `true` when this currency is the conversion pivot.
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.exchange_rate == Self::MAIN_RATE
    }
}

impl Audited for Currency {
    fn audit(&self) -> &Audit {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

impl Positioned for Currency {
    fn position(&self) -> i64 {
        self.position
    }
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "currencies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub short_name: String,
    pub exchange_rate: f64,
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
    #[sea_orm(has_many = "super::accounts::Entity")]
    Accounts,
    #[sea_orm(has_many = "super::budgets::Entity")]
    Budgets,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Currency> for ActiveModel {
    fn from(value: &Currency) -> Self {
        Self {
            id: ActiveValue::NotSet,
            title: ActiveValue::Set(value.title.clone()),
            short_name: ActiveValue::Set(value.short_name.clone()),
            exchange_rate: ActiveValue::Set(value.exchange_rate),
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

impl TryFrom<Model> for Currency {
    type Error = crate::EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            title: model.title,
            short_name: model.short_name,
            exchange_rate: model.exchange_rate,
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
