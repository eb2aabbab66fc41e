//! The module contains the `Budget` entity and its store model.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError,
    lifecycle::{Audit, Audited},
    position::Positioned,
};

/// A spending limit, optionally tied to one category.
///
/// At most one **active** budget may reference a given category; the check
/// lives in the service layer, not the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub amount_minor: i64,
    pub currency_id: i64,
    pub category_id: Option<i64>,
    pub position: i64,
    pub audit: Audit,
}

impl Audited for Budget {
    fn audit(&self) -> &Audit {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

impl Positioned for Budget {
    fn position(&self) -> i64 {
        self.position
    }
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub amount_minor: i64,
    pub currency_id: i64,
    pub category_id: Option<i64>,
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
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Categories,
}

impl Related<super::currencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Currencies.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Budget> for ActiveModel {
    fn from(value: &Budget) -> Self {
        Self {
            id: ActiveValue::NotSet,
            amount_minor: ActiveValue::Set(value.amount_minor),
            currency_id: ActiveValue::Set(value.currency_id),
            category_id: ActiveValue::Set(value.category_id),
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

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            amount_minor: model.amount_minor,
            currency_id: model.currency_id,
            category_id: model.category_id,
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
