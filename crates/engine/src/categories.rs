//! The module contains the `Category` entity and its store model.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError,
    lifecycle::{Audit, Audited},
    position::Positioned,
};

/// Direction of the money movement a category (or operation) describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Income,
    Expense,
}

impl OperationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for OperationKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::validation(
                "operation_kind",
                format!("invalid operation kind: {other}"),
            )),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Parent,
    Child,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Child => "child",
        }
    }
}

impl TryFrom<&str> for CategoryKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "parent" => Ok(Self::Parent),
            "child" => Ok(Self::Child),
            other => Err(EngineError::validation(
                "kind",
                format!("invalid category kind: {other}"),
            )),
        }
    }
}

/// A label operations are grouped under.
///
/// Categories form a tree through `parent_id`; a category must never be its
/// own ancestor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub operation_kind: OperationKind,
    pub kind: CategoryKind,
    pub parent_id: Option<i64>,
    pub position: i64,
    pub audit: Audit,
}

impl Audited for Category {
    fn audit(&self) -> &Audit {
        &self.audit
    }
    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }
}

impl Positioned for Category {
    fn position(&self) -> i64 {
        self.position
    }
    fn set_position(&mut self, position: i64) {
        self.position = position;
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub title: String,
    pub operation_kind: String,
    pub kind: String,
    pub parent_id: Option<i64>,
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
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Parent,
    #[sea_orm(has_many = "super::budgets::Entity")]
    Budgets,
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budgets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Category> for ActiveModel {
    fn from(value: &Category) -> Self {
        Self {
            id: ActiveValue::NotSet,
            title: ActiveValue::Set(value.title.clone()),
            operation_kind: ActiveValue::Set(value.operation_kind.as_str().to_string()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            parent_id: ActiveValue::Set(value.parent_id),
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

impl TryFrom<Model> for Category {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            title: model.title,
            operation_kind: OperationKind::try_from(model.operation_kind.as_str())?,
            kind: CategoryKind::try_from(model.kind.as_str())?,
            parent_id: model.parent_id,
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
