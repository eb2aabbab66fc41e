use std::collections::HashSet;

use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::{
    Category, CategoryKind, EngineError, OperationKind, ResultEngine, categories, lifecycle,
    lifecycle::Audit,
    position,
    util::normalize_title,
};

use super::{
    Engine, find_active_category_by_title, find_category_by_title, impl_delete_op, impl_read_ops,
    impl_reposition_op, impl_restore_op, require_active_category, require_category, with_tx,
};

/// Field patch for [`Engine::update_category`]; `None` leaves the stored
/// value untouched. `parent` distinguishes "leave as-is" (`None`) from
/// "detach from any parent" (`Some(None)`).
#[derive(Clone, Debug, Default)]
pub struct CategoryPatch {
    pub title: Option<String>,
    pub operation_kind: Option<OperationKind>,
    pub kind: Option<CategoryKind>,
    pub parent: Option<Option<i64>>,
}

/// Walks the ancestor chain of `parent_id` and rejects any path leading back
/// to `id`.
async fn ensure_no_cycle<C: ConnectionTrait>(
    db: &C,
    id: i64,
    mut parent_id: Option<i64>,
) -> ResultEngine<()> {
    let mut seen = HashSet::new();
    while let Some(current) = parent_id {
        if current == id {
            return Err(EngineError::InvalidParent(
                "category must not be its own ancestor".to_string(),
            ));
        }
        if !seen.insert(current) {
            break;
        }
        parent_id = require_category(db, current).await?.parent_id;
    }
    Ok(())
}

impl Engine {
    impl_read_ops!(categories, Category, category, categories, categories_with_deleted);
    impl_delete_op!(categories, Category, "category", delete_category);
    impl_restore_op!(categories, Category, "category", restore_category);
    impl_reposition_op!(categories, Category, "category", change_category_position);

    /// Add a new category.
    ///
    /// `parent_id`, when set, must reference an existing active category.
    pub async fn new_category(
        &self,
        title: &str,
        operation_kind: OperationKind,
        kind: CategoryKind,
        parent_id: Option<i64>,
        actor: &str,
    ) -> ResultEngine<Category> {
        let now = chrono::Utc::now();
        let title = normalize_title(title, "title")?;
        with_tx!(self, |db_tx| {
            if let Some(parent_id) = parent_id {
                require_active_category(&db_tx, parent_id).await?;
            }
            if find_active_category_by_title(&db_tx, &title).await?.is_some() {
                return Err(EngineError::ExistingKey(title));
            }

            let rows = categories::Entity::find().all(&db_tx).await?;
            let category = Category {
                id: 0,
                title,
                operation_kind,
                kind,
                parent_id,
                position: position::next_position(rows.iter().map(|model| model.position)),
                audit: Audit::new(actor, now),
            };
            let model = categories::ActiveModel::from(&category).insert(&db_tx).await?;
            tracing::debug!(id = model.id, actor, "created category");
            Category::try_from(model)
        })
    }

    /// Look a category up by title, reviving or creating it as needed.
    ///
    /// A missing title becomes a fresh root expense category.
    pub async fn get_or_create_category(&self, title: &str, actor: &str) -> ResultEngine<Category> {
        let now = chrono::Utc::now();
        let title = normalize_title(title, "title")?;
        with_tx!(self, |db_tx| {
            if let Some(model) = find_active_category_by_title(&db_tx, &title).await? {
                Category::try_from(model)
            } else if let Some(model) = find_category_by_title(&db_tx, &title).await? {
                let mut row = Category::try_from(model)?;
                lifecycle::mark_restored(&mut row, actor, now, "category")?;
                let active = categories::ActiveModel {
                    id: ActiveValue::Set(row.id),
                    deleted_at: ActiveValue::Set(None),
                    deleted_by: ActiveValue::Set(None),
                    updated_at: ActiveValue::Set(row.audit.updated_at),
                    updated_by: ActiveValue::Set(row.audit.updated_by.clone()),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
                Ok(row)
            } else {
                let rows = categories::Entity::find().all(&db_tx).await?;
                let category = Category {
                    id: 0,
                    title,
                    operation_kind: OperationKind::Expense,
                    kind: CategoryKind::Parent,
                    parent_id: None,
                    position: position::next_position(rows.iter().map(|model| model.position)),
                    audit: Audit::new(actor, now),
                };
                let model = categories::ActiveModel::from(&category).insert(&db_tx).await?;
                Category::try_from(model)
            }
        })
    }

    /// Patch an existing category; a deleted row is restored first.
    ///
    /// Re-parenting verifies the new parent exists, is active and does not
    /// make the category its own ancestor.
    pub async fn update_category(
        &self,
        id: i64,
        patch: CategoryPatch,
        actor: &str,
    ) -> ResultEngine<Category> {
        let now = chrono::Utc::now();
        let title = patch
            .title
            .as_deref()
            .map(|value| normalize_title(value, "title"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let model = require_category(&db_tx, id).await?;
            let mut row = Category::try_from(model)?;
            if !row.audit.is_active() {
                lifecycle::mark_restored(&mut row, actor, now, "category")?;
            }

            if let Some(title) = title {
                let exists = categories::Entity::find()
                    .filter(categories::Column::DeletedAt.is_null())
                    .filter(Expr::cust("LOWER(title)").eq(title.to_lowercase()))
                    .filter(categories::Column::Id.ne(id))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if exists {
                    return Err(EngineError::ExistingKey(title));
                }
                row.title = title;
            }
            if let Some(operation_kind) = patch.operation_kind {
                row.operation_kind = operation_kind;
            }
            if let Some(kind) = patch.kind {
                row.kind = kind;
            }
            if let Some(parent) = patch.parent {
                if let Some(parent_id) = parent {
                    require_active_category(&db_tx, parent_id).await?;
                    ensure_no_cycle(&db_tx, id, Some(parent_id)).await?;
                }
                row.parent_id = parent;
            }
            lifecycle::touch(&mut row, actor, now);

            let active = categories::ActiveModel {
                id: ActiveValue::Set(id),
                title: ActiveValue::Set(row.title.clone()),
                operation_kind: ActiveValue::Set(row.operation_kind.as_str().to_string()),
                kind: ActiveValue::Set(row.kind.as_str().to_string()),
                parent_id: ActiveValue::Set(row.parent_id),
                deleted_at: ActiveValue::Set(row.audit.deleted_at),
                deleted_by: ActiveValue::Set(row.audit.deleted_by.clone()),
                updated_at: ActiveValue::Set(row.audit.updated_at),
                updated_by: ActiveValue::Set(row.audit.updated_by.clone()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(row)
        })
    }

    /// Return the active category with this title.
    pub async fn category_by_title(&self, title: &str) -> ResultEngine<Option<Category>> {
        let title = normalize_title(title, "title")?;
        let model = find_active_category_by_title(&self.database, &title).await?;
        model.map(Category::try_from).transpose()
    }

    /// Soft-delete the active category with this title.
    ///
    /// Returns `false` when no active category carries the title.
    pub async fn delete_category_by_title(&self, title: &str, actor: &str) -> ResultEngine<bool> {
        let title = normalize_title(title, "title")?;
        let Some(model) = find_active_category_by_title(&self.database, &title).await? else {
            return Ok(false);
        };
        self.delete_category(model.id, actor).await
    }

    /// Active categories of one movement direction, ordered by position.
    pub async fn categories_by_operation_kind(
        &self,
        operation_kind: OperationKind,
    ) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(categories::Column::DeletedAt.is_null())
            .filter(categories::Column::OperationKind.eq(operation_kind.as_str()))
            .order_by_asc(categories::Column::Position)
            .all(&self.database)
            .await?;
        models.into_iter().map(Category::try_from).collect()
    }

    /// Active children of one category, ordered by position.
    pub async fn subcategories(&self, parent_id: i64) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(categories::Column::DeletedAt.is_null())
            .filter(categories::Column::ParentId.eq(parent_id))
            .order_by_asc(categories::Column::Position)
            .all(&self.database)
            .await?;
        models.into_iter().map(Category::try_from).collect()
    }
}
