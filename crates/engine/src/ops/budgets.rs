use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    Budget, EngineError, ResultEngine, budgets, lifecycle,
    lifecycle::Audit,
    position,
    util::validate_positive_amount_minor,
};

use super::{
    Engine, impl_delete_op, impl_read_ops, impl_reposition_op, require_active_category,
    require_currency, with_tx,
};

/// Field patch for [`Engine::update_budget`]; `None` leaves the stored value
/// untouched. `category` distinguishes "leave as-is" (`None`) from "detach
/// from any category" (`Some(None)`).
#[derive(Clone, Debug, Default)]
pub struct BudgetPatch {
    pub amount_minor: Option<i64>,
    pub currency_id: Option<i64>,
    pub category: Option<Option<i64>>,
}

/// At most one active budget may reference a category; `exclude_id` skips
/// the row being updated.
async fn ensure_single_budget(
    db: &sea_orm::DatabaseTransaction,
    category_id: i64,
    exclude_id: Option<i64>,
) -> ResultEngine<()> {
    let mut query = budgets::Entity::find()
        .filter(budgets::Column::DeletedAt.is_null())
        .filter(budgets::Column::CategoryId.eq(category_id));
    if let Some(exclude_id) = exclude_id {
        query = query.filter(budgets::Column::Id.ne(exclude_id));
    }
    if query.one(db).await?.is_some() {
        return Err(EngineError::ExistingKey(format!(
            "budget for category {category_id}"
        )));
    }
    Ok(())
}

impl Engine {
    impl_read_ops!(budgets, Budget, budget, budgets, budgets_with_deleted);
    impl_delete_op!(budgets, Budget, "budget", delete_budget);
    impl_reposition_op!(budgets, Budget, "budget", change_budget_position);

    /// Restores a soft-deleted budget, keeping its frozen position.
    ///
    /// Returns `None` when the id is unknown; an active row comes back
    /// unchanged. Fails with `ExistingKey` when another active budget took
    /// the same category while this one was deleted.
    pub async fn restore_budget(&self, id: i64, actor: &str) -> ResultEngine<Option<Budget>> {
        let now = chrono::Utc::now();
        with_tx!(self, |db_tx| {
            let Some(model) = budgets::Entity::find_by_id(id).one(&db_tx).await? else {
                return Ok(None);
            };
            let mut row = Budget::try_from(model)?;
            if row.audit.is_active() {
                return Ok(Some(row));
            }
            if let Some(category_id) = row.category_id {
                ensure_single_budget(&db_tx, category_id, Some(id)).await?;
            }
            lifecycle::mark_restored(&mut row, actor, now, "budget")?;
            let active = budgets::ActiveModel {
                id: ActiveValue::Set(id),
                deleted_at: ActiveValue::Set(None),
                deleted_by: ActiveValue::Set(None),
                updated_at: ActiveValue::Set(row.audit.updated_at),
                updated_by: ActiveValue::Set(row.audit.updated_by.clone()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            tracing::debug!(id, actor, "restored budget");
            Ok(Some(row))
        })
    }

    /// Add a new budget.
    ///
    /// `category_id`, when set, must reference an existing active category
    /// carrying no other active budget.
    pub async fn new_budget(
        &self,
        amount_minor: i64,
        currency_id: i64,
        category_id: Option<i64>,
        actor: &str,
    ) -> ResultEngine<Budget> {
        let now = chrono::Utc::now();
        let amount_minor = validate_positive_amount_minor(amount_minor, "amount_minor")?;
        with_tx!(self, |db_tx| {
            require_currency(&db_tx, currency_id).await?;
            if let Some(category_id) = category_id {
                require_active_category(&db_tx, category_id).await?;
                ensure_single_budget(&db_tx, category_id, None).await?;
            }

            let rows = budgets::Entity::find().all(&db_tx).await?;
            let budget = Budget {
                id: 0,
                amount_minor,
                currency_id,
                category_id,
                position: position::next_position(rows.iter().map(|model| model.position)),
                audit: Audit::new(actor, now),
            };
            let model = budgets::ActiveModel::from(&budget).insert(&db_tx).await?;
            tracing::debug!(id = model.id, actor, "created budget");
            Budget::try_from(model)
        })
    }

    /// Patch an existing budget; a deleted row is restored first.
    pub async fn update_budget(
        &self,
        id: i64,
        patch: BudgetPatch,
        actor: &str,
    ) -> ResultEngine<Budget> {
        let now = chrono::Utc::now();
        let amount_minor = patch
            .amount_minor
            .map(|value| validate_positive_amount_minor(value, "amount_minor"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let model = budgets::Entity::find_by_id(id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("budget not exists".to_string()))?;
            let mut row = Budget::try_from(model)?;
            let was_deleted = !row.audit.is_active();
            if was_deleted {
                lifecycle::mark_restored(&mut row, actor, now, "budget")?;
            }

            if let Some(amount_minor) = amount_minor {
                row.amount_minor = amount_minor;
            }
            if let Some(currency_id) = patch.currency_id {
                require_currency(&db_tx, currency_id).await?;
                row.currency_id = currency_id;
            }
            if let Some(category) = patch.category {
                if let Some(category_id) = category {
                    require_active_category(&db_tx, category_id).await?;
                    ensure_single_budget(&db_tx, category_id, Some(id)).await?;
                }
                row.category_id = category;
            } else if was_deleted
                && let Some(category_id) = row.category_id
            {
                // Reviving a budget must not break the one-per-category rule
                // if another budget took the slot in the meantime.
                ensure_single_budget(&db_tx, category_id, Some(id)).await?;
            }
            lifecycle::touch(&mut row, actor, now);

            let active = budgets::ActiveModel {
                id: ActiveValue::Set(id),
                amount_minor: ActiveValue::Set(row.amount_minor),
                currency_id: ActiveValue::Set(row.currency_id),
                category_id: ActiveValue::Set(row.category_id),
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

    /// The active budget tied to one category, if any.
    pub async fn budget_by_category(&self, category_id: i64) -> ResultEngine<Option<Budget>> {
        let model = budgets::Entity::find()
            .filter(budgets::Column::DeletedAt.is_null())
            .filter(budgets::Column::CategoryId.eq(category_id))
            .one(&self.database)
            .await?;
        model.map(Budget::try_from).transpose()
    }

    /// Active budgets denominated in one currency, ordered by position.
    pub async fn budgets_by_currency(&self, currency_id: i64) -> ResultEngine<Vec<Budget>> {
        let models = budgets::Entity::find()
            .filter(budgets::Column::DeletedAt.is_null())
            .filter(budgets::Column::CurrencyId.eq(currency_id))
            .order_by_asc(budgets::Column::Position)
            .all(&self.database)
            .await?;
        models.into_iter().map(Budget::try_from).collect()
    }
}
