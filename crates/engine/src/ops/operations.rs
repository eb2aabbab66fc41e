use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};

use crate::{
    EngineError, Operation, OperationKind, ResultEngine, TransferLeg, accounts, lifecycle,
    lifecycle::Audit,
    operations, position,
    util::validate_positive_amount_minor,
};

use super::{
    Engine, impl_read_ops, impl_reposition_op, require_account, require_active_account,
    require_active_category, require_currency, with_tx,
};

/// Input for [`Engine::new_operation`].
///
/// `amount_minor` is denominated in the operation's currency, which must
/// match the account's; a transfer's `to_amount_minor` is denominated in the
/// destination account's currency.
#[derive(Clone, Debug)]
pub struct OperationDraft {
    pub kind: OperationKind,
    pub occurred_at: DateTime<Utc>,
    pub amount_minor: i64,
    pub comment: Option<String>,
    pub category_id: Option<i64>,
    pub account_id: i64,
    pub currency_id: i64,
    pub transfer: Option<TransferLeg>,
}

/// Field patch for [`Engine::update_operation`]; `None` leaves the stored
/// value untouched. `comment`, `category` and `transfer` distinguish "leave
/// as-is" (`None`) from "clear" (`Some(None)`).
#[derive(Clone, Debug, Default)]
pub struct OperationPatch {
    pub kind: Option<OperationKind>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub amount_minor: Option<i64>,
    pub comment: Option<Option<String>>,
    pub category: Option<Option<i64>>,
    pub account_id: Option<i64>,
    pub currency_id: Option<i64>,
    pub transfer: Option<Option<TransferLeg>>,
}

/// Checks every reference an operation row carries: active source account
/// with a matching currency, existing category, and a well-formed transfer
/// leg against an active destination account.
async fn check_operation_references(
    db: &DatabaseTransaction,
    account_id: i64,
    currency_id: i64,
    category_id: Option<i64>,
    transfer: Option<&TransferLeg>,
) -> ResultEngine<()> {
    let account = require_active_account(db, account_id).await?;
    require_currency(db, currency_id).await?;
    if account.currency_id != currency_id {
        return Err(EngineError::validation(
            "currency_id",
            "must match the account currency",
        ));
    }
    if let Some(category_id) = category_id {
        require_active_category(db, category_id).await?;
    }
    if let Some(leg) = transfer {
        validate_positive_amount_minor(leg.to_amount_minor, "to_amount_minor")?;
        if leg.to_account_id == account_id {
            return Err(EngineError::validation(
                "to_account_id",
                "transfer must target a different account",
            ));
        }
        let to_account = require_active_account(db, leg.to_account_id).await?;
        require_currency(db, leg.to_currency_id).await?;
        if to_account.currency_id != leg.to_currency_id {
            return Err(EngineError::validation(
                "to_currency_id",
                "must match the destination account currency",
            ));
        }
    }
    Ok(())
}

/// Applies (`direction = 1`) or reverts (`direction = -1`) the balance
/// effect of an operation on its account(s).
///
/// A transfer moves `amount_minor` out of the source account and
/// `to_amount_minor` into the destination; otherwise the kind carries the
/// sign.
async fn apply_operation_effect(
    db: &DatabaseTransaction,
    operation: &Operation,
    direction: i64,
    actor: &str,
    now: DateTime<Utc>,
) -> ResultEngine<()> {
    match &operation.transfer {
        Some(leg) => {
            shift_account_amount(db, operation.account_id, -operation.amount_minor * direction, actor, now)
                .await?;
            shift_account_amount(db, leg.to_account_id, leg.to_amount_minor * direction, actor, now)
                .await?;
        }
        None => {
            let signed = match operation.kind {
                OperationKind::Income => operation.amount_minor,
                OperationKind::Expense => -operation.amount_minor,
            };
            shift_account_amount(db, operation.account_id, signed * direction, actor, now).await?;
        }
    }
    Ok(())
}

async fn shift_account_amount(
    db: &DatabaseTransaction,
    account_id: i64,
    delta_minor: i64,
    actor: &str,
    now: DateTime<Utc>,
) -> ResultEngine<()> {
    if delta_minor == 0 {
        return Ok(());
    }
    // Reverts must also reach accounts deleted after the operation was
    // recorded, so no active-only filter here.
    let model = require_account(db, account_id).await?;
    let active = accounts::ActiveModel {
        id: ActiveValue::Set(account_id),
        amount_minor: ActiveValue::Set(model.amount_minor + delta_minor),
        updated_at: ActiveValue::Set(now),
        updated_by: ActiveValue::Set(actor.to_string()),
        ..Default::default()
    };
    active.update(db).await?;
    Ok(())
}

impl Engine {
    impl_read_ops!(operations, Operation, operation, operations, operations_with_deleted);
    impl_reposition_op!(operations, Operation, "operation", change_operation_position);

    /// Record a money movement and apply it to the account balance(s).
    pub async fn new_operation(
        &self,
        draft: OperationDraft,
        actor: &str,
    ) -> ResultEngine<Operation> {
        let now = Utc::now();
        let amount_minor = validate_positive_amount_minor(draft.amount_minor, "amount_minor")?;
        with_tx!(self, |db_tx| {
            check_operation_references(
                &db_tx,
                draft.account_id,
                draft.currency_id,
                draft.category_id,
                draft.transfer.as_ref(),
            )
            .await?;

            let rows = operations::Entity::find().all(&db_tx).await?;
            let operation = Operation {
                id: 0,
                kind: draft.kind,
                occurred_at: draft.occurred_at,
                amount_minor,
                comment: draft.comment.clone(),
                category_id: draft.category_id,
                account_id: draft.account_id,
                currency_id: draft.currency_id,
                transfer: draft.transfer,
                position: position::next_position(rows.iter().map(|model| model.position)),
                audit: Audit::new(actor, now),
            };
            let model = operations::ActiveModel::from(&operation).insert(&db_tx).await?;
            let operation = Operation::try_from(model)?;
            apply_operation_effect(&db_tx, &operation, 1, actor, now).await?;
            tracing::debug!(id = operation.id, actor, "created operation");
            Ok(operation)
        })
    }

    /// Patch an existing operation and re-base its balance effect.
    ///
    /// The previously applied effect is reverted, the patch is applied and
    /// re-validated, then the new effect lands — all in one transaction. A
    /// deleted operation is restored first (its effect was already reverted
    /// at delete time, so only the new effect is applied).
    pub async fn update_operation(
        &self,
        id: i64,
        patch: OperationPatch,
        actor: &str,
    ) -> ResultEngine<Operation> {
        let now = Utc::now();
        let amount_minor = patch
            .amount_minor
            .map(|value| validate_positive_amount_minor(value, "amount_minor"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let model = operations::Entity::find_by_id(id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("operation not exists".to_string()))?;
            let mut row = Operation::try_from(model)?;
            let was_active = row.audit.is_active();
            if !was_active {
                lifecycle::mark_restored(&mut row, actor, now, "operation")?;
            } else {
                apply_operation_effect(&db_tx, &row, -1, actor, now).await?;
            }

            if let Some(kind) = patch.kind {
                row.kind = kind;
            }
            if let Some(occurred_at) = patch.occurred_at {
                row.occurred_at = occurred_at;
            }
            if let Some(amount_minor) = amount_minor {
                row.amount_minor = amount_minor;
            }
            if let Some(comment) = patch.comment {
                row.comment = comment;
            }
            if let Some(category) = patch.category {
                row.category_id = category;
            }
            if let Some(account_id) = patch.account_id {
                row.account_id = account_id;
            }
            if let Some(currency_id) = patch.currency_id {
                row.currency_id = currency_id;
            }
            if let Some(transfer) = patch.transfer {
                row.transfer = transfer;
            }

            check_operation_references(
                &db_tx,
                row.account_id,
                row.currency_id,
                row.category_id,
                row.transfer.as_ref(),
            )
            .await?;
            apply_operation_effect(&db_tx, &row, 1, actor, now).await?;
            lifecycle::touch(&mut row, actor, now);

            let active = operations::ActiveModel {
                id: ActiveValue::Set(id),
                kind: ActiveValue::Set(row.kind.as_str().to_string()),
                occurred_at: ActiveValue::Set(row.occurred_at),
                amount_minor: ActiveValue::Set(row.amount_minor),
                comment: ActiveValue::Set(row.comment.clone()),
                category_id: ActiveValue::Set(row.category_id),
                account_id: ActiveValue::Set(row.account_id),
                currency_id: ActiveValue::Set(row.currency_id),
                to_account_id: ActiveValue::Set(row.transfer.map(|leg| leg.to_account_id)),
                to_currency_id: ActiveValue::Set(row.transfer.map(|leg| leg.to_currency_id)),
                to_amount_minor: ActiveValue::Set(row.transfer.map(|leg| leg.to_amount_minor)),
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

    /// Soft-deletes an operation and reverts its effect on account balances.
    ///
    /// Returns `false` without touching anything when the operation is
    /// already deleted.
    pub async fn delete_operation(&self, id: i64, actor: &str) -> ResultEngine<bool> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let model = operations::Entity::find_by_id(id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("operation not exists".to_string()))?;
            let mut row = Operation::try_from(model)?;
            if !row.audit.is_active() {
                return Ok(false);
            }
            lifecycle::mark_deleted(&mut row, actor, now, "operation")?;
            let active = operations::ActiveModel {
                id: ActiveValue::Set(id),
                deleted_at: ActiveValue::Set(row.audit.deleted_at),
                deleted_by: ActiveValue::Set(row.audit.deleted_by.clone()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            apply_operation_effect(&db_tx, &row, -1, actor, now).await?;
            tracing::debug!(id, actor, "soft-deleted operation");
            Ok(true)
        })
    }

    /// Restores a soft-deleted operation and re-applies its balance effect.
    ///
    /// Returns `None` when the id is unknown; an active row comes back
    /// unchanged.
    pub async fn restore_operation(&self, id: i64, actor: &str) -> ResultEngine<Option<Operation>> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let Some(model) = operations::Entity::find_by_id(id).one(&db_tx).await? else {
                return Ok(None);
            };
            let mut row = Operation::try_from(model)?;
            if row.audit.is_active() {
                return Ok(Some(row));
            }
            lifecycle::mark_restored(&mut row, actor, now, "operation")?;
            let active = operations::ActiveModel {
                id: ActiveValue::Set(id),
                deleted_at: ActiveValue::Set(None),
                deleted_by: ActiveValue::Set(None),
                updated_at: ActiveValue::Set(row.audit.updated_at),
                updated_by: ActiveValue::Set(row.audit.updated_by.clone()),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            apply_operation_effect(&db_tx, &row, 1, actor, now).await?;
            tracing::debug!(id, actor, "restored operation");
            Ok(Some(row))
        })
    }

    /// Active operations touching one account (as source or transfer
    /// destination), most recent first.
    pub async fn operations_by_account(&self, account_id: i64) -> ResultEngine<Vec<Operation>> {
        let models = operations::Entity::find()
            .filter(operations::Column::DeletedAt.is_null())
            .filter(
                Condition::any()
                    .add(operations::Column::AccountId.eq(account_id))
                    .add(operations::Column::ToAccountId.eq(account_id)),
            )
            .order_by_desc(operations::Column::OccurredAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Operation::try_from).collect()
    }

    /// Active operations filed under one category, most recent first.
    pub async fn operations_by_category(&self, category_id: i64) -> ResultEngine<Vec<Operation>> {
        let models = operations::Entity::find()
            .filter(operations::Column::DeletedAt.is_null())
            .filter(operations::Column::CategoryId.eq(category_id))
            .order_by_desc(operations::Column::OccurredAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Operation::try_from).collect()
    }

    /// Active operations of one movement direction, most recent first.
    pub async fn operations_by_kind(&self, kind: OperationKind) -> ResultEngine<Vec<Operation>> {
        let models = operations::Entity::find()
            .filter(operations::Column::DeletedAt.is_null())
            .filter(operations::Column::Kind.eq(kind.as_str()))
            .order_by_desc(operations::Column::OccurredAt)
            .all(&self.database)
            .await?;
        models.into_iter().map(Operation::try_from).collect()
    }
}
