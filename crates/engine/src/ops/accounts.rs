use std::collections::HashMap;

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    Account, AccountKind, EngineError, Money, ResultEngine, accounts, lifecycle,
    lifecycle::Audit,
    money, position,
    util::{normalize_title, validate_amount_minor},
};

use super::{
    Engine, find_account_by_title, find_active_account_by_title, find_main_currency,
    impl_delete_op, impl_read_ops, impl_reposition_op, impl_restore_op, require_currency, with_tx,
};

/// Field patch for [`Engine::update_account`]; `None` leaves the stored
/// value untouched.
#[derive(Clone, Debug, Default)]
pub struct AccountPatch {
    pub title: Option<String>,
    pub kind: Option<AccountKind>,
    pub currency_id: Option<i64>,
    pub amount_minor: Option<i64>,
    pub closed: Option<bool>,
}

impl Engine {
    impl_read_ops!(accounts, Account, account, accounts, accounts_with_deleted);
    impl_delete_op!(accounts, Account, "account", delete_account);
    impl_restore_op!(accounts, Account, "account", restore_account);
    impl_reposition_op!(accounts, Account, "account", change_account_position);

    /// Add a new account.
    ///
    /// `amount_minor` is the opening balance in minor units of the account's
    /// currency.
    pub async fn new_account(
        &self,
        title: &str,
        kind: AccountKind,
        currency_id: i64,
        amount_minor: i64,
        actor: &str,
    ) -> ResultEngine<Account> {
        let now = chrono::Utc::now();
        let title = normalize_title(title, "title")?;
        let amount_minor = validate_amount_minor(amount_minor, "amount_minor")?;
        with_tx!(self, |db_tx| {
            require_currency(&db_tx, currency_id).await?;
            if find_active_account_by_title(&db_tx, &title).await?.is_some() {
                return Err(EngineError::ExistingKey(title));
            }

            let rows = accounts::Entity::find().all(&db_tx).await?;
            let account = Account {
                id: 0,
                title,
                kind,
                amount_minor,
                currency_id,
                closed: false,
                position: position::next_position(rows.iter().map(|model| model.position)),
                audit: Audit::new(actor, now),
            };
            let model = accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            tracing::debug!(id = model.id, actor, "created account");
            Account::try_from(model)
        })
    }

    /// Look an account up by title, reviving or creating it as needed.
    ///
    /// A missing title becomes a fresh `Current` account in the main
    /// currency with a zero balance.
    pub async fn get_or_create_account(&self, title: &str, actor: &str) -> ResultEngine<Account> {
        let now = chrono::Utc::now();
        let title = normalize_title(title, "title")?;
        with_tx!(self, |db_tx| {
            if let Some(model) = find_active_account_by_title(&db_tx, &title).await? {
                Account::try_from(model)
            } else if let Some(model) = find_account_by_title(&db_tx, &title).await? {
                let mut row = Account::try_from(model)?;
                lifecycle::mark_restored(&mut row, actor, now, "account")?;
                let active = accounts::ActiveModel {
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
                let currency = find_main_currency(&db_tx).await?.ok_or_else(|| {
                    EngineError::KeyNotFound("main currency not exists".to_string())
                })?;
                let rows = accounts::Entity::find().all(&db_tx).await?;
                let account = Account {
                    id: 0,
                    title,
                    kind: AccountKind::Current,
                    amount_minor: 0,
                    currency_id: currency.id,
                    closed: false,
                    position: position::next_position(rows.iter().map(|model| model.position)),
                    audit: Audit::new(actor, now),
                };
                let model = accounts::ActiveModel::from(&account).insert(&db_tx).await?;
                Account::try_from(model)
            }
        })
    }

    /// Patch an existing account; a deleted row is restored first.
    pub async fn update_account(
        &self,
        id: i64,
        patch: AccountPatch,
        actor: &str,
    ) -> ResultEngine<Account> {
        let now = chrono::Utc::now();
        let title = patch
            .title
            .as_deref()
            .map(|value| normalize_title(value, "title"))
            .transpose()?;
        let amount_minor = patch
            .amount_minor
            .map(|value| validate_amount_minor(value, "amount_minor"))
            .transpose()?;
        with_tx!(self, |db_tx| {
            let model = super::require_account(&db_tx, id).await?;
            let mut row = Account::try_from(model)?;
            if !row.audit.is_active() {
                lifecycle::mark_restored(&mut row, actor, now, "account")?;
            }

            if let Some(title) = title {
                let exists = accounts::Entity::find()
                    .filter(accounts::Column::DeletedAt.is_null())
                    .filter(Expr::cust("LOWER(title)").eq(title.to_lowercase()))
                    .filter(accounts::Column::Id.ne(id))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if exists {
                    return Err(EngineError::ExistingKey(title));
                }
                row.title = title;
            }
            if let Some(currency_id) = patch.currency_id {
                require_currency(&db_tx, currency_id).await?;
                row.currency_id = currency_id;
            }
            if let Some(kind) = patch.kind {
                row.kind = kind;
            }
            if let Some(amount_minor) = amount_minor {
                row.amount_minor = amount_minor;
            }
            if let Some(closed) = patch.closed {
                row.closed = closed;
            }
            lifecycle::touch(&mut row, actor, now);

            let active = accounts::ActiveModel {
                id: ActiveValue::Set(id),
                title: ActiveValue::Set(row.title.clone()),
                kind: ActiveValue::Set(row.kind.as_str().to_string()),
                amount_minor: ActiveValue::Set(row.amount_minor),
                currency_id: ActiveValue::Set(row.currency_id),
                closed: ActiveValue::Set(row.closed),
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

    /// Return the active account with this title.
    pub async fn account_by_title(&self, title: &str) -> ResultEngine<Option<Account>> {
        let title = normalize_title(title, "title")?;
        let model = find_active_account_by_title(&self.database, &title).await?;
        model.map(Account::try_from).transpose()
    }

    /// Soft-delete the active account with this title.
    ///
    /// Returns `false` when no active account carries the title.
    pub async fn delete_account_by_title(&self, title: &str, actor: &str) -> ResultEngine<bool> {
        let title = normalize_title(title, "title")?;
        let Some(model) = find_active_account_by_title(&self.database, &title).await? else {
            return Ok(false);
        };
        self.delete_account(model.id, actor).await
    }

    /// Active accounts of one kind, ordered by position.
    pub async fn accounts_by_kind(&self, kind: AccountKind) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::DeletedAt.is_null())
            .filter(accounts::Column::Kind.eq(kind.as_str()))
            .order_by_asc(accounts::Column::Position)
            .all(&self.database)
            .await?;
        models.into_iter().map(Account::try_from).collect()
    }

    /// Active accounts denominated in one currency, ordered by position.
    pub async fn accounts_by_currency(&self, currency_id: i64) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::DeletedAt.is_null())
            .filter(accounts::Column::CurrencyId.eq(currency_id))
            .order_by_asc(accounts::Column::Position)
            .all(&self.database)
            .await?;
        models.into_iter().map(Account::try_from).collect()
    }

    /// Sum of open, active account balances converted into the main currency.
    ///
    /// Closed accounts are excluded; the rate table is read once.
    pub async fn accounts_total_in_main(&self) -> ResultEngine<Money> {
        let rates: HashMap<i64, f64> = crate::currencies::Entity::find()
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| (model.id, model.exchange_rate))
            .collect();

        let models = accounts::Entity::find()
            .filter(accounts::Column::DeletedAt.is_null())
            .filter(accounts::Column::Closed.eq(false))
            .all(&self.database)
            .await?;

        let mut total = Money::ZERO;
        for model in models {
            let rate = rates.get(&model.currency_id).ok_or_else(|| {
                EngineError::KeyNotFound("currency not exists".to_string())
            })?;
            total += Money::new(money::convert_to_main(model.amount_minor, *rate)?);
        }
        Ok(total)
    }
}
