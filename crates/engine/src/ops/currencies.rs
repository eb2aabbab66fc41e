use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    Currency, EngineError, ResultEngine, currencies, lifecycle,
    lifecycle::Audit,
    money, position,
    util::{normalize_short_name, normalize_title, validate_rate},
};

use super::{
    Engine, find_active_currency_by_title, find_currency_by_title, find_main_currency,
    impl_delete_op, impl_read_ops, impl_reposition_op, impl_restore_op, with_tx,
};

/// Field patch for [`Engine::update_currency`]; `None` leaves the stored
/// value untouched.
#[derive(Clone, Debug, Default)]
pub struct CurrencyPatch {
    pub title: Option<String>,
    pub short_name: Option<String>,
    pub exchange_rate: Option<f64>,
}

impl Engine {
    impl_read_ops!(currencies, Currency, currency, currencies, currencies_with_deleted);
    impl_delete_op!(currencies, Currency, "currency", delete_currency);
    impl_restore_op!(currencies, Currency, "currency", restore_currency);
    impl_reposition_op!(currencies, Currency, "currency", change_currency_position);

    /// Add a new currency.
    ///
    /// `exchange_rate` is the value of one minor unit in main-currency minor
    /// units; the main currency itself is created with rate 1.0.
    pub async fn new_currency(
        &self,
        title: &str,
        short_name: &str,
        exchange_rate: f64,
        actor: &str,
    ) -> ResultEngine<Currency> {
        let now = chrono::Utc::now();
        let title = normalize_title(title, "title")?;
        let short_name = normalize_short_name(short_name, "short_name")?;
        let exchange_rate = validate_rate(exchange_rate)?;
        with_tx!(self, |db_tx| {
            if find_active_currency_by_title(&db_tx, &title).await?.is_some() {
                return Err(EngineError::ExistingKey(title));
            }

            let rows = currencies::Entity::find().all(&db_tx).await?;
            let currency = Currency {
                id: 0,
                title,
                short_name,
                exchange_rate,
                position: position::next_position(rows.iter().map(|model| model.position)),
                audit: Audit::new(actor, now),
            };
            let model = currencies::ActiveModel::from(&currency).insert(&db_tx).await?;
            tracing::debug!(id = model.id, actor, "created currency");
            Currency::try_from(model)
        })
    }

    /// Look a currency up by title, reviving or creating it as needed.
    ///
    /// An active row is returned as-is; a deleted row is restored; a missing
    /// title becomes a fresh currency with the pivot rate.
    pub async fn get_or_create_currency(&self, title: &str, actor: &str) -> ResultEngine<Currency> {
        let now = chrono::Utc::now();
        let title = normalize_title(title, "title")?;
        with_tx!(self, |db_tx| {
            if let Some(model) = find_active_currency_by_title(&db_tx, &title).await? {
                Currency::try_from(model)
            } else if let Some(model) = find_currency_by_title(&db_tx, &title).await? {
                let mut row = Currency::try_from(model)?;
                lifecycle::mark_restored(&mut row, actor, now, "currency")?;
                let active = currencies::ActiveModel {
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
                let rows = currencies::Entity::find().all(&db_tx).await?;
                let short_name: String = title.chars().take(3).collect::<String>().to_uppercase();
                let currency = Currency {
                    id: 0,
                    title,
                    short_name,
                    exchange_rate: Currency::MAIN_RATE,
                    position: position::next_position(rows.iter().map(|model| model.position)),
                    audit: Audit::new(actor, now),
                };
                let model = currencies::ActiveModel::from(&currency).insert(&db_tx).await?;
                Currency::try_from(model)
            }
        })
    }

    /// Patch an existing currency; a deleted row is restored first.
    pub async fn update_currency(
        &self,
        id: i64,
        patch: CurrencyPatch,
        actor: &str,
    ) -> ResultEngine<Currency> {
        let now = chrono::Utc::now();
        let title = patch
            .title
            .as_deref()
            .map(|value| normalize_title(value, "title"))
            .transpose()?;
        let short_name = patch
            .short_name
            .as_deref()
            .map(|value| normalize_short_name(value, "short_name"))
            .transpose()?;
        let exchange_rate = patch.exchange_rate.map(validate_rate).transpose()?;
        with_tx!(self, |db_tx| {
            let model = super::require_currency(&db_tx, id).await?;
            let mut row = Currency::try_from(model)?;
            if !row.audit.is_active() {
                lifecycle::mark_restored(&mut row, actor, now, "currency")?;
            }

            if let Some(title) = title {
                let exists = currencies::Entity::find()
                    .filter(currencies::Column::DeletedAt.is_null())
                    .filter(Expr::cust("LOWER(title)").eq(title.to_lowercase()))
                    .filter(currencies::Column::Id.ne(id))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if exists {
                    return Err(EngineError::ExistingKey(title));
                }
                row.title = title;
            }
            if let Some(short_name) = short_name {
                row.short_name = short_name;
            }
            if let Some(exchange_rate) = exchange_rate {
                row.exchange_rate = exchange_rate;
            }
            lifecycle::touch(&mut row, actor, now);

            let active = currencies::ActiveModel {
                id: ActiveValue::Set(id),
                title: ActiveValue::Set(row.title.clone()),
                short_name: ActiveValue::Set(row.short_name.clone()),
                exchange_rate: ActiveValue::Set(row.exchange_rate),
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

    /// Return the active currency with this title.
    pub async fn currency_by_title(&self, title: &str) -> ResultEngine<Option<Currency>> {
        let title = normalize_title(title, "title")?;
        let model = find_active_currency_by_title(&self.database, &title).await?;
        model.map(Currency::try_from).transpose()
    }

    /// Soft-delete the active currency with this title.
    ///
    /// Returns `false` when no active currency carries the title.
    pub async fn delete_currency_by_title(&self, title: &str, actor: &str) -> ResultEngine<bool> {
        let title = normalize_title(title, "title")?;
        let Some(model) = find_active_currency_by_title(&self.database, &title).await? else {
            return Ok(false);
        };
        self.delete_currency(model.id, actor).await
    }

    /// The conversion pivot: the active currency whose rate is exactly 1.0.
    pub async fn main_currency(&self) -> ResultEngine<Currency> {
        let model = find_main_currency(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("main currency not exists".to_string()))?;
        Currency::try_from(model)
    }

    /// Convert an amount of `currency_id` into main-currency minor units.
    pub async fn convert_to_main(&self, amount_minor: i64, currency_id: i64) -> ResultEngine<i64> {
        let model = super::require_currency(&self.database, currency_id).await?;
        money::convert_to_main(amount_minor, model.exchange_rate)
    }

    /// Convert between two currencies, routed through the main-currency pivot.
    pub async fn convert_between(
        &self,
        amount_minor: i64,
        from_currency_id: i64,
        to_currency_id: i64,
    ) -> ResultEngine<i64> {
        if from_currency_id == to_currency_id {
            return Ok(amount_minor);
        }
        let from = super::require_currency(&self.database, from_currency_id).await?;
        let to = super::require_currency(&self.database, to_currency_id).await?;
        let in_main = money::convert_to_main(amount_minor, from.exchange_rate)?;
        money::convert_from_main(in_main, to.exchange_rate)
    }
}
