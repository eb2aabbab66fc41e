use sea_orm::{ConnectionTrait, DatabaseConnection, QueryFilter, QueryOrder, prelude::*, sea_query::Expr};

use crate::{EngineError, ResultEngine};

mod accounts;
mod budgets;
mod categories;
mod currencies;
mod operations;

pub use accounts::AccountPatch;
pub use budgets::BudgetPatch;
pub use categories::CategoryPatch;
pub use currencies::CurrencyPatch;
pub use operations::{OperationDraft, OperationPatch};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// The transaction doubles as the mutual-exclusion scope for position math:
/// the read-compute-write cycle of a reindex either commits as a whole or
/// not at all.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Generates `require_*` lookups for one collection: by id, and by id
/// restricted to active rows.
macro_rules! impl_require_fns {
    ($require_fn:ident, $require_active_fn:ident, $module:ident, $label:literal) => {
        pub(super) async fn $require_fn<C: ConnectionTrait>(
            db: &C,
            id: i64,
        ) -> ResultEngine<crate::$module::Model> {
            crate::$module::Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    EngineError::KeyNotFound(concat!($label, " not exists").to_string())
                })
        }

        pub(super) async fn $require_active_fn<C: ConnectionTrait>(
            db: &C,
            id: i64,
        ) -> ResultEngine<crate::$module::Model> {
            let model = $require_fn(db, id).await?;
            if model.deleted_at.is_some() {
                return Err(EngineError::KeyNotFound(
                    concat!($label, " not exists").to_string(),
                ));
            }
            Ok(model)
        }
    };
}

impl_require_fns!(require_currency, require_active_currency, currencies, "currency");
impl_require_fns!(require_account, require_active_account, accounts, "account");
impl_require_fns!(require_category, require_active_category, categories, "category");

/// Generates case-insensitive title lookups for one collection: among active
/// rows, and among all rows (active first, then the newest tombstone).
macro_rules! impl_find_by_title_fns {
    ($find_active_fn:ident, $find_any_fn:ident, $module:ident) => {
        pub(super) async fn $find_active_fn<C: ConnectionTrait>(
            db: &C,
            title: &str,
        ) -> ResultEngine<Option<crate::$module::Model>> {
            crate::$module::Entity::find()
                .filter(crate::$module::Column::DeletedAt.is_null())
                .filter(Expr::cust("LOWER(title)").eq(title.to_lowercase()))
                .one(db)
                .await
                .map_err(Into::into)
        }

        pub(super) async fn $find_any_fn<C: ConnectionTrait>(
            db: &C,
            title: &str,
        ) -> ResultEngine<Option<crate::$module::Model>> {
            if let Some(model) = $find_active_fn(db, title).await? {
                return Ok(Some(model));
            }
            crate::$module::Entity::find()
                .filter(Expr::cust("LOWER(title)").eq(title.to_lowercase()))
                .order_by_desc(crate::$module::Column::Id)
                .one(db)
                .await
                .map_err(Into::into)
        }
    };
}

impl_find_by_title_fns!(find_active_currency_by_title, find_currency_by_title, currencies);
impl_find_by_title_fns!(find_active_account_by_title, find_account_by_title, accounts);
impl_find_by_title_fns!(find_active_category_by_title, find_category_by_title, categories);

/// The active currency whose exchange rate is exactly 1.0 (the conversion
/// pivot). Lowest position wins if several qualify.
pub(super) async fn find_main_currency<C: ConnectionTrait>(
    db: &C,
) -> ResultEngine<Option<crate::currencies::Model>> {
    crate::currencies::Entity::find()
        .filter(crate::currencies::Column::DeletedAt.is_null())
        .filter(crate::currencies::Column::ExchangeRate.eq(crate::Currency::MAIN_RATE))
        .order_by_asc(crate::currencies::Column::Position)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Generates the shared read accessors for one collection.
macro_rules! impl_read_ops {
    ($module:ident, $domain:ty, $get_fn:ident, $list_fn:ident, $list_all_fn:ident) => {
        /// Return one row by id, whether active or deleted.
        pub async fn $get_fn(&self, id: i64) -> crate::ResultEngine<Option<$domain>> {
            let model = crate::$module::Entity::find_by_id(id)
                .one(&self.database)
                .await?;
            model.map(<$domain>::try_from).transpose()
        }

        /// Return the active rows, ordered by position.
        pub async fn $list_fn(&self) -> crate::ResultEngine<Vec<$domain>> {
            let models = crate::$module::Entity::find()
                .filter(crate::$module::Column::DeletedAt.is_null())
                .order_by_asc(crate::$module::Column::Position)
                .all(&self.database)
                .await?;
            models.into_iter().map(<$domain>::try_from).collect()
        }

        /// Return every row, tombstones included, ordered by position.
        pub async fn $list_all_fn(&self) -> crate::ResultEngine<Vec<$domain>> {
            let models = crate::$module::Entity::find()
                .order_by_asc(crate::$module::Column::Position)
                .all(&self.database)
                .await?;
            models.into_iter().map(<$domain>::try_from).collect()
        }
    };
}

pub(crate) use impl_read_ops;

/// Generates the soft-delete operation for one collection.
macro_rules! impl_delete_op {
    ($module:ident, $domain:ty, $label:literal, $delete_fn:ident) => {
        /// Soft-deletes one row.
        ///
        /// Returns `false` without touching the row when it is already
        /// deleted. Positions of the surviving rows are left as they are;
        /// the sequence is compacted on the next reposition.
        pub async fn $delete_fn(&self, id: i64, actor: &str) -> crate::ResultEngine<bool> {
            let now = chrono::Utc::now();
            with_tx!(self, |db_tx| {
                let model = crate::$module::Entity::find_by_id(id)
                    .one(&db_tx)
                    .await?
                    .ok_or_else(|| {
                        crate::EngineError::KeyNotFound(
                            concat!($label, " not exists").to_string(),
                        )
                    })?;
                let mut row = <$domain>::try_from(model)?;
                if !crate::lifecycle::Audited::audit(&row).is_active() {
                    return Ok(false);
                }
                crate::lifecycle::mark_deleted(&mut row, actor, now, $label)?;
                let audit = crate::lifecycle::Audited::audit(&row);
                let active = crate::$module::ActiveModel {
                    id: sea_orm::ActiveValue::Set(id),
                    deleted_at: sea_orm::ActiveValue::Set(audit.deleted_at),
                    deleted_by: sea_orm::ActiveValue::Set(audit.deleted_by.clone()),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
                tracing::debug!(id, actor, entity = $label, "soft-deleted row");
                Ok(true)
            })
        }
    };
}

pub(crate) use impl_delete_op;

/// Generates the restore operation for one collection.
macro_rules! impl_restore_op {
    ($module:ident, $domain:ty, $label:literal, $restore_fn:ident) => {
        /// Restores a soft-deleted row, keeping its frozen position.
        ///
        /// Returns `None` when the id is unknown; an active row comes back
        /// unchanged.
        pub async fn $restore_fn(
            &self,
            id: i64,
            actor: &str,
        ) -> crate::ResultEngine<Option<$domain>> {
            let now = chrono::Utc::now();
            with_tx!(self, |db_tx| {
                let Some(model) = crate::$module::Entity::find_by_id(id).one(&db_tx).await?
                else {
                    return Ok(None);
                };
                let mut row = <$domain>::try_from(model)?;
                if crate::lifecycle::Audited::audit(&row).is_active() {
                    return Ok(Some(row));
                }
                crate::lifecycle::mark_restored(&mut row, actor, now, $label)?;
                let audit = crate::lifecycle::Audited::audit(&row);
                let active = crate::$module::ActiveModel {
                    id: sea_orm::ActiveValue::Set(id),
                    deleted_at: sea_orm::ActiveValue::Set(None),
                    deleted_by: sea_orm::ActiveValue::Set(None),
                    updated_at: sea_orm::ActiveValue::Set(audit.updated_at),
                    updated_by: sea_orm::ActiveValue::Set(audit.updated_by.clone()),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
                tracing::debug!(id, actor, entity = $label, "restored row");
                Ok(Some(row))
            })
        }
    };
}

pub(crate) use impl_restore_op;

/// Generates the reposition operation for one collection.
macro_rules! impl_reposition_op {
    ($module:ident, $domain:ty, $label:literal, $fn_name:ident) => {
        /// Moves one active row to `new_position`, shifting the minimum
        /// number of neighbors.
        ///
        /// The active subset is compacted to dense ranks `1..=N` in the same
        /// pass, and every shifted row is stamped and written inside one
        /// transaction.
        pub async fn $fn_name(
            &self,
            id: i64,
            new_position: i64,
            actor: &str,
        ) -> crate::ResultEngine<$domain> {
            let now = chrono::Utc::now();
            with_tx!(self, |db_tx| {
                let models = crate::$module::Entity::find()
                    .filter(crate::$module::Column::DeletedAt.is_null())
                    .order_by_asc(crate::$module::Column::Position)
                    .all(&db_tx)
                    .await?;
                let mut rows = models
                    .into_iter()
                    .map(<$domain>::try_from)
                    .collect::<crate::ResultEngine<Vec<_>>>()?;
                let target = rows.iter().position(|row| row.id == id).ok_or_else(|| {
                    crate::EngineError::KeyNotFound(concat!($label, " not exists").to_string())
                })?;
                let changed = crate::position::move_to(&mut rows, target, new_position)?;
                for index in &changed {
                    let row = &mut rows[*index];
                    crate::lifecycle::touch(row, actor, now);
                    let audit = crate::lifecycle::Audited::audit(row);
                    let active = crate::$module::ActiveModel {
                        id: sea_orm::ActiveValue::Set(row.id),
                        position: sea_orm::ActiveValue::Set(row.position),
                        updated_at: sea_orm::ActiveValue::Set(audit.updated_at),
                        updated_by: sea_orm::ActiveValue::Set(audit.updated_by.clone()),
                        ..Default::default()
                    };
                    active.update(&db_tx).await?;
                }
                tracing::debug!(
                    id,
                    new_position,
                    actor,
                    entity = $label,
                    shifted = changed.len(),
                    "repositioned row"
                );
                Ok(rows.swap_remove(target))
            })
        }
    };
}

pub(crate) use impl_reposition_op;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
