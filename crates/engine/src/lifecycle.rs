//! Soft-delete/restore lifecycle shared by every managed collection.
//!
//! An entity is **active** while `deleted_at` is `None` and **deleted** once
//! the tombstone pair (`deleted_at`/`deleted_by`) is set. Rows are never
//! hard-purged by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{EngineError, ResultEngine};

/// Audit field block embedded in every managed entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
}

impl Audit {
    /// Fresh audit block for a row being created now, by `actor`.
    pub fn new(actor: &str, now: DateTime<Utc>) -> Self {
        Self {
            created_at: now,
            created_by: actor.to_string(),
            updated_at: now,
            updated_by: actor.to_string(),
            deleted_at: None,
            deleted_by: None,
        }
    }

    /// Returns `true` while the row carries no tombstone.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Capability interface for entities carrying an [`Audit`] block.
pub trait Audited {
    fn audit(&self) -> &Audit;
    fn audit_mut(&mut self) -> &mut Audit;
}

/// Stamps the update pair without touching the tombstone.
///
/// Every non-delete mutation goes through here.
pub(crate) fn touch<T: Audited>(entity: &mut T, actor: &str, now: DateTime<Utc>) {
    let audit = entity.audit_mut();
    audit.updated_at = now;
    audit.updated_by = actor.to_string();
}

/// Active -> Deleted transition.
///
/// The row must currently be active; callers that want idempotent behavior
/// check the state first.
pub(crate) fn mark_deleted<T: Audited>(
    entity: &mut T,
    actor: &str,
    now: DateTime<Utc>,
    label: &str,
) -> ResultEngine<()> {
    let audit = entity.audit_mut();
    if audit.deleted_at.is_some() {
        return Err(EngineError::AlreadyDeleted(label.to_string()));
    }
    audit.deleted_at = Some(now);
    audit.deleted_by = Some(actor.to_string());
    Ok(())
}

/// Deleted -> Active transition.
///
/// Clears the tombstone and stamps the update pair.
pub(crate) fn mark_restored<T: Audited>(
    entity: &mut T,
    actor: &str,
    now: DateTime<Utc>,
    label: &str,
) -> ResultEngine<()> {
    let audit = entity.audit_mut();
    if audit.deleted_at.is_none() {
        return Err(EngineError::NotDeleted(label.to_string()));
    }
    audit.deleted_at = None;
    audit.deleted_by = None;
    audit.updated_at = now;
    audit.updated_by = actor.to_string();
    Ok(())
}
