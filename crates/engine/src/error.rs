//! The module contains the error the engine can throw.
//!
//! Validation and rate errors are raised at the service boundary before any
//! store write happens; lifecycle errors ([`AlreadyDeleted`], [`NotDeleted`])
//! signal a transition attempted from the wrong state.
//!
//!  [`AlreadyDeleted`]: EngineError::AlreadyDeleted
//!  [`NotDeleted`]: EngineError::NotDeleted
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("position {requested} out of range [1, {max}]")]
    PositionOutOfRange { requested: i64, max: i64 },
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("\"{0}\" already deleted!")]
    AlreadyDeleted(String),
    #[error("\"{0}\" is not deleted!")]
    NotDeleted(String),
    #[error("Invalid exchange rate: {0}")]
    InvalidRate(String),
    #[error("Invalid parent category: {0}")]
    InvalidParent(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Shorthand for a field-level validation failure.
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Validation { field: a, reason: b },
                Self::Validation { field: c, reason: d },
            ) => a == c && b == d,
            (
                Self::PositionOutOfRange { requested: a, max: b },
                Self::PositionOutOfRange { requested: c, max: d },
            ) => a == c && b == d,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::AlreadyDeleted(a), Self::AlreadyDeleted(b)) => a == b,
            (Self::NotDeleted(a), Self::NotDeleted(b)) => a == b,
            (Self::InvalidRate(a), Self::InvalidRate(b)) => a == b,
            (Self::InvalidParent(a), Self::InvalidParent(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
