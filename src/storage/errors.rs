//! Storage errors

use thiserror::Error;

use crate::arena::ArenaError;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("table {table}: {reason}")]
    ConstraintViolation { table: String, reason: String },

    #[error("tables {left} and {right} have incompatible schemas")]
    IncompatibleSchemas { left: String, right: String },

    #[error("table {0} cannot be swapped with itself")]
    SelfSwap(String),

    #[error(transparent)]
    Arena(#[from] ArenaError),
}

impl StorageError {
    /// Constraint violation on `table`
    pub fn constraint(table: impl Into<String>, reason: impl Into<String>) -> Self {
        StorageError::ConstraintViolation {
            table: table.into(),
            reason: reason.into(),
        }
    }
}
