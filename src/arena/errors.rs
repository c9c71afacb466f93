//! Arena errors

use thiserror::Error;

/// Result type for arena operations
pub type ArenaResult<T> = Result<T, ArenaError>;

/// Arena errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("arena {arena}: requesting {requested} bytes with {used} in use exceeds limit of {limit}")]
    LimitExceeded {
        arena: String,
        requested: usize,
        used: usize,
        limit: usize,
    },

    #[error("scratch pool used before being bound to an arena")]
    Unbound,
}
