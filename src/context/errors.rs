//! Context and registry errors

use thiserror::Error;

/// Errors raised while installing or reconfiguring partition contexts
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("partition {0} already has engine locals installed")]
    PartitionAlreadyInstalled(i32),

    #[error("partition {partition} is outside the {sites} sites of this host")]
    TooManyPartitions { partition: i32, sites: usize },

    #[error("DR sequence number would go backwards: current {current}, replacement {replacement}")]
    DrSequenceRegression { current: i64, replacement: i64 },

    #[error("no execution context is bound to this thread")]
    NotBound,
}

pub type ContextResult<T> = Result<T, ContextError>;
