//! Executor error types
//!
//! Error codes:
//! - AERO_EXECUTION_FAILED (ERROR)
//! - AERO_CONFIGURATION_INVALID (ERROR)
//! - AERO_TEMP_LIMIT_EXCEEDED (ERROR)
//! - AERO_CONSTRAINT_VIOLATION (ERROR)
//! - AERO_BARRIER_RELEASE_FAILED (ERROR)
//! - AERO_BARRIER_INTERRUPTED (FATAL)
//! - AERO_BARRIER_TIMEOUT (FATAL)
//! - AERO_BARRIER_BROKEN (FATAL)
//! - AERO_CONTEXT_INVALID (ERROR)

use std::fmt;

use crate::arena::ArenaError;
use crate::config::ConfigError;
use crate::context::{BarrierError, ContextError};
use crate::expr::ExprError;
use crate::storage::StorageError;
use crate::types::ValueError;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The fragment failed; the partition is healthy
    Error,
    /// The partition cannot continue safely
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Where in the engine a failure is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Detected while initializing an operator
    Configuration,
    /// Raised while processing rows
    Execution,
    /// Raised by the replicated-write barrier
    Barrier,
    /// Context installation or binding
    Context,
}

/// Executor error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// Unspecified execution error
    AeroExecutionFailed,
    /// Unsupported operator configuration
    AeroConfigurationInvalid,
    /// Partition arena limit exceeded
    AeroTempLimitExceeded,
    /// Row rejected by a table
    AeroConstraintViolation,
    /// Designated partition failed after claiming the barrier
    AeroBarrierReleaseFailed,
    /// Barrier wait interrupted (FATAL)
    AeroBarrierInterrupted,
    /// Barrier wait exceeded its timeout (FATAL)
    AeroBarrierTimeout,
    /// Barrier left unusable by an earlier failure (FATAL)
    AeroBarrierBroken,
    /// Context missing or installed twice
    AeroContextInvalid,
}

impl ExecutorErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::AeroExecutionFailed => "AERO_EXECUTION_FAILED",
            ExecutorErrorCode::AeroConfigurationInvalid => "AERO_CONFIGURATION_INVALID",
            ExecutorErrorCode::AeroTempLimitExceeded => "AERO_TEMP_LIMIT_EXCEEDED",
            ExecutorErrorCode::AeroConstraintViolation => "AERO_CONSTRAINT_VIOLATION",
            ExecutorErrorCode::AeroBarrierReleaseFailed => "AERO_BARRIER_RELEASE_FAILED",
            ExecutorErrorCode::AeroBarrierInterrupted => "AERO_BARRIER_INTERRUPTED",
            ExecutorErrorCode::AeroBarrierTimeout => "AERO_BARRIER_TIMEOUT",
            ExecutorErrorCode::AeroBarrierBroken => "AERO_BARRIER_BROKEN",
            ExecutorErrorCode::AeroContextInvalid => "AERO_CONTEXT_INVALID",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::AeroBarrierInterrupted
            | ExecutorErrorCode::AeroBarrierTimeout
            | ExecutorErrorCode::AeroBarrierBroken => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ExecutorErrorCode::AeroConfigurationInvalid => ErrorCategory::Configuration,
            ExecutorErrorCode::AeroExecutionFailed
            | ExecutorErrorCode::AeroTempLimitExceeded
            | ExecutorErrorCode::AeroConstraintViolation => ErrorCategory::Execution,
            ExecutorErrorCode::AeroBarrierReleaseFailed
            | ExecutorErrorCode::AeroBarrierInterrupted
            | ExecutorErrorCode::AeroBarrierTimeout
            | ExecutorErrorCode::AeroBarrierBroken => ErrorCategory::Barrier,
            ExecutorErrorCode::AeroContextInvalid => ErrorCategory::Context,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failure of a fragment, an operator, or the barrier.
///
/// `Clone` so that every partition waiting on a replicated write can return
/// the designated partition's failure verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorError {
    code: ExecutorErrorCode,
    message: String,
    /// Position of the failing operator in its chain
    operator_index: Option<usize>,
    subquery_id: Option<i32>,
}

impl ExecutorError {
    fn new(code: ExecutorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            operator_index: None,
            subquery_id: None,
        }
    }

    /// Unspecified execution error
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::AeroExecutionFailed, reason)
    }

    pub fn configuration_invalid(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::AeroConfigurationInvalid, reason)
    }

    pub fn temp_limit_exceeded(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::AeroTempLimitExceeded, reason)
    }

    pub fn constraint_violation(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::AeroConstraintViolation, reason)
    }

    pub fn barrier_release_failed(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::AeroBarrierReleaseFailed, reason)
    }

    /// Interrupted barrier wait (FATAL)
    pub fn barrier_interrupted(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::AeroBarrierInterrupted, reason)
    }

    /// Barrier wait timeout (FATAL)
    pub fn barrier_timeout(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::AeroBarrierTimeout, reason)
    }

    /// Broken barrier (FATAL)
    pub fn barrier_broken(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::AeroBarrierBroken, reason)
    }

    pub fn context_invalid(reason: impl Into<String>) -> Self {
        Self::new(ExecutorErrorCode::AeroContextInvalid, reason)
    }

    /// Records the failing operator's position; an inner position wins
    pub fn with_operator(mut self, index: usize) -> Self {
        self.operator_index.get_or_insert(index);
        self
    }

    /// Records the subquery the failing chain belongs to
    pub fn with_subquery(mut self, subquery_id: i32) -> Self {
        self.subquery_id.get_or_insert(subquery_id);
        self
    }

    /// Returns the error code
    pub fn code(&self) -> ExecutorErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn category(&self) -> ErrorCategory {
        self.code.category()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn operator_index(&self) -> Option<usize> {
        self.operator_index
    }

    pub fn subquery_id(&self) -> Option<i32> {
        self.subquery_id
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code, self.message)?;
        match (self.operator_index, self.subquery_id) {
            (Some(op), Some(sub)) if sub != 0 => {
                write!(f, " (operator {} in subquery {})", op, sub)
            }
            (Some(op), _) => write!(f, " (operator {})", op),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for ExecutorError {}

impl From<ArenaError> for ExecutorError {
    fn from(err: ArenaError) -> Self {
        match err {
            ArenaError::LimitExceeded { .. } => ExecutorError::temp_limit_exceeded(err.to_string()),
            ArenaError::Unbound => ExecutorError::execution_failed(err.to_string()),
        }
    }
}

impl From<ValueError> for ExecutorError {
    fn from(err: ValueError) -> Self {
        ExecutorError::execution_failed(err.to_string())
    }
}

impl From<ExprError> for ExecutorError {
    fn from(err: ExprError) -> Self {
        ExecutorError::execution_failed(err.to_string())
    }
}

impl From<StorageError> for ExecutorError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConstraintViolation { .. } => {
                ExecutorError::constraint_violation(err.to_string())
            }
            StorageError::Arena(inner) => inner.into(),
            other => ExecutorError::execution_failed(other.to_string()),
        }
    }
}

impl From<ContextError> for ExecutorError {
    fn from(err: ContextError) -> Self {
        ExecutorError::context_invalid(err.to_string())
    }
}

impl From<ConfigError> for ExecutorError {
    fn from(err: ConfigError) -> Self {
        ExecutorError::configuration_invalid(err.to_string())
    }
}

impl From<BarrierError<ExecutorError>> for ExecutorError {
    fn from(err: BarrierError<ExecutorError>) -> Self {
        match err {
            BarrierError::Action(inner) => inner,
            BarrierError::DesignatedAborted => ExecutorError::barrier_release_failed(err.to_string()),
            BarrierError::WaitInterrupted(_) => ExecutorError::barrier_interrupted(err.to_string()),
            BarrierError::WaitTimedOut(_) => ExecutorError::barrier_timeout(err.to_string()),
            BarrierError::Broken(_) => ExecutorError::barrier_broken(err.to_string()),
        }
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_error_codes() {
        assert_eq!(ExecutorErrorCode::AeroExecutionFailed.code(), "AERO_EXECUTION_FAILED");
        assert_eq!(ExecutorErrorCode::AeroBarrierTimeout.code(), "AERO_BARRIER_TIMEOUT");
        assert_eq!(ExecutorErrorCode::AeroContextInvalid.code(), "AERO_CONTEXT_INVALID");
    }

    #[test]
    fn test_barrier_wait_failures_are_fatal() {
        assert!(ExecutorError::barrier_interrupted("x").is_fatal());
        assert!(ExecutorError::barrier_timeout("x").is_fatal());
        assert!(ExecutorError::barrier_broken("x").is_fatal());
        assert!(!ExecutorError::barrier_release_failed("x").is_fatal());
        assert!(!ExecutorError::execution_failed("x").is_fatal());
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            ExecutorError::configuration_invalid("MIN").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(ExecutorError::temp_limit_exceeded("x").category(), ErrorCategory::Execution);
        assert_eq!(ExecutorError::barrier_timeout("x").category(), ErrorCategory::Barrier);
        assert_eq!(ExecutorError::context_invalid("x").category(), ErrorCategory::Context);
    }

    #[test]
    fn test_first_operator_index_wins() {
        let err = ExecutorError::execution_failed("overflow")
            .with_operator(1)
            .with_operator(3)
            .with_subquery(2);
        assert_eq!(err.operator_index(), Some(1));
        assert_eq!(err.subquery_id(), Some(2));
        let display = err.to_string();
        assert!(display.contains("[ERROR] AERO_EXECUTION_FAILED: overflow"));
        assert!(display.contains("operator 1 in subquery 2"));
    }

    #[test]
    fn test_arena_limit_maps_to_temp_limit() {
        let err: ExecutorError = ArenaError::LimitExceeded {
            arena: "p0".into(),
            requested: 64,
            used: 1000,
            limit: 1024,
        }
        .into();
        assert_eq!(err.code(), ExecutorErrorCode::AeroTempLimitExceeded);
    }

    #[test]
    fn test_barrier_errors_map() {
        let shared = ExecutorError::constraint_violation("dup");
        let err: ExecutorError = BarrierError::Action(shared.clone()).into();
        assert_eq!(err, shared);

        let err: ExecutorError = BarrierError::<ExecutorError>::WaitTimedOut(Duration::from_millis(5)).into();
        assert_eq!(err.code(), ExecutorErrorCode::AeroBarrierTimeout);

        let err: ExecutorError = BarrierError::<ExecutorError>::DesignatedAborted.into();
        assert_eq!(err.code(), ExecutorErrorCode::AeroBarrierReleaseFailed);
    }
}
