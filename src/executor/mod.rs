//! Executor subsystem
//!
//! A fragment is a set of operator chains: the top-level chain (subquery 0)
//! and any subquery chains. Each chain runs its operators strictly in order
//! against one parameter set.
//!
//! # Failure handling
//!
//! - Every error carries the failing operator's position and subquery id
//! - The runner releases all temp tables and scratch pools of a failed chain
//! - Replicated inserts are routed through the host's write barrier
//! - Nothing is retried inside the engine

mod chain;
mod errors;
mod fragment;
mod operator;

pub use chain::ExecutorChain;
pub use errors::{ErrorCategory, ExecutorError, ExecutorErrorCode, ExecutorResult, Severity};
pub use fragment::{FragmentPlan, FragmentResult, TOP_LEVEL_SUBQUERY};
pub use operator::{Operator, OperatorKind};
