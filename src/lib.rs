//! aerodb-exec - partition execution engine
//!
//! Runs plan fragments on a site's partition:
//!
//! - `context`: per-partition execution state, thread binding and the
//!   replicated-write barrier shared by all sites of a host
//! - `executor`: executor chains, failure cleanup and plan fragments
//! - `operators`: scan, projection, materialize, DML and window functions
//! - `storage`: temp tables, persistent table handles and DR streams
//! - `arena`: memory accounting for temp data
//! - `observability`: JSON logging, lifecycle events and counters

pub mod arena;
pub mod config;
pub mod context;
pub mod executor;
pub mod expr;
pub mod observability;
pub mod operators;
pub mod storage;
pub mod types;

pub use config::EngineConfig;
pub use context::{EngineRegistry, ExecutionContext, PartitionEngine};
pub use executor::{ExecutorChain, ExecutorError, ExecutorResult, FragmentPlan, FragmentResult};
