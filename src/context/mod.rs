//! Partition execution contexts
//!
//! - `ExecutionContext`: one per partition thread, passed explicitly to every
//!   operator and also bound to its thread for ambient lookup
//! - `EngineRegistry`: host-wide map of partition locals, the shared
//!   multi-partition context and the replicated-write barrier
//! - `PartitionEngine`: a partition's handle onto the registry
//! - `ReplicatedWriteBarrier`: cyclic single-writer barrier
//!
//! The barrier is the only point where partition threads synchronize.

mod barrier;
mod errors;
mod execution;
mod registry;

pub use barrier::{BarrierError, BarrierRole, ReplicatedWriteBarrier};
pub use errors::{ContextError, ContextResult};
pub use execution::{ContextBinding, ExecutionContext, SiteIdentity, MP_PARTITION_ID};
pub use registry::{EngineLocals, EngineRegistry, PartitionEngine, WriteBarrier};
