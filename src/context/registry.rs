//! Host-wide registry of partition engines
//!
//! Each partition thread installs its [`EngineLocals`] once, when its
//! [`PartitionEngine`] is created on that thread. The registry also owns the
//! shared multi-partition context and the replicated-write barrier.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::arena::Arena;
use crate::config::EngineConfig;
use crate::executor::ExecutorError;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};

use super::barrier::{BarrierError, BarrierRole, ReplicatedWriteBarrier};
use super::errors::{ContextError, ContextResult};
use super::execution::{ContextBinding, ExecutionContext, SiteIdentity, MP_PARTITION_ID};

/// Barrier used for replicated inserts; the shared value is the modified count
pub type WriteBarrier = ReplicatedWriteBarrier<i64, ExecutorError>;

/// A partition's context and the arena its memory pools draw from
#[derive(Debug, Clone)]
pub struct EngineLocals {
    pub context: Arc<ExecutionContext>,
    pub arena: Arc<Arena>,
}

impl EngineLocals {
    fn new(context: Arc<ExecutionContext>) -> Self {
        let arena = Arc::clone(context.arena());
        Self { context, arena }
    }
}

/// Shared state of every partition engine on a host
#[derive(Debug)]
pub struct EngineRegistry {
    config: EngineConfig,
    metrics: Arc<MetricsRegistry>,
    partitions: RwLock<HashMap<i32, EngineLocals>>,
    mp_locals: EngineLocals,
    barrier: WriteBarrier,
}

impl EngineRegistry {
    /// Builds the host registry and applies the configured log level.
    ///
    /// An unparsable `log_level` keeps the current minimum severity.
    pub fn new(config: EngineConfig) -> Arc<Self> {
        if let Err(err) = config.apply_logging() {
            log_event_with_fields(
                Event::LogLevelRejected,
                &[("log_level", &config.log_level), ("reason", &err.to_string())],
            );
        }
        let metrics = Arc::new(MetricsRegistry::new());
        let mp_context = Arc::new(ExecutionContext::new(
            SiteIdentity {
                site_id: -1,
                partition_id: MP_PARTITION_ID,
                host_id: config.host_id,
                hostname: config.hostname.clone(),
                dr_cluster_id: config.dr_cluster_id,
            },
            Arc::new(Arena::new("mp", config.temp_table_memory_limit)),
            Arc::clone(&metrics),
        ));
        let barrier = WriteBarrier::new(config.sites_per_host, config.barrier_wait_timeout());
        Arc::new(Self {
            config,
            metrics,
            partitions: RwLock::new(HashMap::new()),
            mp_locals: EngineLocals::new(mp_context),
            barrier,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    pub fn sites_per_host(&self) -> usize {
        self.config.sites_per_host
    }

    pub fn barrier(&self) -> &WriteBarrier {
        &self.barrier
    }

    /// The shared context replicated writes run against
    pub fn mp_locals(&self) -> &EngineLocals {
        &self.mp_locals
    }

    /// Locals installed for `partition_id`
    pub fn locals(&self, partition_id: i32) -> Option<EngineLocals> {
        self.partitions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&partition_id)
            .cloned()
    }

    pub fn installed_partitions(&self) -> usize {
        self.partitions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn install(&self, locals: EngineLocals) -> ContextResult<()> {
        let partition_id = locals.context.partition_id();
        let mut partitions = self
            .partitions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if partitions.contains_key(&partition_id) {
            return Err(ContextError::PartitionAlreadyInstalled(partition_id));
        }
        if partitions.len() >= self.config.sites_per_host {
            return Err(ContextError::TooManyPartitions {
                partition: partition_id,
                sites: self.config.sites_per_host,
            });
        }
        partitions.insert(partition_id, locals);
        Ok(())
    }

    /// Joins the replicated-write round for the calling partition.
    ///
    /// Only the designated partition runs `action`, with the calling thread
    /// rebound to the multi-partition context for the duration. Every caller
    /// gets the same outcome.
    pub fn run_replicated_write<F>(&self, action: F) -> Result<(BarrierRole, i64), BarrierError<ExecutorError>>
    where
        F: FnOnce(&ExecutionContext) -> Result<i64, ExecutorError>,
    {
        let mp_context = &self.mp_locals.context;
        let outcome = self.barrier.run(|| {
            let _binding = ContextBinding::rebind(mp_context);
            action(mp_context)
        });
        match &outcome {
            Ok((BarrierRole::Designated, _)) => self.metrics.increment_replicated_writes(),
            Ok((BarrierRole::Follower, _)) => self.metrics.increment_barrier_waits(),
            Err(_) => self.metrics.increment_barrier_failures(),
        }
        outcome
    }
}

/// One partition's engine, created on (and bound to) the thread that runs it
#[derive(Debug)]
pub struct PartitionEngine {
    locals: EngineLocals,
    registry: Arc<EngineRegistry>,
}

impl PartitionEngine {
    /// Creates the partition's context, installs it in the registry and binds
    /// it to the calling thread
    pub fn install(registry: &Arc<EngineRegistry>, site_id: i64, partition_id: i32) -> ContextResult<Self> {
        let config = registry.config();
        let arena = Arc::new(Arena::new(
            format!("partition-{}", partition_id),
            config.temp_table_memory_limit,
        ));
        let context = Arc::new(ExecutionContext::new(
            SiteIdentity {
                site_id,
                partition_id,
                host_id: config.host_id,
                hostname: config.hostname.clone(),
                dr_cluster_id: config.dr_cluster_id,
            },
            arena,
            Arc::clone(registry.metrics()),
        ));
        let locals = EngineLocals::new(context);
        registry.install(locals.clone())?;
        locals.context.bind_current_thread();
        log_event_with_fields(
            Event::PartitionInstalled,
            &[
                ("partition", &partition_id.to_string()),
                ("site", &site_id.to_string()),
            ],
        );
        Ok(Self {
            locals,
            registry: Arc::clone(registry),
        })
    }

    pub fn context(&self) -> &Arc<ExecutionContext> {
        &self.locals.context
    }

    pub fn arena(&self) -> &Arc<Arena> {
        &self.locals.arena
    }

    pub fn locals(&self) -> &EngineLocals {
        &self.locals
    }

    pub fn registry(&self) -> &Arc<EngineRegistry> {
        &self.registry
    }
}
