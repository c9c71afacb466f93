//! Per-partition execution context and its thread binding

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use crate::arena::Arena;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::storage::DrStream;

use super::errors::{ContextError, ContextResult};

/// Partition id of the shared multi-partition context
pub const MP_PARTITION_ID: i32 = 16383;

thread_local! {
    static BOUND_CONTEXT: RefCell<Option<Arc<ExecutionContext>>> = const { RefCell::new(None) };
}

/// Who a context executes for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteIdentity {
    pub site_id: i64,
    pub partition_id: i32,
    pub host_id: i32,
    pub hostname: String,
    pub dr_cluster_id: i32,
}

/// State one partition thread executes fragments against.
///
/// Operators receive the context explicitly. The thread binding exists for
/// code that is handed no context and must find the active one.
pub struct ExecutionContext {
    identity: SiteIdentity,
    arena: Arc<Arena>,
    metrics: Arc<MetricsRegistry>,
    txn_id: AtomicI64,
    sp_handle: AtomicI64,
    last_committed_sp_handle: AtomicI64,
    unique_id: AtomicI64,
    tuples_modified: AtomicI64,
    dr_stream: Mutex<Option<Arc<dyn DrStream>>>,
    dr_replicated_stream: Mutex<Option<Arc<dyn DrStream>>>,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("identity", &self.identity)
            .field("arena", &self.arena.name())
            .field("txn_id", &self.txn_id())
            .field("sp_handle", &self.sp_handle())
            .finish()
    }
}

impl ExecutionContext {
    pub fn new(identity: SiteIdentity, arena: Arc<Arena>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            identity,
            arena,
            metrics,
            txn_id: AtomicI64::new(0),
            sp_handle: AtomicI64::new(0),
            last_committed_sp_handle: AtomicI64::new(0),
            unique_id: AtomicI64::new(0),
            tuples_modified: AtomicI64::new(0),
            dr_stream: Mutex::new(None),
            dr_replicated_stream: Mutex::new(None),
        }
    }

    // ---- thread binding ----

    /// Makes this the context of the calling thread, replacing any prior one
    pub fn bind_current_thread(self: &Arc<Self>) {
        BOUND_CONTEXT.with(|slot| *slot.borrow_mut() = Some(Arc::clone(self)));
        log_event_with_fields(
            Event::ContextBound,
            &[("partition", &self.identity.partition_id.to_string())],
        );
    }

    /// Context bound to the calling thread, if any
    pub fn current() -> Option<Arc<ExecutionContext>> {
        BOUND_CONTEXT.with(|slot| slot.borrow().clone())
    }

    /// Like [`current`](Self::current) but an error when unbound
    pub fn require_current() -> ContextResult<Arc<ExecutionContext>> {
        Self::current().ok_or(ContextError::NotBound)
    }

    /// Clears the calling thread's binding
    pub fn unbind_current_thread() {
        BOUND_CONTEXT.with(|slot| *slot.borrow_mut() = None);
    }

    /// Whether the calling thread is bound to this context
    pub fn is_bound_to_current_thread(self: &Arc<Self>) -> bool {
        BOUND_CONTEXT.with(|slot| {
            slot.borrow()
                .as_ref()
                .is_some_and(|bound| Arc::ptr_eq(bound, self))
        })
    }

    // ---- identity ----

    pub fn identity(&self) -> &SiteIdentity {
        &self.identity
    }

    pub fn site_id(&self) -> i64 {
        self.identity.site_id
    }

    pub fn partition_id(&self) -> i32 {
        self.identity.partition_id
    }

    pub fn host_id(&self) -> i32 {
        self.identity.host_id
    }

    pub fn hostname(&self) -> &str {
        &self.identity.hostname
    }

    pub fn dr_cluster_id(&self) -> i32 {
        self.identity.dr_cluster_id
    }

    pub fn is_multi_partition(&self) -> bool {
        self.identity.partition_id == MP_PARTITION_ID
    }

    /// Arena all temp tables and scratch pools of this partition charge
    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }

    // ---- transaction state ----

    /// Records the transaction the next fragments belong to
    pub fn setup_for_plan_fragments(
        &self,
        txn_id: i64,
        sp_handle: i64,
        last_committed_sp_handle: i64,
        unique_id: i64,
    ) {
        self.txn_id.store(txn_id, Ordering::Release);
        self.sp_handle.store(sp_handle, Ordering::Release);
        self.last_committed_sp_handle
            .store(last_committed_sp_handle, Ordering::Release);
        self.unique_id.store(unique_id, Ordering::Release);
    }

    pub fn txn_id(&self) -> i64 {
        self.txn_id.load(Ordering::Acquire)
    }

    pub fn sp_handle(&self) -> i64 {
        self.sp_handle.load(Ordering::Acquire)
    }

    pub fn last_committed_sp_handle(&self) -> i64 {
        self.last_committed_sp_handle.load(Ordering::Acquire)
    }

    pub fn unique_id(&self) -> i64 {
        self.unique_id.load(Ordering::Acquire)
    }

    /// Adds to the modified-tuple count of the current fragment
    pub fn add_tuples_modified(&self, count: i64) {
        self.tuples_modified.fetch_add(count, Ordering::AcqRel);
        if count > 0 {
            self.metrics.add_tuples_modified(count as u64);
        }
    }

    pub fn tuples_modified(&self) -> i64 {
        self.tuples_modified.load(Ordering::Acquire)
    }

    /// Returns the modified-tuple count and starts a new one
    pub fn take_tuples_modified(&self) -> i64 {
        self.tuples_modified.swap(0, Ordering::AcqRel)
    }

    // ---- DR streams ----

    pub fn dr_stream(&self) -> Option<Arc<dyn DrStream>> {
        lock(&self.dr_stream).clone()
    }

    pub fn dr_replicated_stream(&self) -> Option<Arc<dyn DrStream>> {
        lock(&self.dr_replicated_stream).clone()
    }

    /// Replaces the partitioned DR stream, carrying its sequence number over
    pub fn set_dr_stream(&self, stream: Arc<dyn DrStream>) -> ContextResult<()> {
        self.switch_stream(&self.dr_stream, stream, "partitioned")
    }

    /// Replaces the replicated-table DR stream, carrying its sequence number over
    pub fn set_dr_replicated_stream(&self, stream: Arc<dyn DrStream>) -> ContextResult<()> {
        self.switch_stream(&self.dr_replicated_stream, stream, "replicated")
    }

    fn switch_stream(
        &self,
        slot: &Mutex<Option<Arc<dyn DrStream>>>,
        replacement: Arc<dyn DrStream>,
        kind: &str,
    ) -> ContextResult<()> {
        let mut current = lock(slot);
        if let Some(old) = current.as_ref() {
            let old_seq = old.committed_sequence_number();
            let new_seq = replacement.committed_sequence_number();
            if old_seq < new_seq {
                return Err(ContextError::DrSequenceRegression {
                    current: old_seq,
                    replacement: new_seq,
                });
            }
            let flush_to = self
                .last_committed_sp_handle()
                .max(replacement.open_sp_handle());
            old.periodic_flush(-1, flush_to);
            replacement.set_last_committed_sequence_number(old_seq);
            log_event_with_fields(
                Event::DrStreamSwitched,
                &[
                    ("kind", kind),
                    ("partition", &self.identity.partition_id.to_string()),
                    ("sequence_number", &old_seq.to_string()),
                ],
            );
        }
        *current = Some(replacement);
        Ok(())
    }
}

fn lock(slot: &Mutex<Option<Arc<dyn DrStream>>>) -> std::sync::MutexGuard<'_, Option<Arc<dyn DrStream>>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Temporarily rebinds the calling thread; the previous binding returns on drop
pub struct ContextBinding {
    previous: Option<Arc<ExecutionContext>>,
}

impl ContextBinding {
    pub fn rebind(context: &Arc<ExecutionContext>) -> Self {
        let previous = BOUND_CONTEXT.with(|slot| slot.borrow_mut().replace(Arc::clone(context)));
        Self { previous }
    }
}

impl Drop for ContextBinding {
    fn drop(&mut self) {
        let previous = self.previous.take();
        BOUND_CONTEXT.with(|slot| *slot.borrow_mut() = previous);
    }
}
