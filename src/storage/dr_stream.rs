//! Disaster-recovery stream contract
//!
//! The DR log itself is external. The execution context only needs to
//! flush a stream and carry its committed sequence number over when the
//! stream is replaced.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

/// Flush and sequence-number surface of a DR stream
pub trait DrStream: Send + Sync + std::fmt::Debug {
    /// Sequence number of the last committed record
    fn committed_sequence_number(&self) -> i64;

    /// Handle of the transaction currently open on the stream
    fn open_sp_handle(&self) -> i64;

    /// Flushes buffered data up to `last_committed_sp_handle`
    fn periodic_flush(&self, time_millis: i64, last_committed_sp_handle: i64);

    /// Continues numbering after `sequence_number`
    fn set_last_committed_sequence_number(&self, sequence_number: i64);
}

/// In-memory DR stream recording its flushes
#[derive(Debug, Default)]
pub struct MemoryDrStream {
    committed_sequence_number: AtomicI64,
    open_sp_handle: AtomicI64,
    flushes: Mutex<Vec<(i64, i64)>>,
}

impl MemoryDrStream {
    /// Creates a stream at the given positions
    pub fn new(committed_sequence_number: i64, open_sp_handle: i64) -> Self {
        Self {
            committed_sequence_number: AtomicI64::new(committed_sequence_number),
            open_sp_handle: AtomicI64::new(open_sp_handle),
            flushes: Mutex::new(Vec::new()),
        }
    }

    /// `(time_millis, last_committed_sp_handle)` of every flush so far
    pub fn flushes(&self) -> Vec<(i64, i64)> {
        self.flushes.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl DrStream for MemoryDrStream {
    fn committed_sequence_number(&self) -> i64 {
        self.committed_sequence_number.load(Ordering::Acquire)
    }

    fn open_sp_handle(&self) -> i64 {
        self.open_sp_handle.load(Ordering::Acquire)
    }

    fn periodic_flush(&self, time_millis: i64, last_committed_sp_handle: i64) {
        self.flushes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((time_millis, last_committed_sp_handle));
    }

    fn set_last_committed_sequence_number(&self, sequence_number: i64) {
        self.committed_sequence_number
            .store(sequence_number, Ordering::Release);
    }
}
