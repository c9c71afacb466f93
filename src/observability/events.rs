//! Lifecycle events of the execution engine
//!
//! Events are explicit and typed; `as_str` is the stable name written to the
//! log.

use std::fmt;

use super::logger::Severity;

/// Observable engine events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Engine lifecycle
    /// Engine configuration loaded
    ConfigLoaded,
    /// The configured log level could not be applied
    LogLevelRejected,
    /// A partition installed its engine locals
    PartitionInstalled,
    /// A context was bound to the calling thread
    ContextBound,

    // Fragments (begin/complete/failed come from the FRAGMENT scope)
    /// An operator failed and the chain was unwound
    OperatorFailed,

    // Replicated-write barrier
    /// This partition was chosen to run the replicated write
    BarrierDesignated,
    /// The designated partition released the waiters
    BarrierReleased,
    /// A waiting partition was interrupted (FATAL)
    BarrierWaitInterrupted,
    /// A waiting partition gave up after the configured timeout (FATAL)
    BarrierWaitTimedOut,

    // DR
    /// A DR stream was replaced
    DrStreamSwitched,

    // Window functions
    /// A window scan finished
    WindowScanComplete,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::LogLevelRejected => "LOG_LEVEL_REJECTED",
            Event::PartitionInstalled => "PARTITION_INSTALLED",
            Event::ContextBound => "CONTEXT_BOUND",
            Event::OperatorFailed => "OPERATOR_FAILED",
            Event::BarrierDesignated => "BARRIER_DESIGNATED",
            Event::BarrierReleased => "BARRIER_RELEASED",
            Event::BarrierWaitInterrupted => "BARRIER_WAIT_INTERRUPTED",
            Event::BarrierWaitTimedOut => "BARRIER_WAIT_TIMED_OUT",
            Event::DrStreamSwitched => "DR_STREAM_SWITCHED",
            Event::WindowScanComplete => "WINDOW_SCAN_COMPLETE",
        }
    }

    /// Returns true if this event is fatal for the partition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::BarrierWaitInterrupted | Event::BarrierWaitTimedOut)
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            e if e.is_fatal() => Severity::Fatal,
            Event::OperatorFailed => Severity::Error,
            Event::LogLevelRejected => Severity::Warn,
            Event::ContextBound | Event::WindowScanComplete => Severity::Trace,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_wait_failures_are_fatal() {
        assert!(Event::BarrierWaitInterrupted.is_fatal());
        assert!(Event::BarrierWaitTimedOut.is_fatal());
        assert!(!Event::BarrierReleased.is_fatal());
        assert_eq!(Event::BarrierWaitTimedOut.severity(), Severity::Fatal);
    }

    #[test]
    fn test_failure_severity() {
        assert_eq!(Event::OperatorFailed.severity(), Severity::Error);
        assert_eq!(Event::PartitionInstalled.severity(), Severity::Info);
        assert_eq!(Event::LogLevelRejected.severity(), Severity::Warn);
        assert_eq!(Event::WindowScanComplete.severity(), Severity::Trace);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(Event::OperatorFailed.as_str(), "OPERATOR_FAILED");
        assert_eq!(Event::DrStreamSwitched.to_string(), "DR_STREAM_SWITCHED");
    }
}
