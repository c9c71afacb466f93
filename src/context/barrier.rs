//! Cyclic single-writer barrier for replicated-table writes
//!
//! Every partition of a host calls [`ReplicatedWriteBarrier::run`] once per
//! round. The last caller to arrive becomes the designated partition: it runs
//! the action alone, publishes the outcome, resets the count for the next
//! round and wakes everyone else. Waiters never run the action; they return
//! the designated partition's outcome, success or failure.
//!
//! Rounds are identified by a generation number. A waiter only leaves when the
//! generation it arrived in has been released, so a thread that is slow to
//! wake cannot consume a later round's outcome.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::observability::{log_event_with_fields, Event};

/// What a caller did in its round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierRole {
    /// Ran the action
    Designated,
    /// Waited and observed the designated partition's outcome
    Follower,
}

/// Barrier failures, generic over the action's error type
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BarrierError<E> {
    /// The action failed; every partition of the round sees the same error
    #[error("{0}")]
    Action(E),

    /// The designated partition unwound without publishing an outcome
    #[error("designated partition aborted before publishing its result")]
    DesignatedAborted,

    #[error("barrier wait interrupted: {0}")]
    WaitInterrupted(String),

    #[error("barrier wait timed out after {0:?}")]
    WaitTimedOut(Duration),

    #[error("barrier is broken: {0}")]
    Broken(String),
}

#[derive(Debug)]
struct BarrierState<T, E> {
    remaining: usize,
    generation: u64,
    /// Outcome of the most recently released round, tagged with its generation
    outcome: Option<(u64, Result<T, E>)>,
    broken: Option<String>,
}

/// Reusable count-and-wait barrier that elects one writer per round
#[derive(Debug)]
pub struct ReplicatedWriteBarrier<T, E> {
    sites: usize,
    wait_timeout: Option<Duration>,
    state: Mutex<BarrierState<T, E>>,
    released: Condvar,
}

impl<T: Clone, E: Clone> ReplicatedWriteBarrier<T, E> {
    /// Creates a barrier for `sites` partitions (at least one)
    pub fn new(sites: usize, wait_timeout: Option<Duration>) -> Self {
        let sites = sites.max(1);
        Self {
            sites,
            wait_timeout,
            state: Mutex::new(BarrierState {
                remaining: sites,
                generation: 0,
                outcome: None,
                broken: None,
            }),
            released: Condvar::new(),
        }
    }

    /// Number of partitions per round
    pub fn sites(&self) -> usize {
        self.sites
    }

    /// Partitions still expected in the current round
    pub fn remaining(&self) -> usize {
        self.lock_ignoring_poison().remaining
    }

    /// Rounds released so far
    pub fn generation(&self) -> u64 {
        self.lock_ignoring_poison().generation
    }

    pub fn is_broken(&self) -> bool {
        self.lock_ignoring_poison().broken.is_some()
    }

    /// Joins the current round.
    ///
    /// The designated partition runs `action` without holding the barrier
    /// lock. Release happens on every exit path, including unwinding out of
    /// `action`, so a failed write never strands the waiters.
    pub fn run<F>(&self, action: F) -> Result<(BarrierRole, T), BarrierError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut state = self.lock()?;
        if let Some(reason) = &state.broken {
            return Err(BarrierError::Broken(reason.clone()));
        }

        state.remaining = state.remaining.saturating_sub(1);
        let generation = state.generation;

        if state.remaining == 0 {
            drop(state);
            log_event_with_fields(
                Event::BarrierDesignated,
                &[("generation", &generation.to_string())],
            );
            let mut release = Release {
                barrier: self,
                generation,
                outcome: None,
            };
            let result = action();
            release.outcome = Some(result.clone());
            drop(release);
            return result
                .map(|value| (BarrierRole::Designated, value))
                .map_err(BarrierError::Action);
        }

        let state = self.wait_for_release(state, generation)?;
        match &state.outcome {
            Some((released, outcome)) if *released == generation => match outcome {
                Ok(value) => Ok((BarrierRole::Follower, value.clone())),
                Err(err) => Err(BarrierError::Action(err.clone())),
            },
            _ => Err(BarrierError::DesignatedAborted),
        }
    }

    fn wait_for_release<'a>(
        &'a self,
        mut state: MutexGuard<'a, BarrierState<T, E>>,
        generation: u64,
    ) -> Result<MutexGuard<'a, BarrierState<T, E>>, BarrierError<E>> {
        let deadline = self.wait_timeout.map(|timeout| Instant::now() + timeout);
        while state.generation == generation {
            state = match deadline {
                None => self
                    .released
                    .wait(state)
                    .map_err(|poisoned| self.interrupted(poisoned.into_inner()))?,
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(self.timed_out(state, generation));
                    }
                    let (guard, _) = self
                        .released
                        .wait_timeout(state, deadline - now)
                        .map_err(|poisoned| self.interrupted(poisoned.into_inner().0))?;
                    guard
                }
            };
        }
        Ok(state)
    }

    fn lock(&self) -> Result<MutexGuard<'_, BarrierState<T, E>>, BarrierError<E>> {
        self.state
            .lock()
            .map_err(|poisoned| self.interrupted(poisoned.into_inner()))
    }

    fn lock_ignoring_poison(&self) -> MutexGuard<'_, BarrierState<T, E>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn interrupted(&self, mut state: MutexGuard<'_, BarrierState<T, E>>) -> BarrierError<E> {
        let reason = "barrier lock poisoned by a panicking partition".to_string();
        state.broken = Some(reason.clone());
        log_event_with_fields(
            Event::BarrierWaitInterrupted,
            &[("generation", &state.generation.to_string()), ("reason", &reason)],
        );
        BarrierError::WaitInterrupted(reason)
    }

    fn timed_out(&self, mut state: MutexGuard<'_, BarrierState<T, E>>, generation: u64) -> BarrierError<E> {
        let timeout = self.wait_timeout.unwrap_or_default();
        state.broken = Some(format!(
            "round {} not released within {:?}",
            generation, timeout
        ));
        log_event_with_fields(
            Event::BarrierWaitTimedOut,
            &[
                ("generation", &generation.to_string()),
                ("timeout_ms", &timeout.as_millis().to_string()),
            ],
        );
        BarrierError::WaitTimedOut(timeout)
    }
}

/// Releases the designated partition's round when dropped.
///
/// An unset outcome means the action unwound; waiters then see
/// `DesignatedAborted`.
struct Release<'a, T: Clone, E: Clone> {
    barrier: &'a ReplicatedWriteBarrier<T, E>,
    generation: u64,
    outcome: Option<Result<T, E>>,
}

impl<T: Clone, E: Clone> Drop for Release<'_, T, E> {
    fn drop(&mut self) {
        let succeeded = matches!(self.outcome, Some(Ok(_)));
        {
            let mut state = self.barrier.lock_ignoring_poison();
            state.remaining = self.barrier.sites;
            state.outcome = self.outcome.take().map(|outcome| (self.generation, outcome));
            state.generation = self.generation + 1;
        }
        self.barrier.released.notify_all();
        log_event_with_fields(
            Event::BarrierReleased,
            &[
                ("generation", &self.generation.to_string()),
                ("succeeded", if succeeded { "true" } else { "false" }),
            ],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_single_site_is_always_designated() {
        let barrier: ReplicatedWriteBarrier<i64, String> = ReplicatedWriteBarrier::new(1, None);
        let (role, value) = barrier.run(|| Ok(7)).unwrap();
        assert_eq!(role, BarrierRole::Designated);
        assert_eq!(value, 7);
        assert_eq!(barrier.remaining(), 1);
        assert_eq!(barrier.generation(), 1);
    }

    #[test]
    fn test_action_runs_once_per_round() {
        let sites = 4;
        let barrier = Arc::new(ReplicatedWriteBarrier::<i64, String>::new(sites, None));
        let runs = Arc::new(AtomicUsize::new(0));

        for round in 0..3u64 {
            let handles: Vec<_> = (0..sites)
                .map(|_| {
                    let barrier = Arc::clone(&barrier);
                    let runs = Arc::clone(&runs);
                    thread::spawn(move || {
                        barrier.run(|| {
                            runs.fetch_add(1, Ordering::SeqCst);
                            Ok(42)
                        })
                    })
                })
                .collect();
            let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();

            assert_eq!(runs.load(Ordering::SeqCst), round as usize + 1);
            assert_eq!(results.iter().filter(|(role, _)| *role == BarrierRole::Designated).count(), 1);
            assert!(results.iter().all(|(_, value)| *value == 42));
            assert_eq!(barrier.remaining(), sites);
            assert_eq!(barrier.generation(), round + 1);
        }
    }

    #[test]
    fn test_failure_is_shared() {
        let sites = 3;
        let barrier = Arc::new(ReplicatedWriteBarrier::<i64, String>::new(sites, None));
        let handles: Vec<_> = (0..sites)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || barrier.run(|| Err("constraint".to_string())))
            })
            .collect();
        for handle in handles {
            assert_eq!(
                handle.join().unwrap().unwrap_err(),
                BarrierError::Action("constraint".to_string())
            );
        }
        assert_eq!(barrier.remaining(), sites);
        assert!(!barrier.is_broken());
    }

    #[test]
    fn test_panicking_action_releases_waiters() {
        let barrier = Arc::new(ReplicatedWriteBarrier::<i64, String>::new(2, None));
        let waiter = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || barrier.run(|| panic!("waiter must not run the action")))
        };
        while barrier.remaining() != 1 {
            thread::yield_now();
        }
        let designated = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || barrier.run(|| -> Result<i64, String> { panic!("write exploded") }))
        };
        assert!(designated.join().is_err());
        assert_eq!(waiter.join().unwrap().unwrap_err(), BarrierError::DesignatedAborted);
        assert_eq!(barrier.remaining(), 2);
    }

    #[test]
    fn test_timeout_breaks_barrier() {
        let barrier = ReplicatedWriteBarrier::<i64, String>::new(2, Some(Duration::from_millis(20)));
        let err = barrier.run(|| Ok(1)).unwrap_err();
        assert_eq!(err, BarrierError::WaitTimedOut(Duration::from_millis(20)));
        assert!(barrier.is_broken());
        assert!(matches!(barrier.run(|| Ok(1)), Err(BarrierError::Broken(_))));
    }
}
