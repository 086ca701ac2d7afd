//! Process-group collaborator: worker identity, barriers, collective agreement.
//!
//! The sweep only needs three things from its group: who am I, wait for
//! everyone, and "did everyone succeed?". [`LocalGroup`] provides them
//! with one OS thread per worker inside the current process.

use crate::error::{BenchError, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Barrier, Mutex};

/// Position of a worker in the group. Fixed for the worker's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity {
    pub rank: usize,
    pub group_size: usize,
}

impl WorkerIdentity {
    /// Whether this worker prints results.
    pub fn is_coordinator(&self) -> bool {
        self.rank == 0
    }
}

/// Collective operations every worker of a group must call in the same order.
///
/// A worker that never reaches a collective call stalls the whole group;
/// there is no timeout.
pub trait ProcessGroup {
    fn identity(&self) -> WorkerIdentity;

    /// Block until every worker has called `barrier`.
    fn barrier(&self);

    /// Collective AND of `local_ok` across the group.
    fn all_agree(&self, local_ok: bool) -> bool;
}

struct Shared {
    barrier: Barrier,
    failed: Mutex<bool>,
}

/// Handle given to one worker of a [`LocalGroup`].
pub struct LocalWorker<'g> {
    identity: WorkerIdentity,
    shared: &'g Shared,
}

impl ProcessGroup for LocalWorker<'_> {
    fn identity(&self) -> WorkerIdentity {
        self.identity
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn all_agree(&self, local_ok: bool) -> bool {
        // Previous round's readers are done once this barrier releases.
        if self.shared.barrier.wait().is_leader() {
            *lock(&self.shared.failed) = false;
        }
        self.shared.barrier.wait();
        if !local_ok {
            *lock(&self.shared.failed) = true;
        }
        self.shared.barrier.wait();
        !*lock(&self.shared.failed)
    }
}

fn lock(m: &Mutex<bool>) -> std::sync::MutexGuard<'_, bool> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A group of `size` workers running as threads of this process.
pub struct LocalGroup;

impl LocalGroup {
    /// Run `f` once per worker and wait for all of them.
    ///
    /// Returns the workers' values ordered by rank, or the error of the
    /// lowest-ranked worker that failed.
    pub fn run<T, F>(size: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(LocalWorker<'_>) -> Result<T> + Sync,
    {
        if size == 0 {
            return Err(BenchError::InvalidConfig("group size must be at least 1".into()));
        }

        let shared = Shared {
            barrier: Barrier::new(size),
            failed: Mutex::new(false),
        };

        let outcomes: Vec<Result<T>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..size)
                .map(|rank| {
                    let worker = LocalWorker {
                        identity: WorkerIdentity {
                            rank,
                            group_size: size,
                        },
                        shared: &shared,
                    };
                    let f = &f;
                    scope.spawn(move || f(worker))
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(rank, h)| h.join().unwrap_or(Err(BenchError::WorkerPanicked { rank })))
                .collect()
        });

        outcomes.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn should_assign_distinct_ranks_when_running() {
        let ids = LocalGroup::run(4, |w| Ok(w.identity())).unwrap();
        let ranks: Vec<_> = ids.iter().map(|i| i.rank).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
        assert!(ids.iter().all(|i| i.group_size == 4));
        assert!(ids[0].is_coordinator());
    }

    #[test]
    fn should_hold_everyone_at_barrier() {
        let arrived = AtomicUsize::new(0);
        let seen = LocalGroup::run(3, |w| {
            arrived.fetch_add(1, Ordering::SeqCst);
            w.barrier();
            Ok(arrived.load(Ordering::SeqCst))
        })
        .unwrap();
        assert_eq!(seen, vec![3, 3, 3]);
    }

    #[test]
    fn should_disagree_when_any_worker_fails() {
        let votes = LocalGroup::run(4, |w| Ok(w.all_agree(w.identity().rank != 2))).unwrap();
        assert_eq!(votes, vec![false; 4]);
    }

    #[test]
    fn should_reset_agreement_between_rounds() {
        let votes = LocalGroup::run(3, |w| {
            let first = w.all_agree(w.identity().rank != 1);
            let second = w.all_agree(true);
            Ok((first, second))
        })
        .unwrap();
        assert!(votes.iter().all(|&(a, b)| !a && b));
    }

    #[test]
    fn should_return_lowest_rank_error_when_workers_fail() {
        let err = LocalGroup::run(3, |w| -> Result<()> {
            Err(BenchError::InvalidConfig(format!("rank {}", w.identity().rank)))
        })
        .unwrap_err();
        assert!(err.to_string().contains("rank 0"));
    }

    #[test]
    fn should_reject_empty_group() {
        assert!(LocalGroup::run(0, |_| Ok(())).is_err());
    }
}
