//! Work-stealing pool for independent trajectories.
//!
//! Implements Heijunka (load leveling): trajectory run times vary with the
//! number of rejected steps, so idle workers steal queued tasks from busy
//! ones instead of waiting on stragglers. Results are re-ordered by task
//! index, making the output independent of thread count and completion order.

use crossbeam_deque::{Injector, Steal, Stealer, Worker};
use std::sync::{Mutex, PoisonError};

use crate::engine::rng::SimRng;

/// One unit of work: a trajectory index and its noise seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrajectoryTask {
    /// Position of the trajectory in the ensemble.
    pub index: usize,
    /// Seed of the trajectory's noise stream.
    pub seed: u64,
}

/// Fixed-size pool of scoped worker threads.
#[derive(Debug, Clone, Copy)]
pub struct WorkPool {
    num_workers: usize,
}

impl Default for WorkPool {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkPool {
    /// Pool sized by the available hardware parallelism.
    #[must_use]
    pub fn new() -> Self {
        Self::with_workers(
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(4),
        )
    }

    /// Pool with an explicit worker count (at least one).
    #[must_use]
    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
        }
    }

    /// Number of worker threads.
    #[must_use]
    pub const fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Run `count` tasks seeded from `master_seed` and return results in
    /// task-index order.
    ///
    /// Task `i` carries `SimRng::stream_seed(master_seed, i)`.
    pub fn execute<F, R>(&self, count: usize, master_seed: u64, run: F) -> Vec<R>
    where
        F: Fn(TrajectoryTask) -> R + Sync,
        R: Send,
    {
        let injector: Injector<TrajectoryTask> = Injector::new();
        for index in 0..count {
            injector.push(TrajectoryTask {
                index,
                seed: SimRng::stream_seed(master_seed, index as u64),
            });
        }

        let workers: Vec<Worker<TrajectoryTask>> = (0..self.num_workers.min(count.max(1)))
            .map(|_| Worker::new_fifo())
            .collect();
        let stealers: Vec<Stealer<TrajectoryTask>> = workers.iter().map(Worker::stealer).collect();
        let results: Mutex<Vec<(usize, R)>> = Mutex::new(Vec::with_capacity(count));

        std::thread::scope(|s| {
            for (worker_id, worker) in workers.into_iter().enumerate() {
                let injector = &injector;
                let stealers = &stealers;
                let results = &results;
                let run = &run;

                s.spawn(move || {
                    while let Some(task) = find_task(worker_id, &worker, injector, stealers) {
                        let result = run(task);
                        results
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push((task.index, result));
                    }
                });
            }
        });

        let mut indexed = results.into_inner().unwrap_or_else(PoisonError::into_inner);
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, r)| r).collect()
    }
}

/// Local queue first, then the global queue, then the other workers.
fn find_task<T>(
    worker_id: usize,
    local: &Worker<T>,
    injector: &Injector<T>,
    stealers: &[Stealer<T>],
) -> Option<T> {
    local.pop().or_else(|| {
        std::iter::repeat_with(|| {
            injector
                .steal_batch_and_pop(local)
                .or_else(|| {
                    (1..=stealers.len())
                        .map(|offset| &stealers[(worker_id + offset) % stealers.len()])
                        .map(Stealer::steal)
                        .collect()
                })
        })
        .find(|steal| !steal.is_retry())
        .and_then(Steal::success)
    })
}
