// ── Bounded worker pool ──
//
// One task per job, at most `min(max_workers, jobs)` running at a time.
// `run_all` returns only when every job has finished or panicked; a
// panicking job is counted and logged, never propagated.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{trace, warn};

/// Upper bound on concurrent device polls.
pub const MAX_WORKERS: usize = 20;

/// Summary of one `run_all` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub workers: usize,
    pub dispatched: usize,
    pub completed: usize,
    pub panicked: usize,
}

/// Fixed-size pool for fan-out work within one poll cycle.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    max_workers: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(MAX_WORKERS)
    }
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    /// Worker count used for `jobs` jobs.
    pub fn size_for(&self, jobs: usize) -> usize {
        self.max_workers.min(jobs)
    }

    /// Run `job` for every item and wait for all of them.
    pub async fn run_all<T, F, Fut>(&self, items: impl IntoIterator<Item = T>, job: F) -> PoolReport
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let futures: Vec<Fut> = items.into_iter().map(job).collect();
        let workers = self.size_for(futures.len());
        let mut report = PoolReport {
            workers,
            dispatched: futures.len(),
            ..PoolReport::default()
        };
        if futures.is_empty() {
            return report;
        }

        let permits = Arc::new(Semaphore::new(workers));
        let mut set = JoinSet::new();
        for fut in futures {
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                // The semaphore is never closed while jobs are pending.
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                fut.await;
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(()) => report.completed += 1,
                Err(e) => {
                    report.panicked += 1;
                    warn!(error = %e, "poll worker failed");
                }
            }
        }
        trace!(?report, "worker pool drained");
        report
    }
}
