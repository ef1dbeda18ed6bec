//! Bounded pool for resolution branches
//!
//! This module handles:
//! - Spawning each branch as its own task
//! - Global concurrency limiting via a semaphore
//! - Collecting branch results in completion order

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs branches in parallel, at most `max_concurrent` at a time
///
/// Tasks are spawned immediately but wait for a permit before doing any work.
/// Dropping the scheduler aborts every branch still running.
pub struct BranchScheduler<T> {
    permits: Arc<Semaphore>,
    tasks: JoinSet<T>,
    spawned: usize,
}

impl<T: Send + 'static> BranchScheduler<T> {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tasks: JoinSet::new(),
            spawned: 0,
        }
    }

    /// Queues a branch
    pub fn spawn<F>(&mut self, branch: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.spawned += 1;

        self.tasks.spawn(async move {
            // The semaphore is never closed, so this only fails on shutdown
            let _permit = permits.acquire_owned().await.ok();
            branch.await
        });
    }

    /// Waits for the next branch to finish
    ///
    /// Returns `None` once every spawned branch has finished. A branch that
    /// panicked is logged and skipped.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            match self.tasks.join_next().await? {
                Ok(result) => return Some(result),
                Err(e) if e.is_panic() => {
                    tracing::error!("Resolution branch panicked: {}", e);
                }
                Err(e) => {
                    tracing::debug!("Resolution branch cancelled: {}", e);
                }
            }
        }
    }

    /// Number of branches spawned so far
    pub fn spawned(&self) -> usize {
        self.spawned
    }
}
