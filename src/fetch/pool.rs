//! Bounded worker pool for bulk fetches
//!
//! `W` workers drain one shared FIFO queue. Each task is fetched through the
//! `RetryableFetcher` and stored at its own destination; an exhausted task is
//! recorded and the worker moves on. `run` returns only after every worker has
//! finished, so no task is left pending.

use crate::events::{EventObserver, HarvestEvent, SharedObserver};
use crate::fetch::destination::TaskDestination;
use crate::fetch::retry::RetryableFetcher;
use crate::fetch::task::{FetchTask, TaskId, TaskStatus};
use crate::source::ResourceSource;
use crate::HarvestError;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Outcome of a pool run
#[derive(Debug, Clone, Default)]
pub struct PoolReport {
    /// Every task in its terminal state, in completion order
    pub tasks: Vec<FetchTask>,

    /// Attempts made across all tasks
    pub attempts: u64,
}

impl PoolReport {
    pub fn succeeded(&self) -> Vec<&TaskId> {
        self.ids_with(TaskStatus::Succeeded)
    }

    pub fn exhausted(&self) -> Vec<&TaskId> {
        self.ids_with(TaskStatus::Exhausted)
    }

    /// Tasks not in a terminal state; always zero after `run` returns
    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.status.is_terminal()).count()
    }

    fn ids_with(&self, status: TaskStatus) -> Vec<&TaskId> {
        self.tasks
            .iter()
            .filter(|t| t.status == status)
            .map(|t| &t.id)
            .collect()
    }
}

/// Drains a queue of independent fetch tasks with a fixed number of workers
pub struct BoundedWorkerPool {
    workers: usize,
    fetcher: RetryableFetcher,
    observer: SharedObserver,
}

impl BoundedWorkerPool {
    /// Creates a pool; `workers` is clamped to at least one
    pub fn new(workers: usize, fetcher: RetryableFetcher, observer: SharedObserver) -> Self {
        Self {
            workers: workers.max(1),
            fetcher,
            observer,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Processes every task to a terminal status
    ///
    /// # Arguments
    ///
    /// * `tasks` - Pending tasks, dequeued in order
    /// * `source` - Where payloads come from
    /// * `destination` - Where each payload is stored, keyed by task id
    ///
    /// # Returns
    ///
    /// * `Ok(PoolReport)` - All tasks terminal (succeeded or exhausted)
    /// * `Err(HarvestError::Join)` - A worker panicked
    pub async fn run(
        &self,
        tasks: Vec<FetchTask>,
        source: Arc<dyn ResourceSource>,
        destination: Arc<dyn TaskDestination>,
    ) -> Result<PoolReport, HarvestError> {
        let total = tasks.len();
        let queue = Arc::new(Mutex::new(VecDeque::from(tasks)));
        let worker_count = self.workers.min(total.max(1));

        tracing::info!(
            "Starting bulk fetch of {} tasks with {} workers",
            total,
            worker_count
        );

        let mut join_set = JoinSet::new();
        for worker_id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let source = Arc::clone(&source);
            let destination = Arc::clone(&destination);
            let fetcher = self.fetcher.clone();
            let observer = Arc::clone(&self.observer);

            join_set.spawn(async move {
                run_worker(worker_id, &queue, &*source, &*destination, &fetcher, &*observer).await
            });
        }

        let mut report = PoolReport::default();
        let mut first_failure = None;
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok((finished, attempts)) => {
                    report.tasks.extend(finished);
                    report.attempts += attempts;
                }
                Err(e) => {
                    tracing::error!("Bulk fetch worker failed: {}", e);
                    first_failure.get_or_insert(e);
                }
            }
        }

        // every worker has been joined; none was aborted mid-task
        if let Some(e) = first_failure {
            return Err(e.into());
        }

        tracing::info!(
            "Bulk fetch complete: {} succeeded, {} exhausted, {} attempts",
            report.succeeded().len(),
            report.exhausted().len(),
            report.attempts
        );

        Ok(report)
    }
}

/// Pulls tasks until the queue is empty; returns the finished tasks and attempt count
async fn run_worker(
    worker_id: usize,
    queue: &Mutex<VecDeque<FetchTask>>,
    source: &dyn ResourceSource,
    destination: &dyn TaskDestination,
    fetcher: &RetryableFetcher,
    observer: &dyn EventObserver,
) -> (Vec<FetchTask>, u64) {
    tracing::debug!("Worker {} started", worker_id);
    let mut finished = Vec::new();
    let mut attempts = 0u64;

    loop {
        let next = queue.lock().await.pop_front();
        let Some(mut task) = next else {
            break;
        };

        let id = task.id.clone();
        let target = source.describe(&id);
        let id_ref = &id;
        let outcome = fetcher
            .fetch(&target, || async move {
                let payload = source.fetch_resource(id_ref).await?;
                destination.store(id_ref, &payload).await
            })
            .await;

        match outcome {
            Ok(fetched) => {
                task.succeed(fetched.attempts);
                attempts += u64::from(fetched.attempts);
                observer.on_event(&HarvestEvent::TaskSucceeded {
                    id: id.to_string(),
                    attempts: fetched.attempts,
                });
            }
            Err(exhausted) => {
                let error = exhausted.source.to_string();
                attempts += u64::from(exhausted.attempts);
                observer.on_event(&HarvestEvent::TaskExhausted {
                    id: id.to_string(),
                    attempts: exhausted.attempts,
                    error: error.clone(),
                });
                task.exhaust(exhausted.attempts, error);
            }
        }

        finished.push(task);
    }

    tracing::debug!("Worker {} finished {} tasks", worker_id, finished.len());
    (finished, attempts)
}
