//! Fetching with bounded retry
//!
//! This module contains the request-level machinery, including:
//! - Building the shared HTTP client
//! - Retrying a fetch under a bounded policy
//! - Bulk fetch tasks and their terminal statuses
//! - The bounded worker pool and per-task output destinations

mod client;
mod destination;
mod pool;
mod retry;
mod task;

pub use client::{build_http_client, get_bytes, get_json, user_agent_string};
pub use destination::{DirectoryDestination, TaskDestination};
pub use pool::{BoundedWorkerPool, PoolReport};
pub use retry::{FetchExhausted, Fetched, RetryPolicy, RetryableFetcher};
pub use task::{FetchTask, TaskId, TaskStatus};

use crate::config::{BulkConfig, Config};
use crate::events::SharedObserver;
use crate::source::HttpResourceSource;
use crate::HarvestError;
use std::sync::Arc;

/// Runs a complete bulk fetch
///
/// Every id in `start-id..=end-id` is fetched from the URL template and
/// written to `<output-dir>/<id>.<extension>`.
///
/// # Arguments
///
/// * `config` - The validated configuration; supplies client and retry settings
/// * `bulk` - The `[bulk]` section, possibly with CLI overrides applied
/// * `observer` - Receives every task and attempt event
///
/// # Returns
///
/// * `Ok(PoolReport)` - Every task reached a terminal status
/// * `Err(HarvestError)` - The client or output directory could not be set up
pub async fn run_bulk_fetch(
    config: &Config,
    bulk: &BulkConfig,
    observer: SharedObserver,
) -> Result<PoolReport, HarvestError> {
    let client = build_http_client(&config.user_agent, &config.fetch)?;
    let source = HttpResourceSource::new(client, bulk.url_template.clone());

    let destination = DirectoryDestination::new(&bulk.output_dir, bulk.extension.clone());
    destination.prepare().await?;

    let fetcher = RetryableFetcher::new(RetryPolicy::from_config(&config.fetch))
        .with_observer(Arc::clone(&observer));
    let pool = BoundedWorkerPool::new(bulk.workers, fetcher, observer);

    pool.run(
        FetchTask::range(bulk.start_id, bulk.end_id),
        Arc::new(source),
        Arc::new(destination),
    )
    .await
}
