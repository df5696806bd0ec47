//! Crawler module for the citation crawl
//!
//! This module contains the crawl-and-accumulate loop and the wiring that
//! builds it from a configuration:
//! - Crossref paging and OpenCitations relation lookups over one HTTP client
//! - Retry policy shared by every relation fetch
//! - Interval checkpoints to the configured snapshot sink

mod driver;

pub use driver::{CrawlDriver, CrawlReport, CrawlSettings};

use crate::checkpoint::{open_sink, CheckpointScheduler, SystemClock};
use crate::config::Config;
use crate::events::SharedObserver;
use crate::fetch::{build_http_client, RetryPolicy, RetryableFetcher};
use crate::source::{CrossrefSource, DependentRelationResolver, OpenCitationsSource};
use crate::HarvestError;
use std::sync::Arc;
use std::time::Duration;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Build the HTTP client and both sources
/// 2. Open the snapshot sink
/// 3. Page through the search results, resolving citations per item
/// 4. Write interval checkpoints and the final checkpoint
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `observer` - Receives every crawl event
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed and the final checkpoint was written
/// * `Err(HarvestError)` - Crawl aborted or could not start
pub async fn run_crawl(
    config: &Config,
    observer: SharedObserver,
) -> Result<CrawlReport, HarvestError> {
    let client = build_http_client(&config.user_agent, &config.fetch)?;
    let source = CrossrefSource::new(client.clone(), &config.sources)?;
    let relations = OpenCitationsSource::new(client, &config.sources)?;

    let fetcher = RetryableFetcher::new(RetryPolicy::from_config(&config.fetch))
        .with_observer(Arc::clone(&observer));
    let resolver =
        DependentRelationResolver::new(Arc::new(relations), fetcher, Arc::clone(&observer));

    let sink = open_sink(&config.output)?;
    let scheduler = CheckpointScheduler::new(
        save_interval(config.crawl.save_interval_minutes),
        Arc::new(SystemClock),
        sink,
        Arc::clone(&observer),
    );

    let driver = CrawlDriver::new(
        CrawlSettings::from_config(&config.crawl),
        Arc::new(source),
        resolver,
        scheduler,
        observer,
    );

    driver.run().await
}

/// Checkpoint interval for a number of minutes, saturating instead of overflowing
fn save_interval(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}
