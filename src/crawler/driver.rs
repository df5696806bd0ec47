//! Crawl driver - the main crawl-and-accumulate loop
//!
//! One logical thread of control: a page is fetched, its items become nodes,
//! each item's citations are resolved and added as edges, and only then is the
//! next page requested. The checkpoint scheduler is polled after every item
//! and every page, and a final checkpoint is always written.

use crate::checkpoint::CheckpointScheduler;
use crate::config::{CrawlConfig, SourceErrorPolicy};
use crate::events::{HarvestEvent, SharedObserver};
use crate::graph::{GraphAccumulator, Item, Snapshot};
use crate::source::{DependentRelationResolver, PaginatedSource};
use crate::HarvestError;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Knobs of a single crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    pub query: String,
    pub page_size: u32,

    /// Pause after each item's relation lookup and after each page
    pub request_delay: Duration,

    pub on_source_error: SourceErrorPolicy,

    /// With `Skip`, this many failed pages in a row still abort the crawl
    pub max_consecutive_page_failures: u32,
}

impl CrawlSettings {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            query: config.query.clone(),
            page_size: config.page_size,
            request_delay: Duration::from_millis(config.request_delay_ms),
            on_source_error: config.on_source_error,
            max_consecutive_page_failures: config.max_consecutive_page_failures,
        }
    }
}

/// What a finished crawl produced
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Non-empty pages processed
    pub pages: u64,

    /// Items seen across all pages, duplicates included
    pub items: u64,

    /// Pages given up on under the skip policy
    pub skipped_pages: u64,

    /// Offset of the empty page that ended the stream
    pub final_offset: u64,

    pub interval_checkpoints: usize,

    /// The graph as written by the final checkpoint
    pub snapshot: Snapshot,
}

/// Orchestrates paging, node insertion, relation resolution and checkpoints
pub struct CrawlDriver {
    settings: CrawlSettings,
    source: Arc<dyn PaginatedSource>,
    resolver: DependentRelationResolver,
    graph: GraphAccumulator,
    scheduler: CheckpointScheduler,
    observer: SharedObserver,
}

impl CrawlDriver {
    /// Creates a driver over an empty directed graph
    pub fn new(
        settings: CrawlSettings,
        source: Arc<dyn PaginatedSource>,
        resolver: DependentRelationResolver,
        scheduler: CheckpointScheduler,
        observer: SharedObserver,
    ) -> Self {
        Self {
            settings,
            source,
            resolver,
            graph: GraphAccumulator::directed(),
            scheduler,
            observer,
        }
    }

    /// Runs the crawl until the first empty page
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The stream ended and the final checkpoint was written
    /// * `Err(HarvestError::SourceUnavailable)` - A page failed and the policy
    ///   said abort; the final checkpoint was still attempted first
    /// * `Err(HarvestError::Sink)` - The final checkpoint could not be written
    pub async fn run(mut self) -> Result<CrawlReport, HarvestError> {
        tracing::info!(
            "Starting crawl for '{}' (page size {}, checkpoints to {})",
            self.settings.query,
            self.settings.page_size,
            self.scheduler.sink().describe()
        );

        let start_time = std::time::Instant::now();
        let page_size = u64::from(self.settings.page_size);
        let mut offset = 0u64;
        let mut consecutive_failures = 0u32;
        let mut resolved: HashSet<String> = HashSet::new();
        let mut pages = 0u64;
        let mut items = 0u64;
        let mut skipped_pages = 0u64;

        let outcome = loop {
            let page = match self
                .source
                .next_page(&self.settings.query, offset, self.settings.page_size)
                .await
            {
                Ok(page) => {
                    consecutive_failures = 0;
                    page
                }
                Err(error) => {
                    consecutive_failures += 1;
                    let skip = self.settings.on_source_error == SourceErrorPolicy::Skip
                        && consecutive_failures < self.settings.max_consecutive_page_failures;

                    self.emit(HarvestEvent::PageFailed {
                        offset,
                        error: error.to_string(),
                        skipped: skip,
                    });

                    if !skip {
                        break Err(HarvestError::SourceUnavailable {
                            offset,
                            source: error,
                        });
                    }

                    skipped_pages += 1;
                    offset += page_size;
                    self.scheduler.poll(&self.graph).await;
                    self.pause().await;
                    continue;
                }
            };

            if page.is_empty() {
                self.emit(HarvestEvent::EndOfStream { offset });
                break Ok(());
            }

            self.emit(HarvestEvent::PageFetched {
                offset,
                items: page.len(),
            });
            pages += 1;
            items += page.len() as u64;

            let accepted = self.insert_items(page);

            for key in accepted {
                if resolved.contains(&key) {
                    continue;
                }

                // an unavailable item is retried if a later page lists it again
                if let Some(citing) = self.resolver.resolve(&key).await {
                    for citer in &citing {
                        if self.graph.upsert_edge(citer, &key) {
                            self.emit(HarvestEvent::EdgeAdded {
                                from: citer.clone(),
                                to: key.clone(),
                            });
                        }
                    }
                    resolved.insert(key);
                }

                self.scheduler.poll(&self.graph).await;
                self.pause().await;
            }

            tracing::info!(
                "Progress: offset {}, {} nodes, {} edges, {:.2} pages/sec",
                offset,
                self.graph.node_count(),
                self.graph.edge_count(),
                pages as f64 / start_time.elapsed().as_secs_f64().max(f64::EPSILON)
            );

            self.scheduler.poll(&self.graph).await;
            self.pause().await;
            offset += page_size;
        };

        let finalized = self.scheduler.finalize(&self.graph).await;

        tracing::info!(
            "Crawl finished after {:?}: {} nodes, {} edges, {} dangling",
            start_time.elapsed(),
            self.graph.node_count(),
            self.graph.edge_count(),
            self.graph.dangling_count()
        );

        outcome?;
        let snapshot = finalized?;

        Ok(CrawlReport {
            pages,
            items,
            skipped_pages,
            final_offset: offset,
            interval_checkpoints: self.scheduler.interval_checkpoints(),
            snapshot,
        })
    }

    /// Upserts a node per item and returns the keys to resolve, in page order
    fn insert_items(&mut self, page: Vec<Item>) -> Vec<String> {
        let mut accepted = Vec::with_capacity(page.len());

        for item in page {
            let key = item.key.trim();
            if key.is_empty() {
                self.emit(HarvestEvent::RecordSkipped {
                    origin: format!("'{}'", item.title),
                    reason: "missing key".to_string(),
                });
                continue;
            }

            if self.graph.upsert_node(key, item.metadata()) {
                self.emit(HarvestEvent::NodeAdded {
                    key: key.to_string(),
                });
            }
            accepted.push(key.to_string());
        }

        accepted
    }

    async fn pause(&self) {
        if !self.settings.request_delay.is_zero() {
            tokio::time::sleep(self.settings.request_delay).await;
        }
    }

    fn emit(&self, event: HarvestEvent) {
        self.observer.on_event(&event);
    }
}
