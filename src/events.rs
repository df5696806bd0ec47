//! Structured observability events
//!
//! Every component reports progress and absorbed failures as `HarvestEvent`s
//! through an `EventObserver`. Observers only watch; nothing they do feeds
//! back into crawl control flow.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Something noteworthy that happened during a crawl or bulk fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    /// A page of primary items was fetched
    PageFetched { offset: u64, items: usize },

    /// A page fetch failed; `skipped` tells whether the crawl moved past it
    PageFailed {
        offset: u64,
        error: String,
        skipped: bool,
    },

    /// The primary source returned an empty page
    EndOfStream { offset: u64 },

    /// A primary item became a node
    NodeAdded { key: String },

    /// A source record was ignored
    RecordSkipped { origin: String, reason: String },

    /// A relation was added to the graph
    EdgeAdded { from: String, to: String },

    /// Related keys were resolved for an item
    RelationsResolved { key: String, count: usize },

    /// Relation resolution gave up for an item; it contributes no edges
    RelationUnavailable {
        key: String,
        attempts: u32,
        error: String,
    },

    /// One attempt of a retried fetch failed
    FetchAttemptFailed {
        target: String,
        attempt: u32,
        max_attempts: u32,
        error: String,
    },

    /// A bulk task was fetched and stored
    TaskSucceeded { id: String, attempts: u32 },

    /// A bulk task failed on every permitted attempt
    TaskExhausted {
        id: String,
        attempts: u32,
        error: String,
    },

    /// A snapshot was persisted
    CheckpointWritten {
        name: String,
        nodes: usize,
        edges: usize,
    },

    /// A snapshot could not be persisted
    CheckpointFailed { name: String, error: String },
}

impl HarvestEvent {
    /// Short machine-readable name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PageFetched { .. } => "page_fetched",
            Self::PageFailed { .. } => "page_failed",
            Self::EndOfStream { .. } => "end_of_stream",
            Self::NodeAdded { .. } => "node_added",
            Self::RecordSkipped { .. } => "record_skipped",
            Self::EdgeAdded { .. } => "edge_added",
            Self::RelationsResolved { .. } => "relations_resolved",
            Self::RelationUnavailable { .. } => "relation_unavailable",
            Self::FetchAttemptFailed { .. } => "fetch_attempt_failed",
            Self::TaskSucceeded { .. } => "task_succeeded",
            Self::TaskExhausted { .. } => "task_exhausted",
            Self::CheckpointWritten { .. } => "checkpoint_written",
            Self::CheckpointFailed { .. } => "checkpoint_failed",
        }
    }
}

/// Receives events as they happen
///
/// Implementations must be cheap and must not block; they are called inline
/// from crawl and worker tasks.
pub trait EventObserver: Send + Sync {
    fn on_event(&self, event: &HarvestEvent);
}

/// Shared observer handle
pub type SharedObserver = Arc<dyn EventObserver>;

/// Forwards events to `tracing` with structured fields
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EventObserver for TracingObserver {
    fn on_event(&self, event: &HarvestEvent) {
        let kind = event.kind();
        match event {
            HarvestEvent::PageFetched { offset, items } => {
                tracing::info!(kind, offset, items, "Fetched page");
            }
            HarvestEvent::PageFailed {
                offset,
                error,
                skipped,
            } => {
                tracing::warn!(kind, offset, skipped, %error, "Page fetch failed");
            }
            HarvestEvent::EndOfStream { offset } => {
                tracing::info!(kind, offset, "No more items");
            }
            HarvestEvent::NodeAdded { key } => {
                tracing::debug!(kind, %key, "Added node");
            }
            HarvestEvent::RecordSkipped { origin, reason } => {
                tracing::debug!(kind, %origin, %reason, "Skipped record");
            }
            HarvestEvent::EdgeAdded { from, to } => {
                tracing::trace!(kind, %from, %to, "Added edge");
            }
            HarvestEvent::RelationsResolved { key, count } => {
                tracing::debug!(kind, %key, count, "Resolved relations");
            }
            HarvestEvent::RelationUnavailable {
                key,
                attempts,
                error,
            } => {
                tracing::warn!(kind, %key, attempts, %error, "Relations unavailable");
            }
            HarvestEvent::FetchAttemptFailed {
                target,
                attempt,
                max_attempts,
                error,
            } => {
                tracing::warn!(kind, %target, attempt, max_attempts, %error, "Fetch attempt failed");
            }
            HarvestEvent::TaskSucceeded { id, attempts } => {
                tracing::info!(kind, %id, attempts, "Task succeeded");
            }
            HarvestEvent::TaskExhausted {
                id,
                attempts,
                error,
            } => {
                tracing::error!(kind, %id, attempts, %error, "Task exhausted");
            }
            HarvestEvent::CheckpointWritten { name, nodes, edges } => {
                tracing::info!(kind, %name, nodes, edges, "Checkpoint written");
            }
            HarvestEvent::CheckpointFailed { name, error } => {
                tracing::error!(kind, %name, %error, "Checkpoint failed");
            }
        }
    }
}

/// Keeps every event in memory, in arrival order
///
/// Memory grows with every event; long runs should use `CountingObserver`.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    events: Mutex<Vec<HarvestEvent>>,
}

impl CollectingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events seen so far
    pub fn events(&self) -> Vec<HarvestEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Counts events of the given kind
    pub fn count(&self, kind: &str) -> usize {
        self.events().iter().filter(|e| e.kind() == kind).count()
    }
}

impl EventObserver for CollectingObserver {
    fn on_event(&self, event: &HarvestEvent) {
        let mut events = match self.events.lock() {
            Ok(events) => events,
            Err(poisoned) => poisoned.into_inner(),
        };
        events.push(event.clone());
    }
}

/// Counts events per kind in constant memory
#[derive(Debug, Default)]
pub struct CountingObserver {
    counts: Mutex<HashMap<&'static str, u64>>,
}

impl CountingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events of the given kind seen so far
    pub fn count(&self, kind: &str) -> u64 {
        let counts = match self.counts.lock() {
            Ok(counts) => counts,
            Err(poisoned) => poisoned.into_inner(),
        };
        counts.get(kind).copied().unwrap_or(0)
    }
}

impl EventObserver for CountingObserver {
    fn on_event(&self, event: &HarvestEvent) {
        let mut counts = match self.counts.lock() {
            Ok(counts) => counts,
            Err(poisoned) => poisoned.into_inner(),
        };
        *counts.entry(event.kind()).or_insert(0) += 1;
    }
}

/// Sends each event to several observers
pub struct FanOutObserver {
    observers: Vec<SharedObserver>,
}

impl FanOutObserver {
    pub fn new(observers: Vec<SharedObserver>) -> Self {
        Self { observers }
    }
}

impl EventObserver for FanOutObserver {
    fn on_event(&self, event: &HarvestEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}
