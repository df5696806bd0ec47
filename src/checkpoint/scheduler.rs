//! Interval-triggered checkpointing
//!
//! The scheduler is polled once per crawl iteration. When the save interval has
//! elapsed it snapshots the graph and hands the snapshot to the sink on the
//! blocking thread pool, then returns so the crawl can continue. At most one
//! write is in flight; a checkpoint that falls due while the previous write is
//! still running waits for it first.

use crate::checkpoint::clock::Clock;
use crate::checkpoint::traits::{SinkError, SinkResult, SnapshotSink};
use crate::events::{HarvestEvent, SharedObserver};
use crate::graph::{GraphAccumulator, Snapshot};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Name of the checkpoint written when a crawl finishes
pub const FINAL_CHECKPOINT_NAME: &str = "final";

/// Format of interval checkpoint names
pub const CHECKPOINT_NAME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Whether an interval checkpoint is due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointState {
    /// Less than one interval has elapsed since the last checkpoint
    Waiting,

    /// At least one interval has elapsed
    Due,
}

struct PendingWrite {
    name: String,
    nodes: usize,
    edges: usize,
    handle: JoinHandle<SinkResult<()>>,
}

/// Triggers snapshot writes on a wall-clock interval
pub struct CheckpointScheduler {
    interval: Duration,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn SnapshotSink>,
    observer: SharedObserver,
    last_checkpoint: DateTime<Utc>,
    in_flight: Option<PendingWrite>,
    interval_checkpoints: usize,
    failed_writes: usize,
}

impl CheckpointScheduler {
    /// Creates a scheduler whose first interval starts now
    ///
    /// # Arguments
    ///
    /// * `interval` - Time between interval checkpoints
    /// * `clock` - Source of the current time
    /// * `sink` - Where snapshots are written
    /// * `observer` - Receives `CheckpointWritten`/`CheckpointFailed` events
    pub fn new(
        interval: Duration,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn SnapshotSink>,
        observer: SharedObserver,
    ) -> Self {
        let last_checkpoint = clock.now();
        Self {
            interval,
            clock,
            sink,
            observer,
            last_checkpoint,
            in_flight: None,
            interval_checkpoints: 0,
            failed_writes: 0,
        }
    }

    /// Current state as seen by the clock
    pub fn state(&self) -> CheckpointState {
        let elapsed = (self.clock.now() - self.last_checkpoint)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if elapsed >= self.interval {
            CheckpointState::Due
        } else {
            CheckpointState::Waiting
        }
    }

    /// Number of interval checkpoints started so far
    pub fn interval_checkpoints(&self) -> usize {
        self.interval_checkpoints
    }

    /// Number of writes that failed so far, the final one included
    pub fn failed_writes(&self) -> usize {
        self.failed_writes
    }

    pub fn sink(&self) -> &Arc<dyn SnapshotSink> {
        &self.sink
    }

    /// Checks the clock and starts an interval checkpoint when due
    ///
    /// # Returns
    ///
    /// The name of the checkpoint that was started, if any
    pub async fn poll(&mut self, graph: &GraphAccumulator) -> Option<String> {
        self.reap_finished().await;

        if self.state() == CheckpointState::Waiting {
            return None;
        }

        self.flush().await;

        let now = self.clock.now();
        let name = now.format(CHECKPOINT_NAME_FORMAT).to_string();
        let snapshot = graph.snapshot_at(now);

        self.start_write(snapshot, name.clone());
        self.last_checkpoint = now;
        self.interval_checkpoints += 1;

        Some(name)
    }

    /// Waits for the in-flight write, if there is one
    pub async fn flush(&mut self) {
        if let Some(pending) = self.in_flight.take() {
            let result = match pending.handle.await {
                Ok(result) => result,
                Err(e) => Err(SinkError::Interrupted(e.to_string())),
            };
            self.report(&pending.name, pending.nodes, pending.edges, &result);
        }
    }

    /// Writes the terminal checkpoint and waits for it
    ///
    /// Any in-flight interval write is finished first. The returned snapshot is
    /// the one handed to the sink.
    pub async fn finalize(&mut self, graph: &GraphAccumulator) -> SinkResult<Snapshot> {
        self.flush().await;

        let snapshot = graph.snapshot_at(self.clock.now());
        let nodes = snapshot.node_count();
        let edges = snapshot.edge_count();

        let sink = Arc::clone(&self.sink);
        let to_write = snapshot.clone();
        let result = match tokio::task::spawn_blocking(move || {
            sink.write(&to_write, FINAL_CHECKPOINT_NAME)
        })
        .await
        {
            Ok(result) => result,
            Err(e) => Err(SinkError::Interrupted(e.to_string())),
        };

        self.report(FINAL_CHECKPOINT_NAME, nodes, edges, &result);
        result.map(|()| snapshot)
    }

    fn start_write(&mut self, snapshot: Snapshot, name: String) {
        let nodes = snapshot.node_count();
        let edges = snapshot.edge_count();
        let sink = Arc::clone(&self.sink);
        let write_name = name.clone();

        tracing::debug!("Starting checkpoint {} ({} nodes, {} edges)", name, nodes, edges);
        let handle = tokio::task::spawn_blocking(move || sink.write(&snapshot, &write_name));

        self.in_flight = Some(PendingWrite {
            name,
            nodes,
            edges,
            handle,
        });
    }

    async fn reap_finished(&mut self) {
        let finished = self
            .in_flight
            .as_ref()
            .map(|pending| pending.handle.is_finished())
            .unwrap_or(false);

        if finished {
            self.flush().await;
        }
    }

    fn report(&mut self, name: &str, nodes: usize, edges: usize, result: &SinkResult<()>) {
        let event = match result {
            Ok(()) => HarvestEvent::CheckpointWritten {
                name: name.to_string(),
                nodes,
                edges,
            },
            Err(e) => {
                self.failed_writes += 1;
                HarvestEvent::CheckpointFailed {
                    name: name.to_string(),
                    error: e.to_string(),
                }
            }
        };
        self.observer.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::clock::ManualClock;
    use crate::events::CollectingObserver;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Records written names; fails while `failing` is set
    #[derive(Default)]
    struct RecordingSink {
        written: Mutex<Vec<(String, usize)>>,
        failing: AtomicBool,
    }

    impl RecordingSink {
        fn names(&self) -> Vec<String> {
            self.written
                .lock()
                .unwrap()
                .iter()
                .map(|(n, _)| n.clone())
                .collect()
        }
    }

    impl SnapshotSink for RecordingSink {
        fn write(&self, snapshot: &Snapshot, name: &str) -> SinkResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(SinkError::Database("disk full".to_string()));
            }
            self.written
                .lock()
                .unwrap()
                .push((name.to_string(), snapshot.node_count()));
            Ok(())
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn scheduler(
        clock: Arc<ManualClock>,
        sink: Arc<RecordingSink>,
        observer: Arc<CollectingObserver>,
    ) -> CheckpointScheduler {
        CheckpointScheduler::new(Duration::from_secs(600), clock, sink, observer)
    }

    #[tokio::test]
    async fn test_first_check_measures_from_start() {
        let clock = Arc::new(ManualClock::new(start()));
        let sink = Arc::new(RecordingSink::default());
        let observer = Arc::new(CollectingObserver::new());
        let mut scheduler = scheduler(clock.clone(), sink.clone(), observer);
        let graph = GraphAccumulator::directed();

        clock.advance(chrono::Duration::minutes(9));
        assert_eq!(scheduler.state(), CheckpointState::Waiting);
        assert_eq!(scheduler.poll(&graph).await, None);

        clock.advance(chrono::Duration::minutes(1));
        assert_eq!(scheduler.state(), CheckpointState::Due);
        assert_eq!(
            scheduler.poll(&graph).await.as_deref(),
            Some("20240301_121000")
        );
        assert_eq!(scheduler.state(), CheckpointState::Waiting);
    }

    #[tokio::test]
    async fn test_one_checkpoint_per_boundary_plus_final() {
        let clock = Arc::new(ManualClock::new(start()));
        let sink = Arc::new(RecordingSink::default());
        let observer = Arc::new(CollectingObserver::new());
        let mut scheduler = scheduler(clock.clone(), sink.clone(), observer.clone());
        let mut graph = GraphAccumulator::directed();

        // 35 simulated minutes, polled once a minute
        for minute in 0..35 {
            graph.upsert_edge(&format!("k{}", minute), "root");
            clock.advance(chrono::Duration::minutes(1));
            scheduler.poll(&graph).await;
        }
        let snapshot = scheduler.finalize(&graph).await.unwrap();

        assert_eq!(scheduler.interval_checkpoints(), 3);
        assert_eq!(
            sink.names(),
            vec![
                "20240301_121000",
                "20240301_122000",
                "20240301_123000",
                FINAL_CHECKPOINT_NAME
            ]
        );
        assert_eq!(snapshot.node_count(), 36);
        assert_eq!(observer.count("checkpoint_written"), 4);
    }

    #[tokio::test]
    async fn test_long_stall_counts_as_one_checkpoint() {
        let clock = Arc::new(ManualClock::new(start()));
        let sink = Arc::new(RecordingSink::default());
        let observer = Arc::new(CollectingObserver::new());
        let mut scheduler = scheduler(clock.clone(), sink.clone(), observer);
        let graph = GraphAccumulator::directed();

        clock.advance(chrono::Duration::minutes(45));
        assert!(scheduler.poll(&graph).await.is_some());
        assert!(scheduler.poll(&graph).await.is_none());
        scheduler.flush().await;

        assert_eq!(sink.names().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_isolated_from_later_upserts() {
        let clock = Arc::new(ManualClock::new(start()));
        let sink = Arc::new(RecordingSink::default());
        let observer = Arc::new(CollectingObserver::new());
        let mut scheduler = scheduler(clock.clone(), sink.clone(), observer);
        let mut graph = GraphAccumulator::directed();

        graph.upsert_edge("a", "b");
        clock.advance(chrono::Duration::minutes(10));
        scheduler.poll(&graph).await;
        graph.upsert_edge("c", "d");
        scheduler.flush().await;

        let written = sink.written.lock().unwrap().clone();
        assert_eq!(written[0].1, 2);
    }

    #[tokio::test]
    async fn test_sink_failure_is_reported_and_next_checkpoint_retries() {
        let clock = Arc::new(ManualClock::new(start()));
        let sink = Arc::new(RecordingSink::default());
        let observer = Arc::new(CollectingObserver::new());
        let mut scheduler = scheduler(clock.clone(), sink.clone(), observer.clone());
        let graph = GraphAccumulator::directed();

        sink.failing.store(true, Ordering::SeqCst);
        clock.advance(chrono::Duration::minutes(10));
        scheduler.poll(&graph).await;
        scheduler.flush().await;

        assert_eq!(observer.count("checkpoint_failed"), 1);
        assert_eq!(scheduler.failed_writes(), 1);

        sink.failing.store(false, Ordering::SeqCst);
        clock.advance(chrono::Duration::minutes(10));
        scheduler.poll(&graph).await;
        scheduler.finalize(&graph).await.unwrap();

        assert_eq!(sink.names(), vec!["20240301_122000", FINAL_CHECKPOINT_NAME]);
    }

    #[tokio::test]
    async fn test_final_failure_is_returned() {
        let clock = Arc::new(ManualClock::new(start()));
        let sink = Arc::new(RecordingSink::default());
        let observer = Arc::new(CollectingObserver::new());
        let mut scheduler = scheduler(clock, sink.clone(), observer.clone());

        sink.failing.store(true, Ordering::SeqCst);
        let result = scheduler.finalize(&GraphAccumulator::directed()).await;

        assert!(matches!(result, Err(SinkError::Database(_))));
        assert_eq!(observer.count("checkpoint_failed"), 1);
    }
}
