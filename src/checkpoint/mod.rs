//! Checkpointing of the crawl graph
//!
//! This module handles persisting snapshots of the live graph, including:
//! - The interval-triggered checkpoint scheduler
//! - The wall clock it reads (real or simulated)
//! - SQLite and GEXF snapshot sinks

mod clock;
mod gexf;
mod scheduler;
mod schema;
mod sqlite;
mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gexf::{format_gexf, GexfSnapshotSink};
pub use scheduler::{
    CheckpointScheduler, CheckpointState, CHECKPOINT_NAME_FORMAT, FINAL_CHECKPOINT_NAME,
};
pub use sqlite::{SnapshotRecord, SqliteSnapshotSink};
pub use traits::{SinkError, SinkResult, SnapshotSink};

use crate::config::{OutputConfig, SinkKind};
use std::path::Path;
use std::sync::Arc;

/// Opens the sink selected by the output configuration
///
/// # Arguments
///
/// * `config` - The `[output]` section
///
/// # Returns
///
/// * `Ok(Arc<dyn SnapshotSink>)` - A sink ready for writes
/// * `Err(SinkError)` - The database could not be opened
pub fn open_sink(config: &OutputConfig) -> SinkResult<Arc<dyn SnapshotSink>> {
    match config.sink {
        SinkKind::Sqlite => Ok(Arc::new(SqliteSnapshotSink::new(Path::new(
            &config.database_path,
        ))?)),
        SinkKind::Gexf => Ok(Arc::new(GexfSnapshotSink::new(
            &config.directory,
            config.file_prefix.clone(),
        ))),
    }
}
