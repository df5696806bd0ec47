//! Snapshot sink trait and error types
//!
//! A sink persists a named `Snapshot`. Sinks are blocking; the scheduler runs
//! them on the blocking thread pool so the crawl keeps going while they write.

use crate::graph::Snapshot;
use thiserror::Error;

/// Errors that can occur while persisting or loading snapshots
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Sink lock poisoned")]
    Poisoned,

    #[error("Checkpoint write interrupted: {0}")]
    Interrupted(String),
}

impl From<serde_json::Error> for SinkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Durable destination for graph snapshots
///
/// Writing a name that was written before replaces the earlier snapshot.
pub trait SnapshotSink: Send + Sync {
    /// Persists `snapshot` under `name`
    fn write(&self, snapshot: &Snapshot, name: &str) -> SinkResult<()>;

    /// Short human-readable description of where snapshots go
    fn describe(&self) -> String;
}
