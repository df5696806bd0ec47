//! Citation-Harvest: a resilient crawl-and-accumulate engine
//!
//! This crate pages through a bibliographic search API, resolves the citations
//! of every discovered work through a second API, and accumulates both into a
//! growing graph that is checkpointed on a wall-clock interval without pausing
//! the crawl. A bounded worker pool fetches many independent resources by id
//! for later stitching into a sequential graph.

pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod events;
pub mod fetch;
pub mod graph;
pub mod output;
pub mod source;
pub mod stitch;

use thiserror::Error;

/// Main error type for Citation-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Primary source unavailable at offset {offset}: {source}")]
    SourceUnavailable { offset: u64, source: SourceError },

    #[error("Snapshot sink error: {0}")]
    Sink(#[from] checkpoint::SinkError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Failure of a single request against an external source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Failed to store {target}: {source}")]
    Store {
        target: String,
        source: std::io::Error,
    },
}

impl SourceError {
    /// Returns true if the failure came from the transport rather than the payload
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::Status { .. })
    }
}

/// Result type alias for Citation-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use events::{EventObserver, HarvestEvent};
pub use graph::{GraphAccumulator, Item, NodeMetadata, Snapshot};
