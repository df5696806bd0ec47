//! Configuration module for Citation-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use citation_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Crawling '{}' with page size {}", config.crawl.query, config.crawl.page_size);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BulkConfig, Config, CrawlConfig, FetchConfig, OutputConfig, SinkKind, SourceErrorPolicy,
    SourcesConfig, StitchConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
