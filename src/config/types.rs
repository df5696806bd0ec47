use serde::Deserialize;

/// Main configuration structure for Citation-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub bulk: Option<BulkConfig>,
    #[serde(default)]
    pub stitch: Option<StitchConfig>,
}

/// Paginated crawl behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Search query sent to the primary source
    pub query: String,

    /// Items requested per page
    pub page_size: u32,

    /// Minutes between interval checkpoints
    pub save_interval_minutes: u64,

    /// Pause after each item's relation lookup and after each page (milliseconds)
    pub request_delay_ms: u64,

    /// What to do when a page cannot be fetched
    pub on_source_error: SourceErrorPolicy,

    /// Consecutive failed pages tolerated under the `skip` policy
    pub max_consecutive_page_failures: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            query: "network science".to_string(),
            page_size: 10,
            save_interval_minutes: 10,
            request_delay_ms: 1000,
            on_source_error: SourceErrorPolicy::Abort,
            max_consecutive_page_failures: 3,
        }
    }
}

/// Policy for a primary page that could not be fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceErrorPolicy {
    /// Stop the crawl (after the terminal checkpoint)
    Abort,
    /// Move on to the next page
    Skip,
}

/// Retry and transport settings shared by every fetch
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Attempts per fetch before giving up
    pub max_retries: u32,

    /// Uniform pause between attempts (milliseconds)
    pub retry_delay_ms: u64,

    /// Per-attempt request timeout (seconds)
    pub timeout_secs: u64,

    /// Per-attempt connect timeout (seconds)
    pub connect_timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_ms: 0,
            timeout_secs: 10,
            connect_timeout_secs: 5,
        }
    }
}

/// External API endpoints
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SourcesConfig {
    /// Works search endpoint of the primary source
    pub search_url: String,

    /// Citation lookup endpoint; the item key is appended as a path segment
    pub citations_url: String,

    /// Optional `filter` parameter for the search
    pub filter: Option<String>,

    /// Sort field for the search
    pub sort: String,

    /// Sort order for the search
    pub order: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            search_url: "https://api.crossref.org/works".to_string(),
            citations_url: "https://opencitations.net/index/coci/api/v1/citations".to_string(),
            filter: Some("type:journal-article".to_string()),
            sort: "relevance".to_string(),
            order: "desc".to_string(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Name of the harvester
    pub crawler_name: String,

    /// Version of the harvester
    pub crawler_version: String,

    /// URL with information about the harvester
    pub contact_url: String,

    /// Email address for API operators to reach
    pub contact_email: String,
}

/// Where snapshots go
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Snapshot sink implementation
    pub sink: SinkKind,

    /// SQLite database used by the `sqlite` sink
    pub database_path: String,

    /// Directory used by the `gexf` sink
    pub directory: String,

    /// File name prefix used by the `gexf` sink
    pub file_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            sink: SinkKind::Sqlite,
            database_path: "./citation_network.db".to_string(),
            directory: ".".to_string(),
            file_prefix: "citation_network".to_string(),
        }
    }
}

/// Available snapshot sinks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Sqlite,
    Gexf,
}

/// Bulk fetch of resources addressed by numeric id
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BulkConfig {
    /// Resource URL with an `{id}` placeholder
    pub url_template: String,

    /// First id (inclusive)
    #[serde(default)]
    pub start_id: u64,

    /// Last id (inclusive)
    #[serde(default = "default_end_id")]
    pub end_id: u64,

    /// Concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Directory receiving one file per id
    #[serde(default = "default_bulk_output_dir")]
    pub output_dir: String,

    /// Extension of the per-id files
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_end_id() -> u64 {
    100
}

fn default_workers() -> usize {
    12
}

fn default_bulk_output_dir() -> String {
    "output".to_string()
}

fn default_extension() -> String {
    "json".to_string()
}

/// Stitching of fetched records into a sequential graph
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StitchConfig {
    /// Directory of JSON files to read
    pub input_dir: String,

    /// Field holding the ordered record array
    pub records_field: String,

    /// Field of each record used as the node key
    pub key_field: String,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            input_dir: "output".to_string(),
            records_field: "data".to_string(),
            key_field: "STATION_NAME_EN_M".to_string(),
        }
    }
}
