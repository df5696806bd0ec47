use crate::config::types::{
    BulkConfig, Config, CrawlConfig, FetchConfig, OutputConfig, SinkKind, SourcesConfig,
    StitchConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Largest worker pool accepted for bulk fetches
pub const MAX_WORKERS: usize = 256;

/// Longest accepted checkpoint interval (one week)
pub const MAX_SAVE_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Validates the entire configuration
///
/// Called once after parsing and again after CLI overrides are applied, so
/// an invalid setting is always fatal before any request is made.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_fetch_config(&config.fetch)?;
    validate_sources_config(&config.sources)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    if let Some(bulk) = &config.bulk {
        validate_bulk_config(bulk)?;
    }
    if let Some(stitch) = &config.stitch {
        validate_stitch_config(stitch)?;
    }
    Ok(())
}

fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.query.trim().is_empty() {
        return Err(ConfigError::Validation("query cannot be empty".to_string()));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(format!(
            "page_size must be >= 1, got {}",
            config.page_size
        )));
    }

    if config.save_interval_minutes < 1 || config.save_interval_minutes > MAX_SAVE_INTERVAL_MINUTES
    {
        return Err(ConfigError::Validation(format!(
            "save_interval_minutes must be between 1 and {}, got {}",
            MAX_SAVE_INTERVAL_MINUTES, config.save_interval_minutes
        )));
    }

    if config.max_consecutive_page_failures < 1 {
        return Err(ConfigError::Validation(format!(
            "max_consecutive_page_failures must be >= 1, got {}",
            config.max_consecutive_page_failures
        )));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got timeout={}s connect={}s",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    Ok(())
}

fn validate_sources_config(config: &SourcesConfig) -> Result<(), ConfigError> {
    validate_http_url("search_url", &config.search_url)?;
    validate_http_url("citations_url", &config.citations_url)?;
    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    match config.sink {
        SinkKind::Sqlite if config.database_path.is_empty() => Err(ConfigError::Validation(
            "database_path cannot be empty for the sqlite sink".to_string(),
        )),
        SinkKind::Gexf if config.directory.is_empty() => Err(ConfigError::Validation(
            "directory cannot be empty for the gexf sink".to_string(),
        )),
        SinkKind::Gexf if config.file_prefix.contains(['/', '\\']) => {
            Err(ConfigError::Validation(format!(
                "file_prefix must not contain path separators, got '{}'",
                config.file_prefix
            )))
        }
        _ => Ok(()),
    }
}

fn validate_bulk_config(config: &BulkConfig) -> Result<(), ConfigError> {
    if !config.url_template.contains("{id}") {
        return Err(ConfigError::Validation(format!(
            "url_template must contain an {{id}} placeholder, got '{}'",
            config.url_template
        )));
    }
    validate_http_url("url_template", &config.url_template.replace("{id}", "0"))?;

    if config.start_id > config.end_id {
        return Err(ConfigError::Validation(format!(
            "start_id ({}) must be <= end_id ({})",
            config.start_id, config.end_id
        )));
    }

    if config.workers < 1 || config.workers > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and {}, got {}",
            MAX_WORKERS, config.workers
        )));
    }

    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output_dir cannot be empty".to_string(),
        ));
    }

    if config.extension.is_empty() || config.extension.contains(['/', '\\', '.']) {
        return Err(ConfigError::Validation(format!(
            "extension must be a bare file extension, got '{}'",
            config.extension
        )));
    }

    Ok(())
}

fn validate_stitch_config(config: &StitchConfig) -> Result<(), ConfigError> {
    if config.input_dir.is_empty() {
        return Err(ConfigError::Validation(
            "input_dir cannot be empty".to_string(),
        ));
    }

    if config.records_field.is_empty() || config.key_field.is_empty() {
        return Err(ConfigError::Validation(
            "records_field and key_field cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a URL parses and uses http or https
fn validate_http_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", name, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            name, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    };

    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
