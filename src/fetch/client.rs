//! HTTP client construction and single-request helpers
//!
//! This module handles:
//! - Building the shared HTTP client with a polite user agent string
//! - Per-attempt request and connect timeouts
//! - Mapping transport outcomes onto `SourceError`

use crate::config::{FetchConfig, UserAgentConfig};
use crate::SourceError;
use reqwest::{Client, Url};
use std::time::Duration;

/// Formats the user agent sent with every request
///
/// Format: `Name/Version (+ContactURL; mailto:ContactEmail)`. Bibliographic
/// APIs route clients that leave a contact address to their polite pools.
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; mailto:{})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `fetch` - Timeout settings; each attempt gets its own timeout
///
/// # Example
///
/// ```no_run
/// use citation_harvest::config::{FetchConfig, UserAgentConfig};
/// use citation_harvest::fetch::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "CitationHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, &FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    fetch: &FetchConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(user_agent))
        .timeout(Duration::from_secs(fetch.timeout_secs))
        .connect_timeout(Duration::from_secs(fetch.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends a GET request and returns the body of a 2xx response
///
/// Any transport error or non-success status is a `SourceError`; the body of
/// a failed response is discarded.
pub async fn get_bytes(client: &Client, url: Url) -> Result<Vec<u8>, SourceError> {
    let url_str = url.to_string();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| SourceError::Http {
            url: url_str.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Status {
            url: url_str,
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|source| SourceError::Http {
        url: url_str,
        source,
    })?;
    Ok(body.to_vec())
}

/// Sends a GET request and decodes a 2xx JSON body
pub async fn get_json<T: serde::de::DeserializeOwned>(
    client: &Client,
    url: Url,
) -> Result<T, SourceError> {
    let url_str = url.to_string();
    let body = get_bytes(client, url).await?;
    serde_json::from_slice(&body).map_err(|e| SourceError::Decode {
        url: url_str,
        message: e.to_string(),
    })
}
