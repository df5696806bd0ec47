//! OpenCitations citation index as a relation source

use crate::config::SourcesConfig;
use crate::fetch::get_json;
use crate::source::traits::RelationSource;
use crate::{ConfigError, SourceError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

/// Looks up `GET <citations-url>/<doi>` and returns the citing DOIs
#[derive(Debug, Clone)]
pub struct OpenCitationsSource {
    client: Client,
    base: Url,
}

impl OpenCitationsSource {
    pub fn new(client: Client, config: &SourcesConfig) -> Result<Self, ConfigError> {
        let base = Url::parse(&config.citations_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid citations_url: {}", e)))?;
        if base.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(format!(
                "citations_url cannot take a path: {}",
                config.citations_url
            )));
        }

        Ok(Self { client, base })
    }

    /// Builds the lookup URL for one key
    ///
    /// The DOI's `/` separators stay path separators; every other reserved
    /// character (`#`, `?`, `%`, ...) is percent-encoded into the path.
    pub fn citations_url(&self, key: &str) -> Result<Url, SourceError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| SourceError::Decode {
                url: self.base.to_string(),
                message: "base URL cannot take a path".to_string(),
            })?
            .pop_if_empty()
            .extend(key.split('/'));
        Ok(url)
    }
}

#[async_trait]
impl RelationSource for OpenCitationsSource {
    async fn citations_of(&self, key: &str) -> Result<Vec<String>, SourceError> {
        let url = self.citations_url(key)?;
        let records: Vec<CitationRecord> = get_json(&self.client, url).await?;
        Ok(records
            .into_iter()
            .filter_map(|record| citing_doi(&record.citing))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct CitationRecord {
    #[serde(default)]
    citing: String,
}

/// Extracts the DOI from a `citing` field
///
/// The index returns either a bare DOI or a space-separated identifier list
/// such as `omid:br/06101 doi:10.1/x`.
fn citing_doi(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let doi = raw
        .split_whitespace()
        .find_map(|token| token.strip_prefix("doi:"))
        .unwrap_or(raw);

    if doi.is_empty() || (doi.contains(':') && !doi.starts_with("10.")) {
        None
    } else {
        Some(doi.to_string())
    }
}
