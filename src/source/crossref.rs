//! Crossref works search as a paginated source

use crate::config::SourcesConfig;
use crate::fetch::get_json;
use crate::graph::Item;
use crate::source::traits::PaginatedSource;
use crate::{ConfigError, SourceError};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

/// Pages through `GET /works?query=…&rows=…&offset=…`
#[derive(Debug, Clone)]
pub struct CrossrefSource {
    client: Client,
    search_url: Url,
    filter: Option<String>,
    sort: String,
    order: String,
}

impl CrossrefSource {
    pub fn new(client: Client, config: &SourcesConfig) -> Result<Self, ConfigError> {
        let search_url = Url::parse(&config.search_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search_url: {}", e)))?;

        Ok(Self {
            client,
            search_url,
            filter: config.filter.clone(),
            sort: config.sort.clone(),
            order: config.order.clone(),
        })
    }

    /// Builds the request URL for one page
    pub fn page_url(&self, query: &str, offset: u64, page_size: u32) -> Url {
        let mut url = self.search_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("query", query)
                .append_pair("rows", &page_size.to_string())
                .append_pair("offset", &offset.to_string());
            if let Some(filter) = &self.filter {
                pairs.append_pair("filter", filter);
            }
            pairs
                .append_pair("sort", &self.sort)
                .append_pair("order", &self.order);
        }
        url
    }
}

#[async_trait]
impl PaginatedSource for CrossrefSource {
    async fn next_page(
        &self,
        query: &str,
        offset: u64,
        page_size: u32,
    ) -> Result<Vec<Item>, SourceError> {
        let url = self.page_url(query, offset, page_size);
        tracing::debug!("Fetching works page: {}", url);

        let response: WorksResponse = get_json(&self.client, url).await?;
        let items: Vec<Item> = response
            .message
            .items
            .into_iter()
            .map(WorkRecord::into_item)
            .collect();

        let keyless = items.iter().filter(|item| item.key.is_empty()).count();
        if keyless > 0 {
            tracing::debug!("{} works without a DOI at offset {}", keyless, offset);
        }

        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    message: WorksMessage,
}

#[derive(Debug, Default, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<WorkRecord>,
}

#[derive(Debug, Deserialize)]
struct WorkRecord {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<AuthorRecord>,
}

#[derive(Debug, Deserialize)]
struct AuthorRecord {
    #[serde(default)]
    given: String,
    #[serde(default)]
    family: String,
    name: Option<String>,
}

impl WorkRecord {
    /// A work without a DOI keeps its place on the page with an empty key
    fn into_item(self) -> Item {
        let key = self.doi.as_deref().map(str::trim).unwrap_or_default().to_string();
        let title = self.title.into_iter().find(|t| !t.trim().is_empty());
        let contributors = self
            .author
            .into_iter()
            .filter_map(AuthorRecord::display_name)
            .collect();
        Item::new(key, title, contributors)
    }
}

impl AuthorRecord {
    /// "Given Family", falling back to the organisation name
    fn display_name(self) -> Option<String> {
        let joined = format!("{} {}", self.given, self.family).trim().to_string();
        if !joined.is_empty() {
            return Some(joined);
        }
        self.name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
    }
}
