//! HTTP resources addressed by an id substituted into a URL template

use crate::fetch::{get_bytes, TaskId};
use crate::source::traits::ResourceSource;
use crate::SourceError;
use async_trait::async_trait;
use reqwest::{Client, Url};

/// Fetches `url_template` with `{id}` replaced by the task id
#[derive(Debug, Clone)]
pub struct HttpResourceSource {
    client: Client,
    url_template: String,
}

impl HttpResourceSource {
    pub fn new(client: Client, url_template: impl Into<String>) -> Self {
        Self {
            client,
            url_template: url_template.into(),
        }
    }

    pub fn url_for(&self, id: &TaskId) -> String {
        self.url_template.replace("{id}", id.as_str())
    }
}

#[async_trait]
impl ResourceSource for HttpResourceSource {
    async fn fetch_resource(&self, id: &TaskId) -> Result<Vec<u8>, SourceError> {
        let raw = self.url_for(id);
        let url = Url::parse(&raw).map_err(|e| SourceError::Decode {
            url: raw.clone(),
            message: e.to_string(),
        })?;
        get_bytes(&self.client, url).await
    }

    fn describe(&self, id: &TaskId) -> String {
        self.url_for(id)
    }
}
