//! Boundaries to the external data sources
//!
//! The crawl engine only sees these traits. HTTP implementations live next to
//! them; tests substitute in-memory ones.

use crate::fetch::TaskId;
use crate::graph::Item;
use crate::SourceError;
use async_trait::async_trait;

/// Paginated search over primary items
#[async_trait]
pub trait PaginatedSource: Send + Sync {
    /// Fetches the page starting at `offset`
    ///
    /// An empty page means the stream is finished. Records without a key
    /// are still returned, with an empty `key`, so a page of them is not
    /// mistaken for the end. Failures are returned as is; this layer never
    /// retries.
    async fn next_page(
        &self,
        query: &str,
        offset: u64,
        page_size: u32,
    ) -> Result<Vec<Item>, SourceError>;
}

/// Keyed lookup of the items that cite a given item
#[async_trait]
pub trait RelationSource: Send + Sync {
    /// Returns the keys of items citing `key`; an empty list is a valid answer
    async fn citations_of(&self, key: &str) -> Result<Vec<String>, SourceError>;
}

/// Raw resources addressed by id, used by the bulk pool
#[async_trait]
pub trait ResourceSource: Send + Sync {
    async fn fetch_resource(&self, id: &TaskId) -> Result<Vec<u8>, SourceError>;

    /// Name used for the resource in events and errors
    fn describe(&self, id: &TaskId) -> String {
        format!("resource {}", id)
    }
}
