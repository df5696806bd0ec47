//! Per-item relation lookup with bounded retry

use crate::events::{HarvestEvent, SharedObserver};
use crate::fetch::{FetchExhausted, RetryableFetcher};
use crate::source::traits::RelationSource;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

/// Relations for an item could not be fetched within the retry budget
#[derive(Debug, Error)]
#[error("Relations unavailable for {key}")]
pub struct RelationUnavailable {
    pub key: String,
    #[source]
    pub cause: FetchExhausted,
}

impl RelationUnavailable {
    pub fn attempts(&self) -> u32 {
        self.cause.attempts
    }
}

/// Resolves the keys citing an item, one retried fetch per item
pub struct DependentRelationResolver {
    source: Arc<dyn RelationSource>,
    fetcher: RetryableFetcher,
    observer: SharedObserver,
}

impl DependentRelationResolver {
    pub fn new(
        source: Arc<dyn RelationSource>,
        fetcher: RetryableFetcher,
        observer: SharedObserver,
    ) -> Self {
        Self {
            source,
            fetcher,
            observer,
        }
    }

    /// Fetches the citing keys of `key`
    ///
    /// Blank keys and self-citations are dropped. An empty set is a valid
    /// answer and is returned as `Ok`.
    pub async fn try_resolve(&self, key: &str) -> Result<BTreeSet<String>, RelationUnavailable> {
        let target = format!("citations of {}", key);
        let source = &self.source;

        let fetched = self
            .fetcher
            .fetch(&target, || source.citations_of(key))
            .await
            .map_err(|cause| RelationUnavailable {
                key: key.to_string(),
                cause,
            })?;

        Ok(fetched
            .value
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty() && k != key)
            .collect())
    }

    /// Like `try_resolve`, but reports the outcome as an event
    ///
    /// Exhaustion is reported as `RelationUnavailable` and yields `None`; the
    /// item contributes no edges this time and may be resolved again later.
    pub async fn resolve(&self, key: &str) -> Option<BTreeSet<String>> {
        match self.try_resolve(key).await {
            Ok(keys) => {
                self.observer.on_event(&HarvestEvent::RelationsResolved {
                    key: key.to_string(),
                    count: keys.len(),
                });
                Some(keys)
            }
            Err(unavailable) => {
                self.observer.on_event(&HarvestEvent::RelationUnavailable {
                    key: unavailable.key.clone(),
                    attempts: unavailable.attempts(),
                    error: unavailable.cause.source.to_string(),
                });
                None
            }
        }
    }
}
