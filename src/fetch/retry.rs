//! Bounded retry for a single fetch
//!
//! A fetch is attempted up to `max_retries` times. Every failed attempt is
//! reported to the observer; the loop ends either with the value or with
//! `FetchExhausted` carrying the last failure. Nothing else ends it.

use crate::config::FetchConfig;
use crate::events::{HarvestEvent, SharedObserver};
use crate::SourceError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// How many attempts a fetch gets and how long to pause between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_retries: u32,

    /// Uniform pause between attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.max_retries, Duration::from_millis(config.retry_delay_ms))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

/// A fetch failed on every permitted attempt
#[derive(Debug, Error)]
#[error("Fetch of {target} exhausted after {attempts} attempts: {source}")]
pub struct FetchExhausted {
    pub target: String,
    pub attempts: u32,
    #[source]
    pub source: SourceError,
}

/// A successful fetch and the number of attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    pub value: T,
    pub attempts: u32,
}

/// Runs fetch operations under a `RetryPolicy`
#[derive(Clone)]
pub struct RetryableFetcher {
    policy: RetryPolicy,
    observer: Option<SharedObserver>,
}

impl RetryableFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            observer: None,
        }
    }

    /// Reports every failed attempt to `observer`
    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs `operation` until it succeeds or the attempts run out
    ///
    /// # Arguments
    ///
    /// * `target` - Human-readable name of what is fetched, used in events
    /// * `operation` - Produces one attempt's future each time it is called
    ///
    /// # Returns
    ///
    /// * `Ok(Fetched)` - The value and how many attempts it took
    /// * `Err(FetchExhausted)` - Every attempt failed; carries the last error
    pub async fn fetch<T, F, Fut>(
        &self,
        target: &str,
        mut operation: F,
    ) -> Result<Fetched<T>, FetchExhausted>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let max_attempts = self.policy.max_retries.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => {
                    return Ok(Fetched {
                        value,
                        attempts: attempt,
                    })
                }
                Err(error) => {
                    self.emit(HarvestEvent::FetchAttemptFailed {
                        target: target.to_string(),
                        attempt,
                        max_attempts,
                        error: error.to_string(),
                    });

                    if attempt >= max_attempts {
                        return Err(FetchExhausted {
                            target: target.to_string(),
                            attempts: attempt,
                            source: error,
                        });
                    }

                    if !self.policy.delay.is_zero() {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }
    }

    fn emit(&self, event: HarvestEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&event);
        }
    }
}
