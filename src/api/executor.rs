use crate::api::client::ApiClient;
use crate::api::model::{DecodeError, FetchOutcome, FetchReport};
use crate::config::FetchSettings;
use crate::error::AppResult;
use crate::logging::{log_exhausted, log_retry};
use crate::model::common::FetchTarget;
use crate::utils;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        utils::backoff_delay(self.base_delay, attempt)
    }
}

/// Runs fetches under a shared concurrency cap with bounded retries.
///
/// Clones share the same limiter, so every clone handed to a worker task
/// counts against one global in-flight budget. A slot is held only for
/// the network call itself and is released before any backoff sleep.
#[derive(Clone)]
pub struct FetchExecutor {
    client: ApiClient,
    limiter: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl FetchExecutor {
    pub fn new(settings: &FetchSettings) -> AppResult<Self> {
        Ok(Self::with_client(
            ApiClient::new(settings)?,
            Arc::new(Semaphore::new(settings.max_concurrent.max(1))),
            RetryPolicy {
                max_retries: settings.max_retries,
                base_delay: settings.base_delay,
            },
        ))
    }

    pub fn with_client(client: ApiClient, limiter: Arc<Semaphore>, policy: RetryPolicy) -> Self {
        FetchExecutor {
            client,
            limiter,
            policy,
        }
    }

    pub fn limiter(&self) -> &Arc<Semaphore> {
        &self.limiter
    }

    /// Fetches `target` until a terminal outcome or the retry budget runs out.
    ///
    /// Makes at most `max_retries + 1` attempts. Attempt `n` (from zero)
    /// that ends transient is followed by a `base_delay * 2^n` sleep. When
    /// the budget is spent the last transient outcome is returned as is.
    pub async fn execute<T, D>(&self, target: &FetchTarget, decode: D) -> FetchReport<T>
    where
        D: Fn(&FetchTarget, Bytes) -> Result<T, DecodeError>,
    {
        let mut delays = Vec::new();
        let mut attempt: u32 = 0;

        loop {
            let outcome = self
                .attempt(target)
                .await
                .and_then_decode(|body| decode(target, body));

            if !outcome.is_transient() {
                return FetchReport {
                    target: target.clone(),
                    outcome,
                    attempts: attempt + 1,
                    delays,
                };
            }

            if attempt >= self.policy.max_retries {
                log_exhausted(target.as_str(), attempt + 1, &outcome.reason());
                return FetchReport {
                    target: target.clone(),
                    outcome,
                    attempts: attempt + 1,
                    delays,
                };
            }

            let delay = self.policy.delay_for(attempt);
            log_retry(
                target.as_str(),
                attempt,
                self.policy.max_retries,
                delay,
                &outcome.reason(),
            );
            delays.push(delay);
            sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, target: &FetchTarget) -> FetchOutcome<Bytes> {
        let _permit = match utils::acquire_semaphore(&self.limiter, target.as_str()).await {
            Ok(permit) => permit,
            Err(e) => return FetchOutcome::TransportError(e.to_string()),
        };
        self.client.get(target.as_str()).await
    }
}
