use std::sync::Arc;

use chrono::Utc;
use log::warn;
use tokio::time::sleep;

use crate::{NetworkFetcher, NetworkResponse, Query, StdResult};

/// This struct is responsible for enforcing rate limits on fetcher requests.
pub struct FetcherRateLimitEnforcer {
    /// The fetcher to be rate limited.
    fetcher: Arc<dyn NetworkFetcher>,
}

impl FetcherRateLimitEnforcer {
    /// Creates a new `FetcherRateLimitEnforcer` instance with the given fetcher.
    pub fn new(fetcher: Arc<dyn NetworkFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait::async_trait]
impl NetworkFetcher for FetcherRateLimitEnforcer {
    /// Enforce the rate limit on the fetcher requests.
    async fn fetch(&self, query: &Query) -> StdResult<NetworkResponse> {
        let response = self.fetcher.fetch(query).await?;
        if let Some(rate_limit) = response.rate_limit() {
            if rate_limit.is_exceeded() {
                let duration_until_reset = rate_limit.duration_until_reset(Utc::now())?;
                warn!(
                    "Fetcher rate limit exceeded for {}, waiting for {duration_until_reset:?}",
                    query.operation_name()
                );
                sleep(duration_until_reset).await;
            }
        }

        Ok(response)
    }
}
