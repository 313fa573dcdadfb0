use std::{sync::Arc, time::Duration};

use log::warn;
use tokio::time::sleep;

use crate::{NetworkFetcher, NetworkResponse, Query, StdResult};

/// A struct that retries a NetworkFetcher a specified number of times in case of failure with exponential backoff strategy.
pub struct FetcherRetrier {
    /// The fetcher to be retried.
    fetcher: Arc<dyn NetworkFetcher>,

    /// The maximum number of attempts for a query.
    max_retries: u32,

    /// The base delay for exponential backoff.
    base_delay: Duration,
}

impl FetcherRetrier {
    /// Creates a new `FetcherRetrier` instance with the given maximum number of retries.
    pub fn new(fetcher: Arc<dyn NetworkFetcher>, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            fetcher,
            max_retries: max_retries.max(1),
            base_delay,
        }
    }

    fn calculate_exponential_backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay * (2u32.pow(attempt.min(31)))
    }
}

#[async_trait::async_trait]
impl NetworkFetcher for FetcherRetrier {
    /// Retries the query if it fails, up to the maximum number of retries.
    async fn fetch(&self, query: &Query) -> StdResult<NetworkResponse> {
        let mut attempts = 0;

        loop {
            match self.fetcher.fetch(query).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!(
                        "Fetch attempt #{} of {} failed: {}",
                        attempts + 1,
                        query.operation_name(),
                        e
                    );
                    attempts += 1;
                    if attempts >= self.max_retries {
                        return Err(e.context(format!("Failed after {} attempts", attempts)));
                    }
                    sleep(self.calculate_exponential_backoff_delay(attempts)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use serde_json::json;

    use crate::{MockNetworkFetcher, QueryError, RepositoryCommitsQuery};

    use super::*;

    fn dummy_query() -> Query {
        Query::from(RepositoryCommitsQuery::new("octokit"))
    }

    #[tokio::test]
    async fn fetch_success_on_first_attempt() {
        let fetcher = {
            let mut fetcher = MockNetworkFetcher::new();
            fetcher
                .expect_fetch()
                .returning(|_| Ok(NetworkResponse::new(json!({}), None)))
                .times(1);

            fetcher
        };
        let retrier = FetcherRetrier::new(Arc::new(fetcher), 3, Duration::from_millis(10));

        retrier.fetch(&dummy_query()).await.unwrap();
    }

    #[tokio::test]
    async fn fetch_success_after_retries() {
        let fetcher = {
            let mut fetcher = MockNetworkFetcher::new();
            fetcher
                .expect_fetch()
                .returning(|_| Err(anyhow!("Error fetching data")))
                .times(2);
            fetcher
                .expect_fetch()
                .returning(|_| Ok(NetworkResponse::new(json!({ "viewer": null }), None)))
                .times(1);

            fetcher
        };
        let retrier = FetcherRetrier::new(Arc::new(fetcher), 3, Duration::from_millis(10));

        let response = retrier.fetch(&dummy_query()).await.unwrap();

        assert_eq!(&json!({ "viewer": null }), response.data());
    }

    #[tokio::test]
    async fn fetch_failure_after_max_retries() {
        let fetcher = {
            let mut fetcher = MockNetworkFetcher::new();
            fetcher
                .expect_fetch()
                .returning(|_| Err(QueryError::Parse("Failed to parse response".to_string()).into()))
                .times(3);

            fetcher
        };
        let retrier = FetcherRetrier::new(Arc::new(fetcher), 3, Duration::from_millis(10));

        let error = retrier
            .fetch(&dummy_query())
            .await
            .expect_err("Expected failure after max retries");

        assert!(matches!(QueryError::from(error), QueryError::Parse(_)));
    }

    #[test]
    fn exponential_backoff_delay() {
        let retrier = FetcherRetrier::new(
            Arc::new(MockNetworkFetcher::new()),
            3,
            Duration::from_millis(10),
        );

        assert_eq!(
            Duration::from_millis(20),
            retrier.calculate_exponential_backoff_delay(1)
        );
        assert_eq!(
            Duration::from_millis(40),
            retrier.calculate_exponential_backoff_delay(2)
        );
    }
}
