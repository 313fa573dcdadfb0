use crate::{NetworkResponse, Query, StdResult};

/// A trait for fetching query results from the GraphQL API.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait NetworkFetcher: Sync + Send {
    /// Fetches the query result from the API.
    async fn fetch(&self, query: &Query) -> StdResult<NetworkResponse>;
}
