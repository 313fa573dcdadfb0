use std::fmt::Display;

use serde_json::Value;

use super::{FetcherRateLimit, QueryError};

/// A response received from the GraphQL endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkResponse {
    /// The raw `data` section of the response
    pub(crate) data: Value,

    /// The API rate limit information, when the query requested it
    pub(crate) rate_limit: Option<FetcherRateLimit>,
}

impl NetworkResponse {
    /// Creates a new `NetworkResponse` instance.
    pub fn new(data: Value, rate_limit: Option<FetcherRateLimit>) -> Self {
        Self { data, rate_limit }
    }

    /// Retrieves the raw data.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Retrieves the API rate limit information.
    pub fn rate_limit(&self) -> Option<&FetcherRateLimit> {
        self.rate_limit.as_ref()
    }
}

/// A query response delivered to a watcher.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResponse {
    /// The raw `data` section of the response
    pub(crate) data: Value,

    /// Whether the data was read from the cache
    pub(crate) from_cache: bool,
}

impl QueryResponse {
    /// Creates a new `QueryResponse` instance.
    pub fn new(data: Value, from_cache: bool) -> Self {
        Self { data, from_cache }
    }

    /// Retrieves the raw data.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Consumes the response and returns the raw data.
    pub fn into_data(self) -> Value {
        self.data
    }

    /// Whether the data was read from the cache.
    pub fn is_from_cache(&self) -> bool {
        self.from_cache
    }
}

/// The progress of a watched query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Scheduled,
    FetchCache,
    FetchNetwork,
    Completed,
}

impl Display for StatusEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusEvent::Scheduled => write!(f, "SCHEDULED"),
            StatusEvent::FetchCache => write!(f, "FETCH_CACHE"),
            StatusEvent::FetchNetwork => write!(f, "FETCH_NETWORK"),
            StatusEvent::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// An event emitted by a query watch.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// A response, from the cache or the network.
    Response(QueryResponse),

    /// The query failed.
    Failure(QueryError),

    /// A progress notification.
    Status(StatusEvent),
}
