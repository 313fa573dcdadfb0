use thiserror::Error;

/// The standard result type used throughout the application.
pub type StdResult<T> = Result<T, anyhow::Error>;

/// Query error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Parse error
    #[error("Parsing error: {0}")]
    Parse(String),
    /// Remote error
    #[error("Remote error: {0}")]
    Remote(String),
    /// No cached value for a cache only query
    #[error("No cached data for query {0}")]
    CacheMiss(String),
}

impl From<anyhow::Error> for QueryError {
    fn from(error: anyhow::Error) -> Self {
        let message = format!("{error:#}");
        match error.downcast_ref::<QueryError>() {
            Some(QueryError::Parse(_)) => QueryError::Parse(message),
            Some(QueryError::CacheMiss(_)) => QueryError::CacheMiss(message),
            _ => QueryError::Remote(message),
        }
    }
}

/// A failed query, as published to the error sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Query {operation} failed: {source}")]
pub struct QueryFailure {
    /// The name of the GraphQL operation that failed.
    pub operation: &'static str,

    /// The underlying failure reason.
    #[source]
    pub source: QueryError,
}

impl QueryFailure {
    /// Creates a new `QueryFailure` for the given operation.
    pub fn new(operation: &'static str, source: QueryError) -> Self {
        Self { operation, source }
    }
}
