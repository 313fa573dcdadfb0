use tokio::sync::mpsc::UnboundedReceiver;

use crate::{FetchPolicy, Query, WatchEvent};

/// A trait for executing and watching GraphQL queries.
#[cfg_attr(test, mockall::automock)]
pub trait QueryExecutor: Sync + Send {
    /// Starts watching a query with the given fetch policy.
    ///
    /// The watch keeps emitting events until the returned receiver is dropped.
    fn watch(&self, query: &Query, fetch_policy: FetchPolicy) -> UnboundedReceiver<WatchEvent>;
}
