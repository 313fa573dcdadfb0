use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::Context;
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use tokio::{runtime::Handle, sync::broadcast::Receiver, task::JoinHandle};

use crate::{
    CommitEdge, DataSinks, FetchPolicy, GitHubDataSource, OrderDirection, PullRequestState, Query,
    QueryError, QueryExecutor, QueryFailure, RepositoriesData, RepositoriesQuery,
    RepositoryCommitsData, RepositoryCommitsQuery, RepositoryDetailData, RepositoryDetailQuery,
    RepositoryOrderField, RepositorySummary, Sink, StdResult, WatchEvent,
};

const LOG_TAG: &str = "WatcherDataSource";

/// The number of repositories requested by `fetch_repositories`.
pub const REPOSITORIES_COUNT: u16 = 50;

/// A running watch: the task consuming the events of a query, and its active flag.
///
/// The flag is checked under its lock before every event is handled, so once
/// `cancel` returns no event of this watch is handled anymore.
struct Watch {
    is_active: Arc<Mutex<bool>>,
    handle: JoinHandle<()>,
}

impl Watch {
    fn cancel(self) {
        *self.is_active.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.handle.abort();
    }
}

/// A GitHub data source that watches its queries with a cache and network fetch policy.
///
/// Every fetch registers a watch that keeps publishing to the sinks until it is
/// superseded by a fetch of the same query, or until `cancel_fetching` is called.
/// Watches run on the tokio runtime the data source was created in.
pub struct WatcherDataSource {
    executor: Arc<dyn QueryExecutor>,
    sinks: DataSinks,
    watches: Mutex<HashMap<Query, Watch>>,
    runtime: Handle,
}

impl WatcherDataSource {
    /// Creates a new `WatcherDataSource` instance publishing to the given sinks,
    /// bound to the current tokio runtime.
    pub fn try_new(executor: Arc<dyn QueryExecutor>, sinks: DataSinks) -> StdResult<Self> {
        let runtime = Handle::try_current()
            .with_context(|| "WatcherDataSource must be created within a tokio runtime")?;

        Ok(Self {
            executor,
            sinks,
            watches: Mutex::new(HashMap::new()),
            runtime,
        })
    }

    /// Retrieves the number of watches still registered.
    pub fn total_active_watches(&self) -> usize {
        let watches = self.watches.lock().unwrap_or_else(PoisonError::into_inner);
        (*watches)
            .values()
            .filter(|watch| !watch.handle.is_finished())
            .count()
    }

    /// Builds the handler of the events of a watch.
    ///
    /// Responses are decoded to `T` and handed to `on_response`, failures go to the error sink.
    fn create_callback<T, F>(
        errors: Sink<QueryFailure>,
        operation: &'static str,
        on_response: F,
    ) -> impl FnMut(WatchEvent) + Send + 'static
    where
        T: DeserializeOwned + 'static,
        F: Fn(T) + Send + 'static,
    {
        move |event| match event {
            WatchEvent::Response(response) => {
                let origin = match response.is_from_cache() {
                    true => "cache",
                    false => "network",
                };
                debug!("[{LOG_TAG}] {operation} response from {origin}");
                match serde_json::from_value::<T>(response.into_data()) {
                    Ok(data) => on_response(data),
                    Err(e) => {
                        error!("[{LOG_TAG}] Failed to decode {operation} response: {e}");
                        errors.emit(QueryFailure::new(
                            operation,
                            QueryError::Parse(e.to_string()),
                        ));
                    }
                }
            }
            WatchEvent::Failure(e) => {
                warn!("[{LOG_TAG}] {operation} failed: {e}");
                errors.emit(QueryFailure::new(operation, e));
            }
            WatchEvent::Status(status) => {
                debug!("[{LOG_TAG}] Status event: {status}");
            }
        }
    }

    fn enqueue_and_watch<C>(&self, query: Query, mut callback: C)
    where
        C: FnMut(WatchEvent) + Send + 'static,
    {
        let mut events = self.executor.watch(&query, FetchPolicy::CacheAndNetwork);
        let is_active = Arc::new(Mutex::new(true));
        let handle = self.runtime.spawn({
            let is_active = is_active.clone();
            async move {
                while let Some(event) = events.recv().await {
                    let active = is_active.lock().unwrap_or_else(PoisonError::into_inner);
                    if !*active {
                        break;
                    }
                    callback(event);
                }
            }
        });

        let mut watches = self.watches.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous_watch) = (*watches).insert(query, Watch { is_active, handle }) {
            previous_watch.cancel();
        }
    }

    fn cancel_watches(&self) -> usize {
        let mut watches = self.watches.lock().unwrap_or_else(PoisonError::into_inner);
        let total_watches = (*watches).len();
        for (_, watch) in (*watches).drain() {
            watch.cancel();
        }

        total_watches
    }
}

impl GitHubDataSource for WatcherDataSource {
    fn fetch_repositories(&self) {
        let query = RepositoriesQuery::new(
            REPOSITORIES_COUNT,
            RepositoryOrderField::UpdatedAt,
            OrderDirection::Desc,
        );
        info!("[{LOG_TAG}] Fetching {query}");
        let repositories = self.sinks.repositories.clone();
        let callback = Self::create_callback(
            self.sinks.errors.clone(),
            "GithubRepositories",
            move |data: RepositoriesData| {
                repositories.emit(data.into_summaries());
            },
        );

        self.enqueue_and_watch(query.into(), callback);
    }

    fn fetch_repository_detail(&self, repository_name: &str) {
        let query = RepositoryDetailQuery::new(repository_name, vec![PullRequestState::Open]);
        info!("[{LOG_TAG}] Fetching {query}");
        let repository_detail = self.sinks.repository_detail.clone();
        let callback = Self::create_callback(
            self.sinks.errors.clone(),
            "GithubRepositoryDetail",
            move |data: RepositoryDetailData| {
                repository_detail.emit(data);
            },
        );

        self.enqueue_and_watch(query.into(), callback);
    }

    fn fetch_commits(&self, repository_name: &str) {
        let query = RepositoryCommitsQuery::new(repository_name);
        info!("[{LOG_TAG}] Fetching {query}");
        let commits = self.sinks.commits.clone();
        let callback = Self::create_callback(
            self.sinks.errors.clone(),
            "GithubRepositoryCommits",
            move |data: RepositoryCommitsData| {
                commits.emit(data.into_commit_edges());
            },
        );

        self.enqueue_and_watch(query.into(), callback);
    }

    fn cancel_fetching(&self) {
        let total_watches = self.cancel_watches();
        info!("[{LOG_TAG}] Cancelled {total_watches} watches");
    }

    fn subscribe_repositories(&self) -> Receiver<Vec<RepositorySummary>> {
        self.sinks.repositories.subscribe()
    }

    fn subscribe_repository_detail(&self) -> Receiver<RepositoryDetailData> {
        self.sinks.repository_detail.subscribe()
    }

    fn subscribe_commits(&self) -> Receiver<Vec<CommitEdge>> {
        self.sinks.commits.subscribe()
    }

    fn subscribe_errors(&self) -> Receiver<QueryFailure> {
        self.sinks.errors.subscribe()
    }
}

impl Drop for WatcherDataSource {
    fn drop(&mut self) {
        self.cancel_watches();
    }
}
