use std::sync::Arc;

use anyhow::Context;
use log::{debug, info};
use serde_json::Value;
use tokio::{
    runtime::Handle,
    sync::{
        broadcast::{self, error::RecvError},
        mpsc::{self, UnboundedReceiver, UnboundedSender},
    },
};

use crate::{
    FetchPolicy, MemoryResponseCache, NetworkFetcher, Query, QueryError, QueryExecutor,
    QueryResponse, StatusEvent, StdResult, WatchEvent,
};

/// A query executor that resolves queries against a response cache and the network,
/// then keeps watching the cache for changes.
///
/// Watches run on the tokio runtime the executor was created in, whatever thread
/// `watch` is called from.
pub struct WatchingQueryExecutor {
    fetcher: Arc<dyn NetworkFetcher>,
    cache: Arc<MemoryResponseCache>,
    runtime: Handle,
}

impl WatchingQueryExecutor {
    /// Creates a new `WatchingQueryExecutor` instance bound to the current tokio runtime.
    pub fn try_new(
        fetcher: Arc<dyn NetworkFetcher>,
        cache: Arc<MemoryResponseCache>,
    ) -> StdResult<Self> {
        let runtime = Handle::try_current()
            .with_context(|| "WatchingQueryExecutor must be created within a tokio runtime")?;

        Ok(Self {
            fetcher,
            cache,
            runtime,
        })
    }
}

impl QueryExecutor for WatchingQueryExecutor {
    fn watch(&self, query: &Query, fetch_policy: FetchPolicy) -> UnboundedReceiver<WatchEvent> {
        info!("Watching {} with {fetch_policy} policy", query.operation_name());
        let (watch, receiver) = QueryWatch::new(
            self.fetcher.clone(),
            self.cache.clone(),
            query.to_owned(),
            fetch_policy,
        );
        self.runtime.spawn(watch.run());

        receiver
    }
}

/// Outcome of a cache read.
enum CacheRead {
    Hit(Value),
    Miss,
    Closed,
}

/// A single watched query.
///
/// Every emit returns `false` once the receiver is gone, which ends the watch.
/// Awaits on the cache or the network also end as soon as the receiver is gone.
struct QueryWatch {
    fetcher: Arc<dyn NetworkFetcher>,
    cache: Arc<MemoryResponseCache>,
    changes: broadcast::Receiver<Query>,
    query: Query,
    fetch_policy: FetchPolicy,
    events: UnboundedSender<WatchEvent>,
    last_emitted: Option<Value>,
}

impl QueryWatch {
    fn new(
        fetcher: Arc<dyn NetworkFetcher>,
        cache: Arc<MemoryResponseCache>,
        query: Query,
        fetch_policy: FetchPolicy,
    ) -> (Self, UnboundedReceiver<WatchEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let watch = Self {
            fetcher,
            changes: cache.subscribe_changes(),
            cache,
            query,
            fetch_policy,
            events,
            last_emitted: None,
        };

        (watch, receiver)
    }

    async fn run(mut self) {
        if self.emit(WatchEvent::Status(StatusEvent::Scheduled))
            && self.resolve().await
            && self.emit(WatchEvent::Status(StatusEvent::Completed))
        {
            self.watch_changes().await;
        }
        debug!("Stopped watching {}", self.query.operation_name());
    }

    fn emit(&self, event: WatchEvent) -> bool {
        self.events.send(event).is_ok()
    }

    fn emit_data(&mut self, data: Value, from_cache: bool) -> bool {
        self.last_emitted = Some(data.clone());
        self.emit(WatchEvent::Response(QueryResponse::new(data, from_cache)))
    }

    async fn resolve(&mut self) -> bool {
        match self.fetch_policy {
            FetchPolicy::CacheOnly => match self.read_cache().await {
                CacheRead::Hit(data) => self.emit_data(data, true),
                CacheRead::Miss => self.emit(WatchEvent::Failure(QueryError::CacheMiss(
                    self.query.to_string(),
                ))),
                CacheRead::Closed => false,
            },
            FetchPolicy::NetworkOnly => self.fetch_network().await,
            FetchPolicy::CacheFirst => match self.read_cache().await {
                CacheRead::Hit(data) => self.emit_data(data, true),
                CacheRead::Miss => self.fetch_network().await,
                CacheRead::Closed => false,
            },
            FetchPolicy::CacheAndNetwork => match self.read_cache().await {
                CacheRead::Hit(data) => self.emit_data(data, true) && self.fetch_network().await,
                CacheRead::Miss => self.fetch_network().await,
                CacheRead::Closed => false,
            },
        }
    }

    async fn read_cache(&self) -> CacheRead {
        if !self.emit(WatchEvent::Status(StatusEvent::FetchCache)) {
            return CacheRead::Closed;
        }
        tokio::select! {
            biased;
            _ = self.events.closed() => CacheRead::Closed,
            data = self.cache.get(&self.query) => match data {
                Some(data) => CacheRead::Hit(data),
                None => CacheRead::Miss,
            },
        }
    }

    async fn fetch_network(&mut self) -> bool {
        if !self.emit(WatchEvent::Status(StatusEvent::FetchNetwork)) {
            return false;
        }
        let result = tokio::select! {
            biased;
            _ = self.events.closed() => return false,
            result = self.fetcher.fetch(&self.query) => result,
        };
        match result {
            Ok(response) => {
                let data = response.data;
                self.cache.put(self.query.clone(), data.clone()).await;
                self.emit_data(data, false)
            }
            Err(e) => self.emit(WatchEvent::Failure(QueryError::from(e))),
        }
    }

    async fn watch_changes(&mut self) {
        loop {
            let change = tokio::select! {
                _ = self.events.closed() => return,
                change = self.changes.recv() => change,
            };
            let keep_watching = match change {
                Ok(query) if query == self.query => self.emit_cached_change().await,
                Ok(_) => true,
                Err(RecvError::Lagged(_)) => self.emit_cached_change().await,
                Err(RecvError::Closed) => false,
            };
            if !keep_watching {
                return;
            }
        }
    }

    async fn emit_cached_change(&mut self) -> bool {
        match self.cache.get(&self.query).await {
            Some(data) if self.last_emitted.as_ref() != Some(&data) => self.emit_data(data, true),
            _ => true,
        }
    }
}
