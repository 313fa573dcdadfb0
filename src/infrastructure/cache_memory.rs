use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::{RwLock, broadcast};

use crate::Query;

const CHANGES_CHANNEL_CAPACITY: usize = 256;

/// An in-memory cache of query results, keyed by query descriptor.
#[derive(Debug)]
pub struct MemoryResponseCache {
    /// The cached `data` sections
    entries: RwLock<HashMap<Query, Value>>,

    /// Notifies the queries whose cached entry changed
    changes: broadcast::Sender<Query>,
}

impl MemoryResponseCache {
    /// Creates a new empty `MemoryResponseCache`.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGES_CHANNEL_CAPACITY);

        Self {
            entries: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Retrieves the cached data of a query.
    pub async fn get(&self, query: &Query) -> Option<Value> {
        let entries = self.entries.read().await;
        (*entries).get(query).cloned()
    }

    /// Stores the data of a query and notifies watchers if the entry changed.
    pub async fn put(&self, query: Query, data: Value) -> bool {
        let changed = {
            let mut entries = self.entries.write().await;
            match (*entries).get(&query) {
                Some(cached) if *cached == data => false,
                _ => {
                    (*entries).insert(query.clone(), data);
                    true
                }
            }
        };
        if changed {
            let _ = self.changes.send(query);
        }

        changed
    }

    /// Removes the cached data of a query.
    pub async fn remove(&self, query: &Query) -> Option<Value> {
        let mut entries = self.entries.write().await;
        (*entries).remove(query)
    }

    /// Removes all cached data.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        (*entries).clear();
    }

    /// Retrieves the number of cached queries.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        (*entries).len()
    }

    /// Whether no query is cached.
    pub async fn is_empty(&self) -> bool {
        let entries = self.entries.read().await;
        (*entries).is_empty()
    }

    /// Subscribes to the queries whose cached entry changes from now on.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<Query> {
        self.changes.subscribe()
    }
}

impl Default for MemoryResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
