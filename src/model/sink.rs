use log::trace;
use tokio::sync::broadcast;

use super::{CommitEdge, QueryFailure, RepositoryDetailData, RepositorySummary};

/// The default number of values buffered per subscriber.
pub const DEFAULT_SINK_CAPACITY: usize = 64;

/// A multicast output channel.
///
/// Subscribers only receive values emitted after they subscribed.
#[derive(Debug, Clone)]
pub struct Sink<T> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> Sink<T> {
    /// Creates a new `Sink` buffering up to `capacity` values per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));

        Self { sender }
    }

    /// Subscribes to the values emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// Emits a value to all current subscribers and returns how many received it.
    pub fn emit(&self, value: T) -> usize {
        match self.sender.send(value) {
            Ok(total_receivers) => total_receivers,
            Err(_) => {
                trace!("Value dropped, sink has no subscriber");
                0
            }
        }
    }

    /// Retrieves the number of current subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// The output sinks of a GitHub data source.
#[derive(Debug, Clone)]
pub struct DataSinks {
    pub repositories: Sink<Vec<RepositorySummary>>,
    pub repository_detail: Sink<RepositoryDetailData>,
    pub commits: Sink<Vec<CommitEdge>>,
    pub errors: Sink<QueryFailure>,
}

impl DataSinks {
    /// Creates the sinks with the given per subscriber capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            repositories: Sink::new(capacity),
            repository_detail: Sink::new(capacity),
            commits: Sink::new(capacity),
            errors: Sink::new(capacity),
        }
    }
}

impl Default for DataSinks {
    fn default() -> Self {
        Self::new(DEFAULT_SINK_CAPACITY)
    }
}
