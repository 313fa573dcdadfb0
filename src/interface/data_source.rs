use tokio::sync::broadcast::Receiver;

use crate::{CommitEdge, QueryFailure, RepositoryDetailData, RepositorySummary};

/// A trait for fetching GitHub data and publishing it to subscribers.
///
/// Fetch operations return immediately, results are published later.
pub trait GitHubDataSource: Sync + Send {
    /// Fetches the repositories of the authenticated user.
    fn fetch_repositories(&self);

    /// Fetches the detail of a repository.
    fn fetch_repository_detail(&self, repository_name: &str);

    /// Fetches the commits of the default branch of a repository.
    fn fetch_commits(&self, repository_name: &str);

    /// Stops every fetch started by this data source.
    fn cancel_fetching(&self);

    /// Subscribes to the repositories.
    fn subscribe_repositories(&self) -> Receiver<Vec<RepositorySummary>>;

    /// Subscribes to the repository details.
    fn subscribe_repository_detail(&self) -> Receiver<RepositoryDetailData>;

    /// Subscribes to the commits.
    fn subscribe_commits(&self) -> Receiver<Vec<CommitEdge>>;

    /// Subscribes to the query failures.
    fn subscribe_errors(&self) -> Receiver<QueryFailure>;
}
