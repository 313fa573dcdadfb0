use std::{fmt::Display, ops::Deref, time::Duration};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::StdResult;

/// The name of a repository.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RepositoryName(pub String);

impl Deref for RepositoryName {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for RepositoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Summary of a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySummary {
    /// The GraphQL node id of the repository.
    id: String,

    /// The name of the repository.
    name: RepositoryName,

    /// The description of the repository.
    description: Option<String>,
}

impl RepositorySummary {
    /// Creates a new `RepositorySummary` instance.
    pub fn new(id: &str, name: &str, description: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: RepositoryName(name.to_string()),
            description: description.map(str::to_string),
        }
    }

    /// Retrieves the repository id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Retrieves the repository name.
    pub fn name(&self) -> &RepositoryName {
        &self.name
    }

    /// Retrieves the repository description.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl Display for RepositorySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Repository: {}, Description: {}",
            self.name,
            self.description.as_deref().unwrap_or("-")
        )
    }
}

/// Data of the `GithubRepositories` query.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RepositoriesData {
    pub viewer: Option<RepositoriesViewer>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RepositoriesViewer {
    pub repositories: Option<RepositoryConnection>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RepositoryConnection {
    pub nodes: Option<Vec<Option<RepositoryNode>>>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RepositoryNode {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

impl From<RepositoryNode> for RepositorySummary {
    fn from(node: RepositoryNode) -> Self {
        Self {
            id: node.id,
            name: RepositoryName(node.name),
            description: node.description,
        }
    }
}

impl RepositoriesData {
    /// Maps each non-null repository node to a summary.
    pub fn into_summaries(self) -> Vec<RepositorySummary> {
        self.viewer
            .and_then(|viewer| viewer.repositories)
            .and_then(|repositories| repositories.nodes)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(RepositorySummary::from)
            .collect()
    }
}

/// Data of the `GithubRepositoryDetail` query.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RepositoryDetailData {
    pub viewer: Option<RepositoryDetailViewer>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RepositoryDetailViewer {
    pub repository: Option<RepositoryDetail>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDetail {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub pull_requests: PullRequestConnection,
    pub releases: ReleaseConnection,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestConnection {
    pub total_count: u32,
    #[serde(default)]
    pub nodes: Vec<Option<PullRequest>>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PullRequest {
    pub id: String,
    pub title: String,
    pub url: String,
    pub author: Option<Actor>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Actor {
    pub login: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseConnection {
    pub total_count: u32,
    #[serde(default)]
    pub nodes: Vec<Option<Release>>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: String,
    pub name: Option<String>,
    pub url: String,
    pub published_at: Option<String>,
}

impl RepositoryDetailData {
    /// Retrieves the repository, if the viewer owns one with the requested name.
    pub fn repository(&self) -> Option<&RepositoryDetail> {
        self.viewer
            .as_ref()
            .and_then(|viewer| viewer.repository.as_ref())
    }
}

impl Display for RepositoryDetailData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.repository() {
            Some(repository) => write!(
                f,
                "Repository: {}, Url: {}, Open pull requests: {}, Releases: {}",
                repository.name,
                repository.url,
                repository.pull_requests.total_count,
                repository.releases.total_count
            ),
            None => write!(f, "Repository: not found"),
        }
    }
}

/// Data of the `GithubRepositoryCommits` query.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RepositoryCommitsData {
    pub viewer: Option<CommitsViewer>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CommitsViewer {
    pub repository: Option<CommitsRepository>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommitsRepository {
    pub default_branch_ref: Option<Ref>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Ref {
    pub target: Option<RefTarget>,
}

/// The object a git reference points to.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "__typename")]
pub enum RefTarget {
    Commit(CommitTarget),
    Tree,
    Blob,
    Tag,
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CommitTarget {
    pub history: Option<CommitHistory>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CommitHistory {
    pub edges: Option<Vec<Option<CommitEdge>>>,
}

/// An edge of a commit history.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CommitEdge {
    pub node: Option<Commit>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub abbreviated_oid: String,
    pub message_headline: String,
    pub author: Option<CommitAuthor>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CommitAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<String>,
}

impl Display for CommitEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.node {
            Some(commit) => write!(
                f,
                "Commit: {} {} ({})",
                commit.abbreviated_oid,
                commit.message_headline,
                commit
                    .author
                    .as_ref()
                    .and_then(|author| author.name.as_deref())
                    .unwrap_or("unknown")
            ),
            None => write!(f, "Commit: -"),
        }
    }
}

impl RepositoryCommitsData {
    /// Follows viewer, repository, default branch ref, target and history down to the commit edges.
    ///
    /// Any missing link, or a target that is not a commit, yields an empty list.
    pub fn into_commit_edges(self) -> Vec<CommitEdge> {
        let target = self
            .viewer
            .and_then(|viewer| viewer.repository)
            .and_then(|repository| repository.default_branch_ref)
            .and_then(|reference| reference.target);

        match target {
            Some(RefTarget::Commit(commit)) => commit
                .history
                .and_then(|history| history.edges)
                .unwrap_or_default()
                .into_iter()
                .flatten()
                .collect(),
            Some(RefTarget::Tree | RefTarget::Blob | RefTarget::Tag | RefTarget::Unknown) | None => {
                vec![]
            }
        }
    }
}

/// A fetcher API rate limit
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FetcherRateLimit {
    /// The maximum number of requests that can be made in a given time period.
    pub limit: i32,
    /// The cost of the current request.
    pub cost: i32,
    /// The remaining number of requests that can be made in the current time period.
    pub remaining: i32,
    /// The time at which the rate limit will reset.
    pub reset_at: String,
}

impl FetcherRateLimit {
    /// Whether no more requests can be made until the reset.
    pub fn is_exceeded(&self) -> bool {
        self.remaining <= 0
    }

    /// Computes the time left until the rate limit resets, zero if already reset.
    pub fn duration_until_reset(&self, now: DateTime<Utc>) -> StdResult<Duration> {
        let reset_at = DateTime::parse_from_rfc3339(&self.reset_at)
            .with_context(|| format!("Invalid rate limit reset date: {}", self.reset_at))?
            .with_timezone(&Utc);

        Ok((reset_at - now).to_std().unwrap_or(Duration::ZERO))
    }

    #[cfg(test)]
    /// Creates a dummy `FetcherRateLimit` instance for testing purposes.
    pub fn dummy() -> Self {
        Self {
            limit: 5000,
            cost: 1,
            remaining: 4999,
            reset_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }
}

impl Display for FetcherRateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RateLimit: calls={}/{} (+{}), reset={}",
            self.limit - self.remaining,
            self.limit,
            self.cost,
            self.reset_at
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    mod repositories_data {
        use super::*;

        #[test]
        fn into_summaries_maps_each_node() {
            let data: RepositoriesData = serde_json::from_value(json!({
                "viewer": {
                    "repositories": {
                        "nodes": [
                            { "id": "R_1", "name": "repository-1", "description": "first" },
                            { "id": "R_2", "name": "repository-2", "description": null }
                        ]
                    }
                }
            }))
            .unwrap();

            let summaries = data.into_summaries();

            assert_eq!(
                vec![
                    RepositorySummary::new("R_1", "repository-1", Some("first")),
                    RepositorySummary::new("R_2", "repository-2", None),
                ],
                summaries
            );
        }

        #[test]
        fn into_summaries_skips_null_nodes() {
            let data: RepositoriesData = serde_json::from_value(json!({
                "viewer": {
                    "repositories": {
                        "nodes": [
                            null,
                            { "id": "R_1", "name": "repository-1", "description": null },
                            null
                        ]
                    }
                }
            }))
            .unwrap();

            let summaries = data.into_summaries();

            assert_eq!(
                vec![RepositorySummary::new("R_1", "repository-1", None)],
                summaries
            );
        }

        #[test]
        fn into_summaries_without_viewer_is_empty() {
            let data: RepositoriesData = serde_json::from_value(json!({})).unwrap();

            assert!(data.into_summaries().is_empty());
        }
    }

    mod repository_commits_data {
        use super::*;

        fn commits_data(target: serde_json::Value) -> RepositoryCommitsData {
            serde_json::from_value(json!({
                "viewer": {
                    "repository": {
                        "defaultBranchRef": {
                            "target": target
                        }
                    }
                }
            }))
            .unwrap()
        }

        #[test]
        fn into_commit_edges_for_commit_target() {
            let data = commits_data(json!({
                "__typename": "Commit",
                "history": {
                    "edges": [
                        {
                            "node": {
                                "abbreviatedOid": "abc1234",
                                "messageHeadline": "Initial commit",
                                "author": { "name": "octocat", "email": null, "date": null }
                            }
                        },
                        null
                    ]
                }
            }));

            let edges = data.into_commit_edges();

            assert_eq!(1, edges.len());
            assert_eq!(
                "abc1234",
                edges[0].node.as_ref().unwrap().abbreviated_oid
            );
        }

        #[test]
        fn into_commit_edges_for_tag_target_is_empty() {
            let data = commits_data(json!({ "__typename": "Tag" }));

            assert!(data.into_commit_edges().is_empty());
        }

        #[test]
        fn into_commit_edges_for_unknown_target_is_empty() {
            let data = commits_data(json!({ "__typename": "Signature" }));

            assert!(data.into_commit_edges().is_empty());
        }

        #[test]
        fn into_commit_edges_without_history_is_empty() {
            let data = commits_data(json!({ "__typename": "Commit", "history": null }));

            assert!(data.into_commit_edges().is_empty());
        }

        #[test]
        fn into_commit_edges_without_default_branch_is_empty() {
            let data: RepositoryCommitsData = serde_json::from_value(json!({
                "viewer": { "repository": { "defaultBranchRef": null } }
            }))
            .unwrap();

            assert!(data.into_commit_edges().is_empty());
        }

        #[test]
        fn into_commit_edges_without_repository_is_empty() {
            let data: RepositoryCommitsData =
                serde_json::from_value(json!({ "viewer": { "repository": null } })).unwrap();

            assert!(data.into_commit_edges().is_empty());
        }
    }

    mod fetcher_rate_limit {
        use super::*;

        #[test]
        fn is_exceeded_when_no_remaining_calls() {
            let rate_limit = FetcherRateLimit {
                remaining: 0,
                ..FetcherRateLimit::dummy()
            };

            assert!(rate_limit.is_exceeded());
            assert!(!FetcherRateLimit::dummy().is_exceeded());
        }

        #[test]
        fn duration_until_reset_in_the_future() {
            let now = Utc::now();
            let rate_limit = FetcherRateLimit {
                reset_at: (now + chrono::Duration::seconds(60)).to_rfc3339(),
                ..FetcherRateLimit::dummy()
            };

            let duration = rate_limit.duration_until_reset(now).unwrap();

            assert_eq!(Duration::from_secs(60), duration);
        }

        #[test]
        fn duration_until_reset_in_the_past_is_zero() {
            let rate_limit = FetcherRateLimit::dummy();

            let duration = rate_limit.duration_until_reset(Utc::now()).unwrap();

            assert_eq!(Duration::ZERO, duration);
        }

        #[test]
        fn duration_until_reset_fails_on_invalid_date() {
            let rate_limit = FetcherRateLimit {
                reset_at: "not-a-date".to_string(),
                ..FetcherRateLimit::dummy()
            };

            rate_limit
                .duration_until_reset(Utc::now())
                .expect_err("Expected an invalid date error");
        }
    }
}
