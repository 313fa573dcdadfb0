use std::fmt::Display;

use serde::Serialize;
use serde_json::Value;

use super::StdResult;

const REPOSITORIES_DOCUMENT: &str = r#"
query GithubRepositories($repositoriesCount: Int!, $orderBy: RepositoryOrderField!, $orderDirection: OrderDirection!) {
  viewer {
    repositories(first: $repositoriesCount, orderBy: {field: $orderBy, direction: $orderDirection}, ownerAffiliations: [OWNER]) {
      nodes {
        id
        name
        description
      }
    }
  }
  rateLimit {
    limit
    cost
    remaining
    resetAt
  }
}
"#;

const REPOSITORY_DETAIL_DOCUMENT: &str = r#"
query GithubRepositoryDetail($name: String!, $pullRequestStates: [PullRequestState!]) {
  viewer {
    repository(name: $name) {
      id
      name
      description
      url
      pullRequests(last: 10, states: $pullRequestStates) {
        totalCount
        nodes {
          id
          title
          url
          author {
            login
          }
        }
      }
      releases(last: 10) {
        totalCount
        nodes {
          id
          name
          url
          publishedAt
        }
      }
    }
  }
  rateLimit {
    limit
    cost
    remaining
    resetAt
  }
}
"#;

const REPOSITORY_COMMITS_DOCUMENT: &str = r#"
query GithubRepositoryCommits($name: String!) {
  viewer {
    repository(name: $name) {
      defaultBranchRef {
        target {
          __typename
          ... on Commit {
            history(first: 50) {
              edges {
                node {
                  abbreviatedOid
                  messageHeadline
                  author {
                    name
                    email
                    date
                  }
                }
              }
            }
          }
        }
      }
    }
  }
  rateLimit {
    limit
    cost
    remaining
    resetAt
  }
}
"#;

/// The field used to order repositories.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepositoryOrderField {
    CreatedAt,
    UpdatedAt,
    PushedAt,
    Name,
    Stargazers,
}

/// The direction of an ordering.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderDirection {
    Asc,
    Desc,
}

/// The state of a pull request.
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

/// How a query is resolved against the cache and the network.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum FetchPolicy {
    /// Only read the cache, fail on a miss.
    CacheOnly,
    /// Always hit the network, ignore the cache.
    NetworkOnly,
    /// Read the cache, hit the network only on a miss.
    CacheFirst,
    /// Emit the cached value if any, then always hit the network.
    CacheAndNetwork,
}

impl Display for FetchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchPolicy::CacheOnly => write!(f, "cache-only"),
            FetchPolicy::NetworkOnly => write!(f, "network-only"),
            FetchPolicy::CacheFirst => write!(f, "cache-first"),
            FetchPolicy::CacheAndNetwork => write!(f, "cache-and-network"),
        }
    }
}

/// A GraphQL query descriptor
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub enum Query {
    /// The repositories of the authenticated user.
    Repositories(RepositoriesQuery),

    /// The detail of a repository of the authenticated user.
    RepositoryDetail(RepositoryDetailQuery),

    /// The default branch commit history of a repository of the authenticated user.
    RepositoryCommits(RepositoryCommitsQuery),
}

impl Query {
    /// The GraphQL operation name.
    pub fn operation_name(&self) -> &'static str {
        match self {
            Query::Repositories(_) => "GithubRepositories",
            Query::RepositoryDetail(_) => "GithubRepositoryDetail",
            Query::RepositoryCommits(_) => "GithubRepositoryCommits",
        }
    }

    /// The GraphQL document sent to the server.
    pub fn document(&self) -> &'static str {
        match self {
            Query::Repositories(_) => REPOSITORIES_DOCUMENT,
            Query::RepositoryDetail(_) => REPOSITORY_DETAIL_DOCUMENT,
            Query::RepositoryCommits(_) => REPOSITORY_COMMITS_DOCUMENT,
        }
    }

    /// The variables sent along with the document.
    pub fn variables(&self) -> StdResult<Value> {
        let variables = match self {
            Query::Repositories(query) => serde_json::to_value(query)?,
            Query::RepositoryDetail(query) => serde_json::to_value(query)?,
            Query::RepositoryCommits(query) => serde_json::to_value(query)?,
        };

        Ok(variables)
    }
}

impl Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::Repositories(query) => write!(f, "{}", query),
            Query::RepositoryDetail(query) => write!(f, "{}", query),
            Query::RepositoryCommits(query) => write!(f, "{}", query),
        }
    }
}

impl From<RepositoriesQuery> for Query {
    fn from(query: RepositoriesQuery) -> Self {
        Query::Repositories(query)
    }
}

impl From<RepositoryDetailQuery> for Query {
    fn from(query: RepositoryDetailQuery) -> Self {
        Query::RepositoryDetail(query)
    }
}

impl From<RepositoryCommitsQuery> for Query {
    fn from(query: RepositoryCommitsQuery) -> Self {
        Query::RepositoryCommits(query)
    }
}

/// A query for the repositories of the authenticated user
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Hash)]
#[serde(rename_all = "camelCase")]
pub struct RepositoriesQuery {
    /// The number of repositories to return.
    pub(crate) repositories_count: u16,

    /// The ordering field.
    pub(crate) order_by: RepositoryOrderField,

    /// The ordering direction.
    pub(crate) order_direction: OrderDirection,
}

impl RepositoriesQuery {
    /// Creates a new `RepositoriesQuery`.
    pub fn new(
        repositories_count: u16,
        order_by: RepositoryOrderField,
        order_direction: OrderDirection,
    ) -> Self {
        Self {
            repositories_count,
            order_by,
            order_direction,
        }
    }
}

impl Display for RepositoriesQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RepositoriesQuery: repositories_count={}, order_by={:?}, order_direction={:?}",
            self.repositories_count, self.order_by, self.order_direction
        )
    }
}

/// A query for the detail of a repository
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Hash)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDetailQuery {
    /// The repository name.
    pub(crate) name: String,

    /// The states of the pull requests to return.
    pub(crate) pull_request_states: Vec<PullRequestState>,
}

impl RepositoryDetailQuery {
    /// Creates a new `RepositoryDetailQuery`.
    pub fn new(name: &str, pull_request_states: Vec<PullRequestState>) -> Self {
        Self {
            name: name.to_string(),
            pull_request_states,
        }
    }
}

impl Display for RepositoryDetailQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RepositoryDetailQuery: name={}, pull_request_states={:?}",
            self.name, self.pull_request_states
        )
    }
}

/// A query for the default branch commits of a repository
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Hash)]
pub struct RepositoryCommitsQuery {
    /// The repository name.
    pub(crate) name: String,
}

impl RepositoryCommitsQuery {
    /// Creates a new `RepositoryCommitsQuery`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Display for RepositoryCommitsQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RepositoryCommitsQuery: name={}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn repositories_query_variables() {
        let query = Query::from(RepositoriesQuery::new(
            50,
            RepositoryOrderField::UpdatedAt,
            OrderDirection::Desc,
        ));

        let variables = query.variables().unwrap();

        assert_eq!(
            json!({
                "repositoriesCount": 50,
                "orderBy": "UPDATED_AT",
                "orderDirection": "DESC"
            }),
            variables
        );
        assert!(query.document().contains("query GithubRepositories("));
    }

    #[test]
    fn repository_detail_query_variables() {
        let query = Query::from(RepositoryDetailQuery::new(
            "octokit",
            vec![PullRequestState::Open],
        ));

        let variables = query.variables().unwrap();

        assert_eq!(
            json!({
                "name": "octokit",
                "pullRequestStates": ["OPEN"]
            }),
            variables
        );
        assert_eq!("GithubRepositoryDetail", query.operation_name());
    }

    #[test]
    fn repository_commits_query_variables() {
        let query = Query::from(RepositoryCommitsQuery::new("octokit"));

        let variables = query.variables().unwrap();

        assert_eq!(json!({ "name": "octokit" }), variables);
        assert!(query.document().contains("... on Commit"));
    }

    #[test]
    fn identical_descriptors_are_equal() {
        let query1 = Query::from(RepositoryCommitsQuery::new("octokit"));
        let query2 = Query::from(RepositoryCommitsQuery::new("octokit"));
        let query3 = Query::from(RepositoryCommitsQuery::new("hub"));

        assert_eq!(query1, query2);
        assert_ne!(query1, query3);
    }
}
