use std::collections::HashMap;

use anyhow::anyhow;
use gql_client::{Client, GraphQLError};
use log::{debug, error};
use serde_json::Value;

use crate::{FetcherRateLimit, NetworkFetcher, NetworkResponse, Query, QueryError, StdResult};

/// The GraphQL production endpoint for GitHub.
pub const GITHUB_GRAPHQL_ENDPOINT: &str = "https://api.github.com/graphql";

impl From<GraphQLError> for QueryError {
    fn from(error: GraphQLError) -> Self {
        let message = error.message().to_string();
        match message.contains("Failed to parse response") {
            true => QueryError::Parse(message),
            false => QueryError::Remote(message),
        }
    }
}

/// Fetches query results from a GraphQL API.
pub struct GraphQlFetcher {
    client: Client,
}

impl GraphQlFetcher {
    /// Creates a new `GraphQlFetcher` instance authenticated with the given API token.
    pub fn try_new(endpoint: &str, api_token: &str) -> StdResult<Self> {
        if api_token.trim().is_empty() {
            return Err(anyhow!("Missing GitHub API token"));
        }
        let bearer_token = format!("Bearer {}", api_token);
        let mut headers = HashMap::from([("User-Agent", "gql-client")]);
        headers.insert("Authorization", &bearer_token);
        let client = Client::new_with_headers(endpoint, headers);

        Ok(Self { client })
    }

    fn parse_rate_limit(data: &Value) -> Result<Option<FetcherRateLimit>, QueryError> {
        match data.get("rateLimit") {
            None | Some(Value::Null) => Ok(None),
            Some(rate_limit) => serde_json::from_value(rate_limit.to_owned())
                .map(Some)
                .map_err(|e| QueryError::Parse(format!("Invalid rate limit: {e}"))),
        }
    }
}

#[async_trait::async_trait]
impl NetworkFetcher for GraphQlFetcher {
    async fn fetch(&self, query: &Query) -> StdResult<NetworkResponse> {
        debug!("Sending GraphQL operation {}", query.operation_name());
        let data = self
            .client
            .query_with_vars_unwrap::<Value, Value>(query.document(), query.variables()?)
            .await
            .map_err(QueryError::from);
        if let Err(QueryError::Parse(e)) = &data {
            error!("Failed to parse GraphQL response: {}", e);
        }
        let data = data?;
        let rate_limit = Self::parse_rate_limit(&data)?;

        Ok(NetworkResponse::new(data, rate_limit))
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;

    use crate::{OrderDirection, RepositoriesQuery, RepositoryCommitsQuery, RepositoryOrderField};

    use super::*;

    fn repositories_query() -> Query {
        Query::from(RepositoriesQuery::new(
            50,
            RepositoryOrderField::UpdatedAt,
            OrderDirection::Desc,
        ))
    }

    fn mock_json_value() -> Value {
        json!({
            "data": {
                "viewer": {
                    "repositories": {
                        "nodes": [
                            { "id": "R_1", "name": "repository-1", "description": null },
                            { "id": "R_2", "name": "repository-2", "description": "second" }
                        ]
                    }
                },
                "rateLimit": {
                    "limit": 5000,
                    "cost": 1,
                    "remaining": 4999,
                    "resetAt": "2025-01-01T00:00:00Z"
                }
            }
        })
    }

    #[test]
    fn try_new_fails_without_token() {
        let result = GraphQlFetcher::try_new(GITHUB_GRAPHQL_ENDPOINT, " ");

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn fetch_returns_data_and_rate_limit() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/")
                .header("Authorization", "Bearer credentials")
                .body_contains("GithubRepositories")
                .body_contains("UPDATED_AT");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(mock_json_value());
        });
        let fetcher = GraphQlFetcher::try_new(&server.url("/"), "credentials").unwrap();

        let response = fetcher.fetch(&repositories_query()).await.unwrap();

        mock.assert();
        assert_eq!(&mock_json_value()["data"], response.data());
        assert_eq!(Some(&FetcherRateLimit::dummy()), response.rate_limit());
    }

    #[tokio::test]
    async fn fetch_without_rate_limit() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST").path("/").body_contains("GithubRepositoryCommits");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({ "data": { "viewer": { "repository": null } } }));
        });
        let fetcher = GraphQlFetcher::try_new(&server.url("/"), "credentials").unwrap();

        let response = fetcher
            .fetch(&Query::from(RepositoryCommitsQuery::new("octokit")))
            .await
            .unwrap();

        mock.assert();
        assert_eq!(None, response.rate_limit());
    }

    #[tokio::test]
    async fn fetch_fails_on_graphql_errors() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST").path("/");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "data": null,
                    "errors": [{ "message": "Could not resolve to a Repository" }]
                }));
        });
        let fetcher = GraphQlFetcher::try_new(&server.url("/"), "credentials").unwrap();

        fetcher
            .fetch(&repositories_query())
            .await
            .expect_err("Expected a remote error");
        mock.assert();
    }

    #[tokio::test]
    async fn fetch_fails_with_parse_error_on_invalid_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST").path("/");
            then.status(502).body("Bad gateway");
        });
        let fetcher = GraphQlFetcher::try_new(&server.url("/"), "credentials").unwrap();

        let error = fetcher
            .fetch(&repositories_query())
            .await
            .expect_err("Expected a parse error");

        mock.assert();
        assert!(matches!(
            error.downcast_ref::<QueryError>(),
            Some(QueryError::Parse(_))
        ));
    }
}
