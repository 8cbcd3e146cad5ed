//! GraphQL-over-HTTP transport.
//!
//! Requests are `POST`ed as `{"operationName", "query", "variables"}` and the
//! standard `{"data", "errors"}` envelope is decoded. A response is only
//! accepted when it carries data and no errors: partial results are refused.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use core_runtime::config::{CoreConfig, DEFAULT_REQUEST_TIMEOUT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, TransportError};
use crate::fragments::{FilmFragment, FragmentList, PersonFragment};
use crate::query::Query;
use crate::transport::TransportClient;

const BODY_SNIPPET_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlErrorItem>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorItem {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllPeopleData {
    all_people: Option<PeopleConnection>,
}

#[derive(Debug, Deserialize)]
struct PeopleConnection {
    people: Option<Vec<Option<PersonFragment>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AllFilmsData {
    all_films: Option<FilmsConnection>,
}

#[derive(Debug, Deserialize)]
struct FilmsConnection {
    films: Option<Vec<Option<FilmFragment>>>,
}

/// [`TransportClient`] backed by an injected [`HttpClient`].
pub struct GraphQlTransport {
    http_client: Arc<dyn HttpClient>,
    endpoint: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl GraphQlTransport {
    pub fn new(http_client: Arc<dyn HttpClient>, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Build a transport from validated core configuration.
    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(Arc::clone(&config.http_client), config.api_endpoint.clone())
            .with_timeout(config.request_timeout)
            .with_retry_policy(config.retry_policy.clone())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, query: Query) -> Result<HttpResponse> {
        let body = json!({
            "operationName": query.operation_name(),
            "query": query.document(),
            "variables": {},
        });

        let request = HttpRequest::new(HttpMethod::Post, self.endpoint.as_str())
            .header("Accept", "application/json")
            .json(&body)?
            .timeout(self.timeout);

        debug!(endpoint = %self.endpoint, "Sending GraphQL request");

        let response = self
            .http_client
            .execute_with_retry(request, self.retry_policy.clone())
            .await?;

        Ok(response)
    }

    async fn execute_query(&self, query: Query) -> Result<FragmentList> {
        let response = self.post(query).await?;

        match query {
            Query::AllPeople => {
                let data: AllPeopleData = Self::decode(query, &response)?;
                let people = Self::collect_items(query, data.all_people.and_then(|c| c.people))?;
                Ok(FragmentList::People(people))
            }
            Query::AllFilms => {
                let data: AllFilmsData = Self::decode(query, &response)?;
                let films = Self::collect_items(query, data.all_films.and_then(|c| c.films))?;
                Ok(FragmentList::Films(films))
            }
        }
    }

    fn body_snippet(response: &HttpResponse) -> String {
        String::from_utf8_lossy(&response.body)
            .chars()
            .take(BODY_SNIPPET_LEN)
            .collect()
    }

    fn decode<T: DeserializeOwned>(query: Query, response: &HttpResponse) -> Result<T> {
        let envelope: GraphQlResponse<T> = match serde_json::from_slice(&response.body) {
            Ok(envelope) => envelope,
            Err(e) if response.is_success() => {
                return Err(TransportError::Decode(format!(
                    "{}: {}",
                    query.operation_name(),
                    e
                )));
            }
            Err(_) => {
                return Err(TransportError::Status {
                    status: response.status,
                    message: Self::body_snippet(response),
                });
            }
        };

        let messages: Vec<String> = envelope
            .errors
            .unwrap_or_default()
            .into_iter()
            .map(|item| item.message)
            .collect();
        if !messages.is_empty() {
            return Err(TransportError::GraphQl { messages });
        }

        if !response.is_success() {
            return Err(TransportError::Status {
                status: response.status,
                message: Self::body_snippet(response),
            });
        }

        envelope.data.ok_or(TransportError::MissingData {
            operation: query.operation_name(),
        })
    }

    fn collect_items<T>(query: Query, items: Option<Vec<Option<T>>>) -> Result<Vec<T>> {
        let items = items.ok_or(TransportError::MissingData {
            operation: query.operation_name(),
        })?;

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                item.ok_or_else(|| {
                    TransportError::Decode(format!(
                        "{}: null entry at index {}",
                        query.operation_name(),
                        index
                    ))
                })
            })
            .collect()
    }
}

#[async_trait]
impl TransportClient for GraphQlTransport {
    #[instrument(skip(self), fields(operation = %query))]
    async fn fetch(&self, query: Query) -> Result<FragmentList> {
        let result = self.execute_query(query).await;

        match &result {
            Ok(list) => info!(count = list.len(), kind = list.kind(), "GraphQL query completed"),
            Err(e) => warn!(error = %e, transient = e.is_transient(), "GraphQL query failed"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
            async fn execute_with_retry(
                &self,
                request: HttpRequest,
                policy: RetryPolicy,
            ) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn transport_returning(status: u16, body: &'static str) -> GraphQlTransport {
        let mut mock_client = MockHttpClient::new();
        mock_client
            .expect_execute_with_retry()
            .times(1)
            .returning(move |_, _| Ok(response(status, body)));
        GraphQlTransport::new(Arc::new(mock_client), "https://example.test/graphql")
    }

    #[tokio::test]
    async fn test_fetch_people_success() {
        let transport = transport_returning(
            200,
            r#"{"data":{"allPeople":{"people":[
                {"id":"cGVvcGxlOjE=","name":"Luke Skywalker","homeworld":{"name":"Tatooine"}},
                {"id":"cGVvcGxlOjU=","name":"Leia Organa","homeworld":{"name":"Alderaan"}}
            ]}}}"#,
        );

        let list = transport.fetch(Query::AllPeople).await.unwrap();
        match list {
            FragmentList::People(people) => {
                assert_eq!(people.len(), 2);
                assert_eq!(people[0].name.as_deref(), Some("Luke Skywalker"));
                assert_eq!(
                    people[1].homeworld.as_ref().and_then(|h| h.name.as_deref()),
                    Some("Alderaan")
                );
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_films_success() {
        let transport = transport_returning(
            200,
            r#"{"data":{"allFilms":{"films":[
                {"id":"ZmlsbXM6MQ==","title":"A New Hope","director":"George Lucas"}
            ]}}}"#,
        );

        let list = transport.fetch(Query::AllFilms).await.unwrap();
        assert_eq!(
            list,
            FragmentList::Films(vec![FilmFragment {
                id: "ZmlsbXM6MQ==".to_string(),
                title: Some("A New Hope".to_string()),
                director: Some("George Lucas".to_string()),
            }])
        );
    }

    #[tokio::test]
    async fn test_request_carries_operation_and_policy() {
        let mut mock_client = MockHttpClient::new();
        mock_client
            .expect_execute_with_retry()
            .withf(|request, policy| {
                let body: serde_json::Value = request
                    .body
                    .as_ref()
                    .and_then(|b| serde_json::from_slice(b).ok())
                    .unwrap_or_default();
                request.method == HttpMethod::Post
                    && request.url == "https://example.test/graphql"
                    && request.timeout == Some(Duration::from_secs(5))
                    && body["operationName"] == "GetAllFilms"
                    && body["query"]
                        .as_str()
                        .is_some_and(|q| q.contains("fragment FilmFragment on Film"))
                    && policy.max_attempts == 1
            })
            .times(1)
            .returning(|_, _| Ok(response(200, r#"{"data":{"allFilms":{"films":[]}}}"#)));

        let transport = GraphQlTransport::new(Arc::new(mock_client), "https://example.test/graphql")
            .with_timeout(Duration::from_secs(5))
            .with_retry_policy(RetryPolicy::no_retry());

        let list = transport.fetch(Query::AllFilms).await.unwrap();
        assert!(list.is_empty());
    }

    #[tokio::test]
    async fn test_graphql_errors_reject_partial_data() {
        let transport = transport_returning(
            200,
            r#"{"data":{"allPeople":{"people":[]}},"errors":[{"message":"boom"},{"message":"bang"}]}"#,
        );

        let err = transport.fetch(Query::AllPeople).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::GraphQl {
                messages: vec!["boom".to_string(), "bang".to_string()]
            }
        );
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_null_data_is_missing_data() {
        let transport = transport_returning(200, r#"{"data":null}"#);

        let err = transport.fetch(Query::AllFilms).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::MissingData {
                operation: "GetAllFilms"
            }
        );
    }

    #[tokio::test]
    async fn test_null_connection_is_missing_data() {
        let transport = transport_returning(200, r#"{"data":{"allPeople":null}}"#);

        let err = transport.fetch(Query::AllPeople).await.unwrap_err();
        assert!(matches!(err, TransportError::MissingData { .. }));
    }

    #[tokio::test]
    async fn test_null_list_entry_is_decode_error() {
        let transport = transport_returning(
            200,
            r#"{"data":{"allFilms":{"films":[{"id":"1","title":"A","director":"B"},null]}}}"#,
        );

        let err = transport.fetch(Query::AllFilms).await.unwrap_err();
        match err {
            TransportError::Decode(message) => assert!(message.contains("index 1")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let transport = transport_returning(200, "<html>not json</html>");

        let err = transport.fetch(Query::AllPeople).await.unwrap_err();
        assert!(matches!(err, TransportError::Decode(_)));
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let transport = transport_returning(502, "Bad Gateway");

        let err = transport.fetch(Query::AllPeople).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::Status {
                status: 502,
                message: "Bad Gateway".to_string()
            }
        );
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_network_failure_maps_bridge_error() {
        let mut mock_client = MockHttpClient::new();
        mock_client
            .expect_execute_with_retry()
            .returning(|_, _| Err(BridgeError::ConnectionFailed("refused".to_string())));

        let transport = GraphQlTransport::new(Arc::new(mock_client), "https://example.test/graphql");

        let err = transport.fetch(Query::AllFilms).await.unwrap_err();
        assert!(matches!(err, TransportError::Network { transient: true, .. }));
        assert!(err.to_string().contains("refused"));
    }
}
