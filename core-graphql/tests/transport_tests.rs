use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use bytes::Bytes;
use core_graphql::{FragmentList, GraphQlTransport, Query, TransportClient};
use core_runtime::config::{CoreConfig, DEFAULT_API_ENDPOINT};

/// Records every request and answers with a fixed body.
struct RecordingHttpClient {
    body: &'static str,
    requests: Mutex<Vec<(HttpRequest, RetryPolicy)>>,
}

impl RecordingHttpClient {
    fn new(body: &'static str) -> Self {
        Self {
            body,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HttpClient for RecordingHttpClient {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.execute_with_retry(request, RetryPolicy::default()).await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push((request, policy));
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from_static(self.body.as_bytes()),
        })
    }
}

#[tokio::test]
async fn test_transport_from_config_uses_configured_endpoint_and_limits() {
    let http = Arc::new(RecordingHttpClient::new(
        r#"{"data":{"allFilms":{"films":[{"id":"1","title":"A New Hope","director":"George Lucas"}]}}}"#,
    ));
    let policy = RetryPolicy {
        max_attempts: 2,
        ..RetryPolicy::default()
    };
    let config = CoreConfig::builder()
        .http_client(http.clone())
        .request_timeout(Duration::from_secs(7))
        .retry_policy(policy.clone())
        .build()
        .unwrap();

    let transport = GraphQlTransport::from_config(&config);
    assert_eq!(transport.endpoint(), DEFAULT_API_ENDPOINT);

    let list = transport.fetch(Query::AllFilms).await.unwrap();
    assert!(matches!(list, FragmentList::Films(ref films) if films.len() == 1));

    let requests = http.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let (request, used_policy) = &requests[0];
    assert_eq!(request.url, DEFAULT_API_ENDPOINT);
    assert_eq!(request.timeout, Some(Duration::from_secs(7)));
    assert_eq!(used_policy, &policy);
    assert_eq!(
        request.headers.get("Content-Type").map(String::as_str),
        Some("application/json")
    );
}

#[tokio::test]
async fn test_each_fetch_is_a_separate_round_trip() {
    let http = Arc::new(RecordingHttpClient::new(
        r#"{"data":{"allPeople":{"people":[]}}}"#,
    ));
    let transport = GraphQlTransport::new(http.clone(), "http://localhost:4000/graphql");

    transport.fetch(Query::AllPeople).await.unwrap();
    transport.fetch(Query::AllPeople).await.unwrap();

    assert_eq!(http.requests.lock().unwrap().len(), 2);
}
