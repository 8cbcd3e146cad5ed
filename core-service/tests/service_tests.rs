use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, RetryPolicy};
use bytes::Bytes;
use core_service::{
    CollectionEvent, CoreConfig, CoreError, CoreEvent, CoreService, FetchPolicy, Person,
    RepositoryError, RepositoryEvent, TransportError,
};
use mockall::mock;
use tokio::time::timeout;

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

const PEOPLE_BODY: &str = r#"{"data":{"allPeople":{"people":[
    {"id":"1","name":"Luke Skywalker","homeworld":{"name":"Tatooine"}},
    {"id":"2","name":"Leia Organa","homeworld":{"name":"Alderaan"}}
]}}}"#;

fn ok(body: &str) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: HashMap::new(),
        body: Bytes::from(body.to_string()),
    }
}

fn operation_of(request: &HttpRequest) -> String {
    request
        .body
        .as_ref()
        .and_then(|body| serde_json::from_slice::<serde_json::Value>(body).ok())
        .and_then(|json| json["operationName"].as_str().map(str::to_string))
        .unwrap_or_default()
}

fn config_with(client: MockHttpClient) -> CoreConfig {
    CoreConfig::builder()
        .api_endpoint("http://localhost:4000/graphql")
        .http_client(Arc::new(client))
        .retry_policy(RetryPolicy::no_retry())
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_bootstrap_loads_people_over_http() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute_with_retry()
        .withf(|request, _| {
            request.url == "http://localhost:4000/graphql" && operation_of(request) == "GetAllPeople"
        })
        .times(1)
        .returning(|_, _| Ok(ok(PEOPLE_BODY)));

    let core = CoreService::bootstrap(config_with(client)).unwrap();
    let mut people = core.repository().people();

    let event = timeout(Duration::from_secs(5), people.next())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        event.snapshot().unwrap().items(),
        &[
            Person::new("1", "Luke Skywalker", "Tatooine"),
            Person::new("2", "Leia Organa", "Alderaan"),
        ]
    );
}

#[tokio::test]
async fn test_http_failure_surfaces_as_collection_failure() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute_with_retry()
        .times(1)
        .returning(|_, _| Err(BridgeError::Timeout(Duration::from_secs(30))));

    let core = CoreService::bootstrap(config_with(client)).unwrap();
    let mut events = core.events().for_collection("films");
    let mut films = core.repository().films();

    match timeout(Duration::from_secs(5), films.next()).await.unwrap() {
        Some(CollectionEvent::Failed(RepositoryError::Transport(TransportError::Network {
            transient,
            ..
        }))) => assert!(transient),
        other => panic!("unexpected event: {:?}", other),
    }
    assert!(core.repository().films_snapshot().is_none());

    let started = events.recv().await.unwrap();
    assert!(matches!(
        started,
        CoreEvent::Repository(RepositoryEvent::FetchStarted { .. })
    ));
    let failed = events.recv().await.unwrap();
    assert!(matches!(
        failed,
        CoreEvent::Repository(RepositoryEvent::FetchFailed {
            recoverable: true,
            ..
        })
    ));
}

#[tokio::test]
async fn test_configured_fetch_policy_reaches_repository() {
    let config = CoreConfig::builder()
        .http_client(Arc::new(MockHttpClient::new()))
        .fetch_policy(FetchPolicy::RefreshOnSubscribe)
        .event_buffer_size(4)
        .build()
        .unwrap();

    let core = CoreService::bootstrap(config).unwrap();
    assert_eq!(core.repository().fetch_policy(), FetchPolicy::RefreshOnSubscribe);
    assert_eq!(core.config().event_buffer_size, 4);
}

#[tokio::test]
async fn test_clones_share_collections() {
    let mut client = MockHttpClient::new();
    client
        .expect_execute_with_retry()
        .times(1)
        .returning(|_, _| Ok(ok(PEOPLE_BODY)));

    let core = CoreService::bootstrap(config_with(client)).unwrap();
    let other_surface = core.clone();

    let loaded = core.repository().refresh_people().await.unwrap();
    let mut people = other_surface.repository().people();
    let replayed = people.try_next().unwrap();
    assert!(replayed.snapshot().unwrap().ptr_eq(&loaded));
}

#[test]
fn test_bootstrap_outside_runtime_is_runtime_error() {
    let config = config_with(MockHttpClient::new());
    let err = CoreService::bootstrap(config).unwrap_err();
    assert!(matches!(err, CoreError::Runtime(_)));
}
