// crab-client/tests/http_transport.rs
// reqwest 传输层 + 刷新流程 (wiremock)

use std::sync::Arc;
use std::time::Duration;

use crab_client::{
    ApiRequest, AuthenticatingClient, ClientConfig, ClientError, Credential, CredentialStore,
    MemoryCredentialStore, ReqwestTransport, RequestTransport,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_refresh_scenario_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/42"))
        .and(header("Authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "accessToken": "B" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/orders/42"))
        .and(header("Authorization", "Bearer B"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": 42 })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_credential("A"));
    let client = AuthenticatingClient::new(ClientConfig::new(server.uri()), store.clone()).unwrap();

    let order: serde_json::Value = client.get("/orders/42").await.unwrap();

    assert_eq!(order, serde_json::json!({ "id": 42 }));
    assert_eq!(store.get(), Some(Credential::new("B")));
}

#[tokio::test]
async fn test_transport_reports_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/orders"))
        .and(header("X-Terminal", "pos-01"))
        .and(body_json(serde_json::json!({ "table": 7 })))
        .respond_with(ResponseTemplate::new(422).set_body_string("table closed"))
        .mount(&server)
        .await;

    let transport = ReqwestTransport::new(&ClientConfig::new(server.uri())).unwrap();
    let request = ApiRequest::post("/orders")
        .json(&serde_json::json!({ "table": 7 }))
        .unwrap()
        .header("X-Terminal", "pos-01");

    let response = transport.execute(&request).await.unwrap();
    assert_eq!(response.status.as_u16(), 422);
    assert_eq!(response.body, "table closed");
}

#[tokio::test]
async fn test_timeout_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = ClientConfig::new(server.uri()).with_timeout(Duration::from_millis(100));
    let client =
        AuthenticatingClient::new(config, Arc::new(MemoryCredentialStore::new())).unwrap();

    let err = client.send(ApiRequest::get("/slow")).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_credential("A"));
    let client = AuthenticatingClient::new(ClientConfig::new(server.uri()), store).unwrap();

    let err = client.send(ApiRequest::get("/orders")).await.unwrap_err();
    assert!(matches!(err, ClientError::Server { status: 503, ref body } if body == "maintenance"));
}
