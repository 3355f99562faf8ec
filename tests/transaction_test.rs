//! Transaction create/commit/rollback against a mock REST service

use docstore_client::{ClientConfig, DocStoreError, DocumentStoreClient, TransactionId};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, database: Option<&str>) -> DocumentStoreClient {
    DocumentStoreClient::new(ClientConfig {
        url: server.uri(),
        auth: "none".into(),
        database: database.map(String::from),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_create_parses_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .respond_with(
            ResponseTemplate::new(303).insert_header("Location", "/v1/transactions/123"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tx = client(&server, None).create_transaction().await.unwrap();
    assert_eq!(tx, TransactionId::new("123"));

    // The 303 is not followed
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.query(), None);
}

#[tokio::test]
async fn test_create_scoped_to_database() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .and(query_param("database", "App-Modules"))
        .respond_with(
            ResponseTemplate::new(303)
                .insert_header("Location", "/v1/transactions/8812?database=App-Modules"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tx = client(&server, Some("App-Modules"))
        .create_transaction()
        .await
        .unwrap();
    assert_eq!(tx.as_str(), "8812");
}

#[tokio::test]
async fn test_create_requires_303() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let err = client(&server, None).create_transaction().await.unwrap_err();
    assert!(matches!(err, DocStoreError::RemoteService { status: 200, .. }));
}

#[tokio::test]
async fn test_create_without_location_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .respond_with(ResponseTemplate::new(303))
        .mount(&server)
        .await;

    let err = client(&server, None).create_transaction().await.unwrap_err();
    assert!(matches!(err, DocStoreError::MalformedLocation(_)));
}

#[tokio::test]
async fn test_create_with_unexpected_location_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .respond_with(ResponseTemplate::new(303).insert_header("Location", "/v1/documents"))
        .mount(&server)
        .await;

    let err = client(&server, None).create_transaction().await.unwrap_err();
    assert!(matches!(err, DocStoreError::MalformedLocation(_)));
}

#[tokio::test]
async fn test_commit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions/123"))
        .and(query_param("result", "commit"))
        .and(query_param("database", "App-Modules"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, Some("App-Modules"))
        .commit_transaction(&TransactionId::new("123"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_commit_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions/123"))
        .respond_with(ResponseTemplate::new(400).set_body_string("expired"))
        .mount(&server)
        .await;

    let err = client(&server, None)
        .commit_transaction(&TransactionId::new("123"))
        .await
        .unwrap_err();
    assert!(matches!(err, DocStoreError::RemoteService { status: 400, ref body } if body == "expired"));
}

#[tokio::test]
async fn test_rollback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions/55"))
        .and(query_param("result", "rollback"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, None)
        .rollback_transaction(&TransactionId::new("55"))
        .await
        .unwrap();
}
