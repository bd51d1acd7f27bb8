use serde_json::json;
use stoactl_domo::{DomoClient, DomoError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(query_param("grant_type", "client_credentials"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "tok-1", "expires_in": 3600})),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn token_is_cached_across_calls() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/v1/datasets/abc"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc", "rows": 1234})))
        .mount(&server)
        .await;

    let client = DomoClient::new(server.uri(), "id", "secret");
    assert_eq!(client.dataset_row_count("abc").await.unwrap(), Some(1234));
    assert_eq!(client.dataset_row_count("abc").await.unwrap(), Some(1234));
}

#[tokio::test]
async fn row_count_absent_when_not_reported() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/datasets/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "abc"})))
        .mount(&server)
        .await;

    let client = DomoClient::new(server.uri(), "id", "secret");
    assert_eq!(client.dataset_row_count("abc").await.unwrap(), None);
}

#[tokio::test]
async fn export_parses_csv() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    Mock::given(method("GET"))
        .and(path("/v1/datasets/abc/data"))
        .and(query_param("includeHeader", "true"))
        .and(query_param("format", "csv"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("Property,Unit,UnitStatus\nHeights,101,Occupied No Notice\nHeights,102,Vacant Unrented\n"),
        )
        .mount(&server)
        .await;

    let client = DomoClient::new(server.uri(), "id", "secret");
    let rows = client.export_dataset("abc").await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["UnitStatus"], "Vacant Unrented");
}

#[tokio::test]
async fn auth_failure_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad client"))
        .mount(&server)
        .await;

    let client = DomoClient::new(server.uri(), "id", "wrong");
    match client.export_dataset("abc").await {
        Err(DomoError::Status { status, body, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "bad client");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[test]
fn from_config_requires_credentials() {
    let section = stoactl_core::config::DomoSection::default();
    assert!(matches!(
        DomoClient::from_config(&section),
        Err(DomoError::MissingCredentials)
    ));
}
