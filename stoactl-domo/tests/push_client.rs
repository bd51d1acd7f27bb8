use std::time::Duration;

use serde_json::{json, Value};
use stoactl_core::leasing::sync::{HEADER_DATA_HASH, HEADER_FIRST_CHUNK, HEADER_LAST_CHUNK, HEADER_TOTAL_ROWS};
use stoactl_core::leasing::{data_hash, DatasetKey, RawRow};
use stoactl_domo::{DatasetPayload, PushClient, PushOptions};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rows(n: usize) -> Vec<RawRow> {
    (0..n)
        .map(|i| json!({"Property": "Heights", "Unit": i.to_string()}).as_object().cloned().unwrap())
        .collect()
}

fn fast_options(chunk_rows: usize) -> PushOptions {
    PushOptions {
        chunk_rows,
        dataset_pause: Duration::ZERO,
        chunk_pause: Duration::ZERO,
        timeout: Duration::from_secs(5),
    }
}

fn ok_report(dataset: &str, rows: usize) -> Value {
    json!({"success": true, "synced": [{"dataset": dataset, "rows": rows}], "skipped": [], "errors": null})
}

fn header(request: &wiremock::Request, name: &str) -> Option<String> {
    request.headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
}

#[tokio::test]
async fn each_small_dataset_is_its_own_plain_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/leasing/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_report("leasing", 3)))
        .expect(2)
        .mount(&server)
        .await;

    let client = PushClient::new(&server.uri(), fast_options(10)).unwrap();
    let payload = vec![
        DatasetPayload { key: DatasetKey::Leasing, rows: rows(3) },
        DatasetPayload { key: DatasetKey::Units, rows: rows(2) },
    ];
    let report = client.push(&payload).await;
    assert!(report.success);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let first: Value = requests[0].body_json().unwrap();
    let second: Value = requests[1].body_json().unwrap();
    assert_eq!(first.as_object().unwrap().len(), 1);
    assert_eq!(first["leasing"].as_array().unwrap().len(), 3);
    assert_eq!(second.as_object().unwrap().len(), 1);
    assert_eq!(second["units"].as_array().unwrap().len(), 2);
    for request in &requests {
        assert_eq!(header(request, HEADER_FIRST_CHUNK), None);
        assert_eq!(header(request, HEADER_LAST_CHUNK), None);
    }
}

#[tokio::test]
async fn only_the_large_dataset_is_chunked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/leasing/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_report("units", 4)))
        .expect(4)
        .mount(&server)
        .await;

    let client = PushClient::new(&server.uri(), fast_options(4)).unwrap();
    let report = client
        .push(&[
            DatasetPayload { key: DatasetKey::Units, rows: rows(10) },
            DatasetPayload { key: DatasetKey::Pricing, rows: rows(2) },
        ])
        .await;
    assert!(report.success);

    let requests = server.received_requests().await.unwrap();
    // three chunks of units, then pricing on its own
    assert_eq!(requests.len(), 4);
    assert_eq!(header(&requests[0], HEADER_FIRST_CHUNK).as_deref(), Some("true"));
    assert_eq!(header(&requests[2], HEADER_LAST_CHUNK).as_deref(), Some("true"));
    let small: Value = requests[3].body_json().unwrap();
    assert_eq!(small["pricing"].as_array().unwrap().len(), 2);
    assert_eq!(header(&requests[3], HEADER_FIRST_CHUNK), None);
    assert_eq!(header(&requests[3], HEADER_TOTAL_ROWS), None);
}

#[tokio::test]
async fn unreachable_backend_is_a_dataset_error() {
    let client = PushClient::new("http://127.0.0.1:1", fast_options(10)).unwrap();
    let report = client
        .push(&[DatasetPayload { key: DatasetKey::Leasing, rows: rows(1) }])
        .await;

    assert!(!report.success);
    assert!(report.synced.is_empty());
    let errors = report.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].dataset, "leasing");
}

#[tokio::test]
async fn large_dataset_is_chunked_with_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/leasing/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_report("units", 4)))
        .expect(3)
        .mount(&server)
        .await;

    let data = rows(10);
    let client = PushClient::new(&server.uri(), fast_options(4)).unwrap();
    let report = client
        .push(&[DatasetPayload { key: DatasetKey::Units, rows: data.clone() }])
        .await;
    assert!(report.success);
    assert_eq!(report.synced.len(), 3);

    let requests = server.received_requests().await.unwrap();
    let flag = |i: usize, name: &str| header(&requests[i], name);
    assert_eq!(flag(0, HEADER_FIRST_CHUNK).as_deref(), Some("true"));
    assert_eq!(flag(1, HEADER_FIRST_CHUNK).as_deref(), Some("false"));
    assert_eq!(flag(2, HEADER_LAST_CHUNK).as_deref(), Some("true"));
    assert_eq!(flag(0, HEADER_TOTAL_ROWS), None);
    assert_eq!(flag(2, HEADER_TOTAL_ROWS).as_deref(), Some("10"));
    assert_eq!(flag(2, HEADER_DATA_HASH), Some(data_hash(&data)));

    let last: Value = requests[2].body_json().unwrap();
    assert_eq!(last["units"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn failed_chunk_aborts_only_that_dataset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/leasing/sync"))
        .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/leasing/sync"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_report("pricing", 1)))
        .mount(&server)
        .await;

    let client = PushClient::new(&server.uri(), fast_options(2)).unwrap();
    let report = client
        .push(&[
            DatasetPayload { key: DatasetKey::Units, rows: rows(5) },
            DatasetPayload { key: DatasetKey::Pricing, rows: rows(1) },
        ])
        .await;

    assert!(!report.success);
    let errors = report.errors.unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].dataset, "units");
    assert!(errors[0].message.contains("500"));
    // units aborted after its first chunk, pricing went through
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}
