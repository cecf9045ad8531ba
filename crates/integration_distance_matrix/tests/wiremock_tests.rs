//! Integration tests for the Distance Matrix client (wiremock-based)

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use integration_distance_matrix::{
    DistanceMatrixClient, DistanceMatrixConfig, DistanceMatrixError, DistanceMatrixQuery,
    DistanceMatrixService, ElementStatus, Language, Location, OutcomeKind, RequestState,
    RetryConfig, TopLevelStatus, TravelMode,
};

const ENDPOINT: &str = "/maps/api/distancematrix/json";

fn config_for_mock(base_url: &str) -> DistanceMatrixConfig {
    DistanceMatrixConfig {
        base_url: base_url.to_string(),
        ..DistanceMatrixConfig::for_testing()
    }
}

const fn two_by_one_json() -> &'static str {
    r#"{
        "status": "OK",
        "origin_addresses": ["Alexanderplatz, 10178 Berlin, Germany", "Potsdam, Germany"],
        "destination_addresses": ["Leipzig, Germany"],
        "rows": [
            {
                "elements": [{
                    "status": "OK",
                    "distance": { "value": 191000, "text": "191 km" },
                    "duration": { "value": 7140, "text": "1 hour 59 mins" }
                }]
            },
            {
                "elements": [{
                    "status": "OK",
                    "distance": { "value": 168000, "text": "168 km" },
                    "duration": { "value": 6300, "text": "1 hour 45 mins" }
                }]
            }
        ]
    }"#
}

const fn one_by_one_json() -> &'static str {
    r#"{
        "status": "OK",
        "origin_addresses": ["Berlin, Germany"],
        "destination_addresses": ["Leipzig, Germany"],
        "rows": [{
            "elements": [{
                "status": "OK",
                "distance": { "value": 191000, "text": "191 km" },
                "duration": { "value": 7140, "text": "1 hour 59 mins" }
            }]
        }]
    }"#
}

fn simple_query() -> DistanceMatrixQuery {
    DistanceMatrixQuery::new(["Berlin, Germany"], ["Leipzig, Germany"])
}

#[tokio::test]
async fn test_two_origins_one_destination_driving() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("origins", "52.52,13.41|Potsdam, Germany"))
        .and(query_param("destinations", "Leipzig, Germany"))
        .and(query_param("mode", "driving"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(two_by_one_json()))
        .expect(1)
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let query = DistanceMatrixQuery::new(
        [Location::coords(52.52, 13.41), Location::address("Potsdam, Germany")],
        ["Leipzig, Germany"],
    )
    .with_mode(TravelMode::Driving);

    let pending = client.submit(&query).unwrap();
    let response = pending.response().await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.json.status, TopLevelStatus::Ok);
    assert_eq!(response.json.rows.len(), 2);
    assert!(response.json.rows.iter().all(|row| row.elements.len() == 1));
    assert_eq!(response.json.element(1, 0).unwrap().distance_meters(), Some(168_000));
    assert_eq!(response.json.element(0, 0).unwrap().status, ElementStatus::Ok);
    assert_eq!(pending.state(), RequestState::Delivered);
}

#[tokio::test]
async fn test_response_headers_are_exposed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Request-Id", "abc-123")
                .set_body_string(one_by_one_json()),
        )
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let response = client.distance_matrix(simple_query()).await.unwrap();

    assert_eq!(response.header("x-request-id"), Some("abc-123"));
    assert_eq!(response.header("X-Request-Id"), Some("abc-123"));
}

#[tokio::test]
async fn test_request_denied_is_status_outcome() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid.", "rows": []}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let err = client.distance_matrix(simple_query()).await.unwrap_err();

    assert_eq!(err.kind(), OutcomeKind::Status);
    let envelope = err.response().unwrap();
    assert_eq!(envelope.status, 200);
    assert_eq!(envelope.json.status, TopLevelStatus::RequestDenied);
    assert!(err.to_string().contains("The provided API key is invalid."));
}

#[tokio::test]
async fn test_over_query_limit_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"status": "OVER_QUERY_LIMIT", "rows": []}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let err = client.distance_matrix(simple_query()).await.unwrap_err();
    assert_eq!(
        err.response().map(|r| r.json.status),
        Some(TopLevelStatus::OverQueryLimit)
    );
}

#[tokio::test]
async fn test_transient_503_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string(one_by_one_json()))
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let response = client.distance_matrix(simple_query()).await.unwrap();

    assert_eq!(response.json.status, TopLevelStatus::Ok);
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn test_transient_failure_twice_gives_up() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let err = client.distance_matrix(simple_query()).await.unwrap_err();

    assert!(matches!(
        err,
        DistanceMatrixError::ServiceUnavailable { status: 500 }
    ));
    assert_eq!(err.kind(), OutcomeKind::Transport);
}

#[tokio::test]
async fn test_non_transient_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .expect(1)
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let err = client.distance_matrix(simple_query()).await.unwrap_err();
    assert!(matches!(err, DistanceMatrixError::RequestFailed(ref m) if m == "HTTP 403"));
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let err = client.distance_matrix(simple_query()).await.unwrap_err();
    assert!(matches!(err, DistanceMatrixError::ParseError(_)));
}

#[tokio::test]
async fn test_slow_response_times_out_without_retry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(one_by_one_json())
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = DistanceMatrixConfig {
        timeout_ms: 100,
        ..config_for_mock(&server.uri())
    };
    let client = DistanceMatrixClient::new(&config).unwrap();
    let err = client.distance_matrix(simple_query()).await.unwrap_err();

    assert!(matches!(err, DistanceMatrixError::Timeout { timeout_ms: 100 }));
    assert_eq!(err.kind(), OutcomeKind::Timeout);
}

#[tokio::test]
async fn test_arrival_and_departure_rejected_before_transmission() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(one_by_one_json()))
        .expect(0)
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let query = simple_query()
        .with_arrival_time(1_770_796_800_i64)
        .with_departure_time(1_770_796_800_i64);

    let err = client.submit(&query).unwrap_err();
    assert!(matches!(err, DistanceMatrixError::InvalidQuery(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_callback_and_finally_on_completion() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string(one_by_one_json()))
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let completions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completions);
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();

    let pending = client
        .submit_with_callback(&simple_query(), move |outcome| {
            assert!(outcome.is_ok());
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    pending.finally(move || {
        let _ = done_tx.send(());
    });

    let from_future = pending.response().await.unwrap();
    done_rx.await.unwrap();

    assert_eq!(from_future.json.element_count(), 1);
    assert_eq!(completions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancel_suppresses_callback_and_runs_finally_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(one_by_one_json())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let completions = Arc::new(AtomicUsize::new(0));
    let cleanups = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&completions);
    let pending = client
        .submit_with_callback(&simple_query(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let cleanup_counter = Arc::clone(&cleanups);
    pending.finally(move || {
        cleanup_counter.fetch_add(1, Ordering::SeqCst);
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(pending.cancel());

    let settled = tokio::time::timeout(Duration::from_millis(600), pending.response()).await;
    assert!(settled.is_err(), "response future must not settle after cancel");

    assert_eq!(pending.state(), RequestState::Cancelled);
    assert_eq!(completions.load(Ordering::SeqCst), 0);
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_client_id_mode_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("client", "gme-acme"))
        .and(query_param("channel", "fleet"))
        .and(query_param_is_missing("key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(one_by_one_json()))
        .expect(1)
        .mount(&server)
        .await;

    let config = DistanceMatrixConfig {
        base_url: server.uri(),
        channel: Some("fleet".to_string()),
        retry: RetryConfig::disabled(),
        ..DistanceMatrixConfig::with_client_credentials("gme-acme", "private-key")
    };
    let client = DistanceMatrixClient::new(&config).unwrap();
    assert!(client.distance_matrix(simple_query()).await.is_ok());
}

#[tokio::test]
async fn test_default_language_and_override() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("language", "de"))
        .respond_with(ResponseTemplate::new(200).set_body_string(one_by_one_json()))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .and(query_param("language", "fr"))
        .respond_with(ResponseTemplate::new(200).set_body_string(one_by_one_json()))
        .expect(1)
        .mount(&server)
        .await;

    let config = DistanceMatrixConfig {
        language: Some(Language::new("de").unwrap()),
        ..config_for_mock(&server.uri())
    };
    let client = DistanceMatrixClient::new(&config).unwrap();

    assert!(client.distance_matrix(simple_query()).await.is_ok());
    let french = simple_query().with_language(Language::new("fr").unwrap());
    assert!(client.distance_matrix(french).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_submissions_are_independent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string(one_by_one_json()))
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    let pending: Vec<_> = (0..5)
        .map(|_| client.submit(&simple_query()).unwrap())
        .collect();

    pending[2].cancel();
    let mut delivered = 0;
    for (i, request) in pending.iter().enumerate() {
        if i == 2 {
            continue;
        }
        assert!(request.response().await.is_ok());
        delivered += 1;
    }
    assert_eq!(delivered, 4);
    assert_eq!(pending[2].state(), RequestState::Cancelled);
}

#[tokio::test]
async fn test_health_check() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"status": "INVALID_REQUEST", "rows": []}"#),
        )
        .mount(&server)
        .await;

    let client = DistanceMatrixClient::new(&config_for_mock(&server.uri())).unwrap();
    assert!(client.is_healthy().await);
}
