//! End-to-end tests against a local mock server.

use courier_cache::InMemoryCache;
use courier_http_client::middleware::{CacheMiddleware, CookieMiddleware, LoggingMiddleware};
use courier_http_client::{HttpClient, HttpClientConfig, ManualClock, RetryConfig, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(server: &MockServer) -> HttpClientConfig {
    HttpClientConfig::builder()
        .base_url(format!("{}/client/v4/", server.uri()))
        .bearer_token("t0k3n")
        .build()
        .unwrap()
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

#[tokio::test]
async fn test_get_sends_query_and_auth() {
    init_tracing();
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/client/v4/zones"))
        .and(query_param("name", "example.com"))
        .and(query_param("page", "2"))
        .and(header("accept", "application/json"))
        .and(header("authorization", "Bearer t0k3n"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"id": "z1", "name": "example.com"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(config(&server))
        .unwrap()
        .with_middleware(LoggingMiddleware::new());

    let zones: Vec<Zone> = client
        .get("/zones")
        .data("name", "example.com")
        .data("page", 2)
        .send_json()
        .await
        .unwrap();

    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].id, "z1");
    assert_eq!(zones[0].name, "example.com");
}

#[tokio::test]
async fn test_post_sends_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/zones"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"name": "example.com", "jump_start": true})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "z2", "name": "example.com"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(config(&server)).unwrap();
    let zone: Zone = client
        .post_json("zones", &json!({"name": "example.com", "jump_start": true}))
        .await
        .unwrap();

    assert_eq!(zone.id, "z2");
}

#[tokio::test]
async fn test_form_params_are_url_encoded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/login"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("user=ada&pass=x%26y"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(config(&server)).unwrap();
    let response = client
        .post("/login")
        .form(&json!({"user": "ada", "pass": "x&y"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_retry_exhausts_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/client/v4/flaky"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .expect(3)
        .mount(&server)
        .await;

    let config = HttpClientConfig {
        retry: Some(RetryConfig::exponential(3, Duration::from_millis(100))),
        ..config(&server)
    };
    let clock = ManualClock::new();
    let client = HttpClient::new(config)
        .unwrap()
        .with_clock(Arc::new(clock.clone()));

    let err = client.get("/flaky").send().await.unwrap_err();

    assert_eq!(err.status_code(), Some(503));
    assert_eq!(clock.total_slept(), Duration::from_millis(300));
}

#[tokio::test]
async fn test_retry_recovers() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/client/v4/flaky"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/client/v4/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let config = HttpClientConfig {
        retry: Some(RetryConfig::constant(3, Duration::from_millis(250))),
        ..config(&server)
    };
    let client = HttpClient::new(config)
        .unwrap()
        .with_clock(Arc::new(ManualClock::new()));

    let response = client.get("/flaky").send().await.unwrap();
    assert_eq!(response.text().unwrap(), "ok");
}

#[tokio::test]
async fn test_client_error_keeps_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/client/v4/zones/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"success":false}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::new(HttpClientConfig {
        retry: Some(RetryConfig::default()),
        ..config(&server)
    })
    .unwrap();

    let err = client.delete("/zones/missing").send().await.unwrap_err();
    assert!(err.is_status());
    assert_eq!(err.status_code(), Some(404));
    match err {
        courier_http_client::HttpClientError::Response { body, reason, .. } => {
            assert_eq!(body, r#"{"success":false}"#);
            assert_eq!(reason, "Not Found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/client/v4/broken"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let client = HttpClient::new(config(&server)).unwrap();
    let err = client
        .get_json::<serde_json::Value>("/broken")
        .await
        .unwrap_err();
    assert!(err.is_decode());
}

#[tokio::test]
async fn test_timeout_is_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/client/v4/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = HttpClient::new(HttpClientConfig {
        timeout: Duration::from_millis(100),
        ..config(&server)
    })
    .unwrap();

    let err = client.get("/slow").send().await.unwrap_err();
    assert!(err.is_transport());
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_cookies_round_trip() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/client/v4/session"))
        .respond_with(
            ResponseTemplate::new(200).append_header("set-cookie", "session=abc123; Path=/; HttpOnly"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/client/v4/me"))
        .and(header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let cookies = CookieMiddleware::new();
    let jar = cookies.cookie_jar().clone();
    let client = HttpClient::new(config(&server)).unwrap().with_middleware(cookies);

    client.post("/session").send().await.unwrap();
    client.get("/me").send().await.unwrap();

    assert_eq!(jar.len(), 1);
    assert!(jar.all()[0].is_http_only());
}

#[tokio::test]
async fn test_cached_response_skips_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/client/v4/settings"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("cache-control", "max-age=60")
                .set_body_json(json!({"theme": "dark"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCache::new());
    let client = HttpClient::new(config(&server))
        .unwrap()
        .with_middleware(CacheMiddleware::new(store.clone()));

    let first: serde_json::Value = client.get_json("/settings").await.unwrap();
    let second: serde_json::Value = client.get_json("/settings").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second["theme"], "dark");
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    let config = HttpClientConfig::builder()
        .base_url("http://127.0.0.1:1")
        .connect_timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let client = HttpClient::new(config).unwrap();

    let err = client.get("/").send().await.unwrap_err();
    assert!(err.is_transport());
    assert!(err.status_code().is_none());
}
