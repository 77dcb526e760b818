//! Integration tests for WeatherApiClient using wiremock.

use raincheck_core::{FetchError, WeatherApiClient, WeatherClient};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn current_body(name: &str, temp_f: f64) -> serde_json::Value {
    serde_json::json!({
        "location": { "name": name, "region": "Illinois", "country": "USA" },
        "current": {
            "temp_f": temp_f,
            "temp_c": 7.6,
            "condition": { "text": "Partly cloudy", "icon": "//cdn/x.png", "code": 1003 },
            "humidity": 60.0,
            "uv": 3.0,
            "feelslike_f": 42.0
        }
    })
}

fn client_for(server: &MockServer, timeout: Duration) -> WeatherApiClient {
    WeatherApiClient::new("KEY".into(), format!("{}/v1", server.uri()), timeout).unwrap()
}

#[tokio::test]
async fn fetch_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .and(query_param("key", "KEY"))
        .and(query_param("q", "Chicago"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("Chicago", 45.6)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let record = client.fetch("Chicago").await.unwrap();

    assert_eq!(record.name(), "Chicago");
    assert_eq!(record.temperature_f, Some(46));
    assert_eq!(record.condition_icon_ref.as_deref(), Some("//cdn/x.png"));
    assert_eq!(record.humidity_percent, Some(60));
    assert_eq!(record.uv_index, Some(3));
    assert_eq!(record.feels_like_f, Some(42));
}

#[tokio::test]
async fn fetch_uses_resolved_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .and(query_param("q", "NYC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body("New York", 72.5)))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let record = client.fetch("NYC").await.unwrap();

    assert_eq!(record.name(), "New York");
    assert_eq!(record.temperature_f, Some(73));
}

#[tokio::test]
async fn unknown_city_is_decode_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": { "code": 1006, "message": "No matching location found." }
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let err = client.fetch("Zzqqxw123").await.unwrap_err();

    assert_eq!(err, FetchError::Decode("No matching location found.".into()));
}

#[tokio::test]
async fn server_error_without_body_is_transport_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let err = client.fetch("Chicago").await.unwrap_err();

    match err {
        FetchError::Transport(msg) => {
            assert!(msg.contains("503"), "Error should mention status: {}", msg);
            assert!(msg.contains("upstream unavailable"));
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_decode_failure() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let err = client.fetch("Chicago").await.unwrap_err();

    assert!(matches!(err, FetchError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn missing_field_is_decode_failure() {
    let mock_server = MockServer::start().await;

    let mut body = current_body("Chicago", 45.6);
    body["current"].as_object_mut().unwrap().remove("uv");

    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let err = client.fetch("Chicago").await.unwrap_err();

    match err {
        FetchError::Decode(msg) => assert!(msg.contains("uv"), "message: {msg}"),
        other => panic!("expected decode failure, got {other:?}"),
    }
}

#[tokio::test]
async fn slow_response_times_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(current_body("Chicago", 45.6))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_millis(200));
    let err = client.fetch("Chicago").await.unwrap_err();

    match err {
        FetchError::Transport(msg) => assert!(msg.contains("timed out"), "message: {msg}"),
        other => panic!("expected transport failure, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_city_never_hits_network() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&mock_server).await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let err = client.fetch("   ").await.unwrap_err();

    assert!(matches!(err, FetchError::InvalidRequest(_)));
}

#[tokio::test]
async fn connection_refused_is_transport_failure() {
    let client =
        WeatherApiClient::new("KEY".into(), "http://127.0.0.1:1/v1", Duration::from_secs(2)).unwrap();
    let err = client.fetch("Chicago").await.unwrap_err();

    match err {
        FetchError::Transport(msg) => assert!(!msg.contains("KEY"), "key leaked: {msg}"),
        other => panic!("expected transport failure, got {other:?}"),
    }
}
