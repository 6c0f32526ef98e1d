#![allow(clippy::unwrap_used)]
// Integration tests for the sensor and light node clients using wiremock.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aquaguard_api::{LightClient, LightMode, Scene, SensorClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn light() -> (MockServer, LightClient) {
    let server = MockServer::start().await;
    let client = LightClient::new(&server.uri(), &TransportConfig::default()).unwrap();
    (server, client)
}

async fn ack(server: &MockServer, route: &str, success: bool) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": success })))
        .mount(server)
        .await;
}

// ── Sensor ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_sensor_status_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "system": { "uptime": 3600, "wifi_signal": -61 },
            "sensors": { "temperature": 24.5, "tds_value": 180, "water_level": 1, "alert_flag": false }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SensorClient::new(&server.uri(), &TransportConfig::default()).unwrap();
    let reading = client.get_status().await.unwrap();

    assert!((reading.temperature - 24.5).abs() < f64::EPSILON);
    assert_eq!(reading.tds_value, 180);
    assert_eq!(reading.wifi_signal, -61);
    assert_eq!(reading.uptime, 3600);
}

#[tokio::test]
async fn test_sensor_partial_body_uses_defaults() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sensors": { "tds_value": 42 } })))
        .mount(&server)
        .await;

    let client = SensorClient::new(&server.uri(), &TransportConfig::default()).unwrap();
    let reading = client.get_status().await.unwrap();
    assert_eq!(reading.tds_value, 42);
    assert_eq!(reading.water_level, 1);
}

#[tokio::test]
async fn test_sensor_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = SensorClient::new(&server.uri(), &TransportConfig::default()).unwrap();
    let err = client.get_status().await.unwrap_err();
    assert!(
        matches!(err, aquaguard_api::Error::Http { status: 500, .. }),
        "expected Http 500, got: {err:?}"
    );
}

#[tokio::test]
async fn test_slow_node_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let transport = TransportConfig::default().with_timeout(Duration::from_millis(50));
    let client = SensorClient::new(&server.uri(), &transport).unwrap();
    let err = client.get_status().await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got: {err:?}");
}

#[tokio::test]
async fn test_unreachable_node_is_connect_error() {
    // Nothing listens on port 9 of localhost in the test environment.
    let client = SensorClient::new("127.0.0.1:9", &TransportConfig::default()).unwrap();
    let err = client.get_status().await.unwrap_err();
    assert!(err.is_transient(), "expected transient error, got: {err:?}");
}

// ── Light ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_light_status() {
    let (server, client) = light().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "power": "on",
            "mode": "rainbow",
            "color": { "r": 10, "g": 20, "b": 30 },
            "wifi_signal": -50
        })))
        .mount(&server)
        .await;

    let status = client.get_status().await.unwrap();
    assert!(status.is_on());
    assert_eq!(status.mode, "rainbow");
    assert_eq!((status.color_r, status.color_g, status.color_b), (10, 20, 30));
}

#[tokio::test]
async fn test_set_power_uses_bare_routes() {
    let (server, client) = light().await;
    Mock::given(method("GET"))
        .and(path("/on"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/off"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.set_power(true).await.unwrap());
    assert!(!client.set_power(false).await.unwrap());
}

#[tokio::test]
async fn test_set_color_sends_components() {
    let (server, client) = light().await;
    Mock::given(method("GET"))
        .and(path("/color"))
        .and(query_param("r", "255"))
        .and(query_param("g", "0"))
        .and(query_param("b", "128"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.set_color(255, 0, 128).await.unwrap());
}

#[tokio::test]
async fn test_set_mode_reports_ack() {
    let (server, client) = light().await;
    Mock::given(method("GET"))
        .and(path("/mode"))
        .and(query_param("type", "breath"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": false })))
        .mount(&server)
        .await;

    assert!(!client.set_mode(LightMode::Breath).await.unwrap());
}

#[tokio::test]
async fn test_moonlight_scene_sets_colour_then_mode() {
    let (server, client) = light().await;
    Mock::given(method("GET"))
        .and(path("/color"))
        .and(query_param("r", "30"))
        .and(query_param("g", "50"))
        .and(query_param("b", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mode"))
        .and(query_param("type", "static"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.apply_scene(Scene::Moonlight).await.unwrap());
}

#[tokio::test]
async fn test_scene_stops_after_failed_step() {
    let (server, client) = light().await;
    ack(&server, "/color", false).await;
    Mock::given(method("GET"))
        .and(path("/mode"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(0)
        .mount(&server)
        .await;

    assert!(!client.apply_scene(Scene::Daylight).await.unwrap());
}

#[tokio::test]
async fn test_aurora_scene_is_rainbow() {
    let (server, client) = light().await;
    Mock::given(method("GET"))
        .and(path("/mode"))
        .and(query_param("type", "rainbow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.apply_scene(Scene::Aurora).await.unwrap());
}
