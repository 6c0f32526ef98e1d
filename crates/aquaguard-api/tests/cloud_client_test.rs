#![allow(clippy::unwrap_used)]
// Integration tests for `CloudClient` and `PushClient` using wiremock.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use aquaguard_api::{CloudClient, CloudSession, Error, PropertyAddress, PushClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, CloudClient) {
    let server = MockServer::start().await;
    let client = CloudClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        "1001",
    );
    (server, client)
}

// ── Device list ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_devices() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/home/device_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "result": { "list": [
                { "did": "111", "name": "Desk lamp", "model": "yeelink.light.lamp1", "isOnline": true },
                { "did": "222", "name": "Gang switch", "model": "lumi.switch.b2", "isOnline": false }
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let devices = client.list_devices().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].did, "111");
    assert!(devices[0].is_online);
    assert!(!devices[1].is_online);
}

#[tokio::test]
async fn test_envelope_error_code() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/home/device_list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": -8, "message": "invalid signature"
        })))
        .mount(&server)
        .await;

    let err = client.list_devices().await.unwrap_err();
    assert!(
        matches!(err, Error::Cloud { code: -8, .. }),
        "expected Cloud error, got: {err:?}"
    );
}

#[tokio::test]
async fn test_unauthorized_maps_to_not_authenticated() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/home/device_list"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client.list_devices().await.unwrap_err();
    assert!(matches!(err, Error::NotAuthenticated));
    assert!(err.is_auth());
}

// ── Properties ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_read_property() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/miotspec/prop/get"))
        .and(body_partial_json(json!({ "params": [{ "did": "222", "siid": 3, "piid": 1 }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "",
            "result": [{ "did": "222", "siid": 3, "piid": 1, "code": 0, "value": true }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let value = client.read_property("222", PropertyAddress::new(3, 1)).await.unwrap();
    assert_eq!(value, json!(true));
}

#[tokio::test]
async fn test_read_property_item_error() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/miotspec/prop/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "result": [{ "did": "222", "siid": 9, "piid": 1, "code": -704042011 }]
        })))
        .mount(&server)
        .await;

    let err = client.read_property("222", PropertyAddress::new(9, 1)).await.unwrap_err();
    assert!(matches!(err, Error::Cloud { code: -704_042_011, .. }));
}

#[tokio::test]
async fn test_write_property_success_codes() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/miotspec/prop/set"))
        .and(body_partial_json(json!({ "params": [{ "did": "222", "siid": 2, "piid": 1, "value": false }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "成功",
            "result": [{ "did": "222", "siid": 2, "piid": 1, "code": 1 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client
        .write_property("222", PropertyAddress::new(2, 1), &json!(false))
        .await
        .unwrap();
    assert_eq!(outcome.code, 1);
    assert!(outcome.is_success());
}

#[tokio::test]
async fn test_write_property_rejected() {
    let (server, client) = setup().await;
    Mock::given(method("POST"))
        .and(path("/miotspec/prop/set"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "result": [{ "code": 1 }]
        })))
        .mount(&server)
        .await;

    let outcome = client
        .write_property("222", PropertyAddress::new(2, 1), &json!(true))
        .await
        .unwrap();
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn test_session_cookie_is_sent() {
    let server = MockServer::start().await;
    let session =
        CloudSession::from_json(r#"{"userId": "1001", "ssecurity": "s", "serviceToken": "tok"}"#).unwrap();
    let client = CloudClient::new(
        Url::parse(&server.uri()).unwrap(),
        &session,
        &TransportConfig::cloud(),
    )
    .unwrap();

    Mock::given(method("POST"))
        .and(path("/home/device_list"))
        .and(header(
            "cookie",
            "userId=1001; serviceToken=tok; yetAnotherServiceToken=tok",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0, "result": { "list": [] }
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.list_devices().await.unwrap().is_empty());
}

// ── Push ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_push_send_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_partial_json(json!({
            "token": "abc",
            "title": "Heads up",
            "content": "Heads up",
            "template": "txt"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 200, "msg": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = PushClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());
    let token: secrecy::SecretString = "abc".to_string().into();
    assert!(client.send(&token, "Heads up", "").await.unwrap());
}

#[tokio::test]
async fn test_push_send_rejected_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "code": 903, "msg": "invalid token" })))
        .mount(&server)
        .await;

    let client = PushClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());
    let token: secrecy::SecretString = "bad".to_string().into();
    assert!(!client.send(&token, "t", "body").await.unwrap());
}
