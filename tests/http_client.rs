use std::time::Duration;

use auth_loadtest::client::{ApiRequest, AuthApi, Credentials, Endpoint, HttpAuthClient};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpAuthClient {
    HttpAuthClient::new(server.uri(), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_login_posts_json_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/json"))
        .and(header_exists("user-agent"))
        .and(body_json(json!({
            "email": "loadtest+1+1@example.com",
            "password": "Password123!"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": {"email": "loadtest+1+1@example.com"},
            "tokens": {"access_token": "a", "refresh_token": "r-0123456789"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client_for(&server)
        .call(ApiRequest::Login(Credentials::new(
            "loadtest+1+1@example.com",
            "Password123!",
        )))
        .await;

    assert_eq!(resp.endpoint, Endpoint::Login);
    assert_eq!(resp.status, 200);
    assert!(resp.error.is_none());
    assert_eq!(
        resp.json_str("/tokens/refresh_token").as_deref(),
        Some("r-0123456789")
    );
}

#[tokio::test]
async fn test_probes_use_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ready"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let health = client.call(ApiRequest::Health).await;
    let ready = client.call(ApiRequest::Ready).await;

    assert_eq!(health.status, 200);
    assert_eq!(health.body, "ok");
    assert_eq!(ready.status, 503);
}

#[tokio::test]
async fn test_trailing_slash_in_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpAuthClient::new(format!("{}/", server.uri()), Duration::from_secs(5)).unwrap();
    assert_eq!(client.call(ApiRequest::Health).await.status, 200);
}

#[tokio::test]
async fn test_logout_without_token_sends_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client_for(&server)
        .call(ApiRequest::Logout {
            refresh_token: None,
        })
        .await;
    assert_eq!(resp.status, 400);
}

#[tokio::test]
async fn test_unreachable_server_reports_status_zero() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpAuthClient::new(format!("http://{addr}"), Duration::from_secs(2)).unwrap();
    let resp = client.call(ApiRequest::Health).await;

    assert_eq!(resp.status, 0);
    assert!(resp.error.is_some());
    assert!(resp.body.is_empty());
}

#[tokio::test]
async fn test_timeout_reports_status_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ready"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = HttpAuthClient::new(server.uri(), Duration::from_millis(100)).unwrap();
    let resp = client.call(ApiRequest::Ready).await;

    assert_eq!(resp.status, 0);
    assert!(resp.error.is_some());
}
