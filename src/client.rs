use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use strum::{AsRefStr, Display};
use tracing::debug;

use crate::error::Result;

/// Endpoints of the authentication API exercised by the scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Endpoint {
    Health,
    Ready,
    Register,
    Login,
    Refresh,
    Logout,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Health => "/health",
            Endpoint::Ready => "/ready",
            Endpoint::Register => "/register",
            Endpoint::Login => "/login",
            Endpoint::Refresh => "/refresh",
            Endpoint::Logout => "/logout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// One call against the API, with its JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    Health,
    Ready,
    Register(Credentials),
    Login(Credentials),
    Refresh { refresh_token: String },
    /// A missing token is sent as `{}`, the way a JSON encoder drops an
    /// undefined field.
    Logout { refresh_token: Option<String> },
}

#[derive(Serialize)]
struct TokenPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

impl ApiRequest {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            ApiRequest::Health => Endpoint::Health,
            ApiRequest::Ready => Endpoint::Ready,
            ApiRequest::Register(_) => Endpoint::Register,
            ApiRequest::Login(_) => Endpoint::Login,
            ApiRequest::Refresh { .. } => Endpoint::Refresh,
            ApiRequest::Logout { .. } => Endpoint::Logout,
        }
    }

    /// JSON body for POST requests, `None` for GET probes.
    pub fn body(&self) -> Option<Value> {
        let payload = match self {
            ApiRequest::Health | ApiRequest::Ready => return None,
            ApiRequest::Register(credentials) | ApiRequest::Login(credentials) => {
                serde_json::to_value(credentials)
            }
            ApiRequest::Refresh { refresh_token } => serde_json::to_value(TokenPayload {
                refresh_token: Some(refresh_token.as_str()),
            }),
            ApiRequest::Logout { refresh_token } => serde_json::to_value(TokenPayload {
                refresh_token: refresh_token.as_deref(),
            }),
        };
        // Serializing plain string fields cannot fail.
        payload.ok()
    }
}

/// Outcome of a single HTTP call.
///
/// Transport failures (refused connection, timeout) are not errors: they
/// come back with `status == 0` and the cause in `error`, and count as
/// failed requests.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub endpoint: Endpoint,
    pub status: u16,
    pub body: String,
    pub latency: Duration,
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn new(endpoint: Endpoint, status: u16, body: impl Into<String>, latency: Duration) -> Self {
        Self {
            endpoint,
            status,
            body: body.into(),
            latency,
            error: None,
        }
    }

    pub fn transport_error(endpoint: Endpoint, latency: Duration, error: impl Into<String>) -> Self {
        Self {
            endpoint,
            status: 0,
            body: String::new(),
            latency,
            error: Some(error.into()),
        }
    }

    /// Body parsed as JSON, `None` when empty or malformed.
    pub fn json(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }

    /// String found at a JSON pointer such as `/tokens/refresh_token`.
    pub fn json_str(&self, pointer: &str) -> Option<String> {
        self.json()?
            .pointer(pointer)
            .and_then(Value::as_str)
            .map(str::to_owned)
    }
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn call(&self, request: ApiRequest) -> ApiResponse;
}

/// `AuthApi` over HTTP with a shared connection pool.
#[derive(Clone)]
pub struct HttpAuthClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("auth-loadtest/", env!("CARGO_PKG_VERSION"))),
        );
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint.path())
    }
}

#[async_trait]
impl AuthApi for HttpAuthClient {
    async fn call(&self, request: ApiRequest) -> ApiResponse {
        let endpoint = request.endpoint();
        let url = self.url_for(endpoint);
        let builder = match request.body() {
            Some(body) => self.client.post(url).json(&body),
            None => self.client.get(url),
        };

        let start = Instant::now();
        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!(%endpoint, error = %e, "request failed");
                return ApiResponse::transport_error(endpoint, start.elapsed(), e.to_string());
            }
        };

        let status = resp.status().as_u16();
        match resp.text().await {
            Ok(body) => ApiResponse::new(endpoint, status, body, start.elapsed()),
            Err(e) => {
                debug!(%endpoint, status, error = %e, "response body read failed");
                ApiResponse {
                    error: Some(e.to_string()),
                    ..ApiResponse::new(endpoint, status, String::new(), start.elapsed())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_paths_and_names() {
        assert_eq!(Endpoint::Login.path(), "/login");
        assert_eq!(Endpoint::Ready.path(), "/ready");
        assert_eq!(Endpoint::Refresh.to_string(), "refresh");
        assert_eq!(Endpoint::Health.as_ref(), "health");
    }

    #[test]
    fn test_request_bodies() {
        let creds = Credentials::new("a@example.com", "Password123!");
        assert_eq!(ApiRequest::Health.body(), None);
        assert_eq!(
            ApiRequest::Login(creds).body(),
            Some(json!({"email": "a@example.com", "password": "Password123!"}))
        );
        assert_eq!(
            ApiRequest::Refresh {
                refresh_token: "abcdefghijk".into()
            }
            .body(),
            Some(json!({"refresh_token": "abcdefghijk"}))
        );
    }

    #[test]
    fn test_logout_without_token_sends_empty_object() {
        let body = ApiRequest::Logout {
            refresh_token: None,
        }
        .body();
        assert_eq!(body, Some(json!({})));
    }

    #[test]
    fn test_json_pointer_extraction() {
        let resp = ApiResponse::new(
            Endpoint::Login,
            200,
            r#"{"tokens":{"refresh_token":"abcdefghijk","access_token":"x"}}"#,
            Duration::from_millis(3),
        );
        assert_eq!(
            resp.json_str("/tokens/refresh_token").as_deref(),
            Some("abcdefghijk")
        );
        assert_eq!(resp.json_str("/refresh_token"), None);
    }

    #[test]
    fn test_json_pointer_ignores_non_strings_and_bad_bodies() {
        let numeric = ApiResponse::new(
            Endpoint::Refresh,
            200,
            r#"{"refresh_token":12345678901}"#,
            Duration::ZERO,
        );
        assert_eq!(numeric.json_str("/refresh_token"), None);

        let garbage = ApiResponse::new(Endpoint::Refresh, 200, "<html>", Duration::ZERO);
        assert!(garbage.json().is_none());
    }

    #[test]
    fn test_transport_error_has_status_zero() {
        let resp = ApiResponse::transport_error(
            Endpoint::Health,
            Duration::from_millis(1),
            "connection refused",
        );
        assert_eq!(resp.status, 0);
        assert_eq!(resp.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_url_join_tolerates_trailing_slash() {
        let client = HttpAuthClient::new("http://127.0.0.1:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url_for(Endpoint::Logout), "http://127.0.0.1:8080/logout");
    }
}
