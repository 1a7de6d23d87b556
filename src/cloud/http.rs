//! HTTP utilities for OpenStack REST API calls

use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use uuid::Uuid;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

const AUTH_TOKEN_HEADER: &str = "x-auth-token";
const REQUEST_ID_HEADER: &str = "x-openstack-request-id";
const API_VERSION_HEADER: &str = "openstack-api-version";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Pull the human readable message out of an OpenStack fault body.
/// Faults look like `{"itemNotFound": {"message": "...", "code": 404}}`.
fn fault_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.as_object()?
                .values()
                .find_map(|f| f.get("message").and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| sanitize_for_log(body))
}

/// Per-request options that differ between plain CRUD calls and actions
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions<'a> {
    /// Send an empty `Accept` header (actions may reply with no body)
    pub no_accept: bool,
    /// `OpenStack-API-Version` value, e.g. `shared-file-system 2.65`
    pub api_version: Option<&'a str>,
}

/// HTTP client wrapper for OpenStack API calls
#[derive(Clone)]
pub struct CloudHttpClient {
    client: Client,
}

impl CloudHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tstack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport {
                context: "Failed to create HTTP client".to_string(),
                source: e,
            })?;

        Ok(Self { client })
    }

    fn headers(token: Option<&str>, options: RequestOptions<'_>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let request_id = format!("req-{}", Uuid::new_v4());
        headers.insert(
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderValue::from_str(&request_id)
                .map_err(|e| Error::validation(REQUEST_ID_HEADER, e.to_string()))?,
        );
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(token)
                .map_err(|_| Error::Config("auth token contains invalid characters".to_string()))?;
            value.set_sensitive(true);
            headers.insert(HeaderName::from_static(AUTH_TOKEN_HEADER), value);
        }
        if let Some(version) = options.api_version {
            headers.insert(
                HeaderName::from_static(API_VERSION_HEADER),
                HeaderValue::from_str(version)
                    .map_err(|e| Error::Config(format!("invalid microversion: {}", e)))?,
            );
        }
        if options.no_accept {
            headers.insert(ACCEPT, HeaderValue::from_static(""));
        }
        Ok(headers)
    }

    /// Issue a request and decode the JSON reply.
    /// An empty reply body decodes to `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
        options: RequestOptions<'_>,
    ) -> Result<Value> {
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), url)
            .headers(Self::headers(token, options)?);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| Error::Transport {
            context: format!("Failed to send {} {}", method, url),
            source: e,
        })?;

        let status = response.status();
        let response_body = response.text().await.map_err(|e| Error::Transport {
            context: "Failed to read response body".to_string(),
            source: e,
        })?;

        if status == StatusCode::NOT_FOUND {
            tracing::debug!("{} {} -> 404", method, url);
            return Err(Error::NotFound {
                resource: url.to_string(),
                id: String::new(),
            });
        }

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(Error::Api {
                status,
                message: fault_message(&response_body),
            });
        }

        if response_body.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&response_body)?)
    }

    /// Make a GET request
    pub async fn get(&self, url: &str, token: Option<&str>, options: RequestOptions<'_>) -> Result<Value> {
        self.send(Method::GET, url, token, None, options).await
    }

    /// Make a POST request
    pub async fn post(
        &self,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
        options: RequestOptions<'_>,
    ) -> Result<Value> {
        self.send(Method::POST, url, token, body, options).await
    }

    /// Make a PUT request
    pub async fn put(
        &self,
        url: &str,
        token: Option<&str>,
        body: Option<&Value>,
        options: RequestOptions<'_>,
    ) -> Result<Value> {
        self.send(Method::PUT, url, token, body, options).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str, token: Option<&str>, options: RequestOptions<'_>) -> Result<Value> {
        self.send(Method::DELETE, url, token, None, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let out = sanitize_for_log(&body);
        assert!(out.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(out.contains("500 bytes total"));
    }

    #[test]
    fn test_fault_message_extracts_nested_message() {
        let body = r#"{"itemNotFound": {"message": "Share abc could not be found.", "code": 404}}"#;
        assert_eq!(fault_message(body), "Share abc could not be found.");
    }

    #[test]
    fn test_fault_message_falls_back_to_body() {
        assert_eq!(fault_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_headers_mark_token_sensitive() {
        let headers = CloudHttpClient::headers(Some("secret"), RequestOptions::default()).unwrap();
        let token = headers.get(AUTH_TOKEN_HEADER).unwrap();
        assert!(token.is_sensitive());
        assert!(headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("req-")));
        assert!(headers.get(ACCEPT).is_none());
    }

    #[test]
    fn test_headers_for_action_send_empty_accept() {
        let options = RequestOptions {
            no_accept: true,
            api_version: Some("shared-file-system 2.65"),
        };
        let headers = CloudHttpClient::headers(None, options).unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), "");
        assert_eq!(headers.get(API_VERSION_HEADER).unwrap(), "shared-file-system 2.65");
        assert!(headers.get(AUTH_TOKEN_HEADER).is_none());
    }
}
