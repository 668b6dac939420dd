//! JSON-over-HTTP transport
//!
//! Thin wrapper around two shared `reqwest` clients. Requests to private or
//! loopback hosts bypass any configured proxy and accept self-signed TLS
//! certificates; everything else goes through the default client.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

static PRIVATE_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:localhost|127\.0\.0\.1|10\..*|192\.168\..*|172\.(?:1[6-9]|2\d|3[0-1])\..*)$")
        .expect("private host pattern is valid")
});

/// Errors produced by the JSON transport
#[derive(Error, Debug)]
pub enum HttpError {
    /// Server answered with a non-success status
    #[error("HTTP {code} {reason} from {url}\n{body}")]
    Status {
        /// Numeric status code
        code: u16,
        /// Canonical reason phrase
        reason: String,
        /// Requested URL
        url: String,
        /// Response body (may be empty)
        body: String,
    },

    /// Request did not complete before its deadline
    #[error("Request to {url} timed out")]
    Timeout {
        /// Requested URL
        url: String,
    },

    /// Connection-level failure (DNS, refused, TLS...)
    #[error("Network error calling {url}: {message}")]
    Network {
        /// Requested URL
        url: String,
        /// Underlying error text
        message: String,
    },

    /// Client could not be constructed
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl HttpError {
    /// True when the failure looks like a deadline problem
    ///
    /// Gateways often report upstream timeouts as a 5xx with a body that
    /// mentions it, so the rendered text is inspected as well.
    pub fn is_timeout_like(&self) -> bool {
        if matches!(self, HttpError::Timeout { .. }) {
            return true;
        }
        let text = self.to_string().to_lowercase();
        text.contains("timed out") || text.contains("timeout") || text.contains("deadline")
    }

    fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HttpError::Timeout {
                url: url.to_string(),
            }
        } else {
            HttpError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Returns true when `url` points at localhost or an RFC 1918 address
pub fn is_private_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| PRIVATE_HOST.is_match(h)))
        .unwrap_or(false)
}

/// Shared JSON client
#[derive(Clone)]
pub struct HttpClient {
    public: reqwest::Client,
    private: reqwest::Client,
}

impl HttpClient {
    /// Build the public and private clients
    ///
    /// # Errors
    /// * Returns `HttpError::Client` if the TLS backend cannot be initialised
    pub fn new() -> Result<Self, HttpError> {
        let public = reqwest::Client::builder()
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;
        let private = reqwest::Client::builder()
            .no_proxy()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;
        Ok(Self { public, private })
    }

    fn client_for(&self, url: &str) -> &reqwest::Client {
        if is_private_url(url) {
            &self.private
        } else {
            &self.public
        }
    }

    /// POST a JSON payload and decode the JSON answer
    ///
    /// # Arguments
    /// * `url` - Target URL
    /// * `payload` - Request body
    /// * `bearer` - Optional bearer token for the `Authorization` header
    /// * `timeout` - Whole-request deadline
    ///
    /// # Returns
    /// * `Ok(Value)` - Decoded body, or `{"_raw": body}` when it is not JSON
    /// * `Err(HttpError)` - Transport failure or non-success status
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        payload: &T,
        bearer: Option<&str>,
        timeout: Duration,
    ) -> Result<Value, HttpError> {
        let mut request = self
            .client_for(url)
            .post(url)
            .json(payload)
            .timeout(timeout);
        if let Some(token) = bearer.filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }
        tracing::debug!(url = %url, timeout_secs = timeout.as_secs(), "POST json");
        let response = request
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(url, e))?;
        Self::decode(url, response).await
    }

    /// GET a JSON document
    ///
    /// Same conventions as [`HttpClient::post_json`].
    pub async fn get_json(
        &self,
        url: &str,
        bearer: Option<&str>,
        timeout: Duration,
    ) -> Result<Value, HttpError> {
        let mut request = self.client_for(url).get(url).timeout(timeout);
        if let Some(token) = bearer.filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }
        tracing::debug!(url = %url, timeout_secs = timeout.as_secs(), "GET json");
        let response = request
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(url, e))?;
        Self::decode(url, response).await
    }

    async fn decode(url: &str, response: reqwest::Response) -> Result<Value, HttpError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(
                url = %url,
                status_code = status.as_u16(),
                error_body = %body,
                "Request returned error status"
            );
            return Err(HttpError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
                url: url.to_string(),
                body,
            });
        }

        let raw = response
            .text()
            .await
            .map_err(|e| HttpError::from_reqwest(url, e))?;
        Ok(serde_json::from_str(&raw).unwrap_or_else(|_| json!({ "_raw": raw })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[test]
    fn test_private_hosts() {
        assert!(is_private_url("http://localhost:1234/v1"));
        assert!(is_private_url("http://127.0.0.1/search"));
        assert!(is_private_url("https://10.0.0.5/v1"));
        assert!(is_private_url("http://192.168.1.20:8000/search"));
        assert!(is_private_url("http://172.16.0.1/"));
        assert!(is_private_url("http://172.31.255.1/"));
        assert!(!is_private_url("http://172.32.0.1/"));
        assert!(!is_private_url("https://api.openai.com/v1"));
        assert!(!is_private_url("not a url"));
    }

    #[test]
    fn test_status_error_rendering() {
        let err = HttpError::Status {
            code: 400,
            reason: "Bad Request".to_string(),
            url: "http://x/chat/completions".to_string(),
            body: "{\"error\":1}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "HTTP 400 Bad Request from http://x/chat/completions\n{\"error\":1}"
        );
        assert!(!err.is_timeout_like());
    }

    #[test]
    fn test_timeout_like_detection() {
        let timeout = HttpError::Timeout {
            url: "http://x".to_string(),
        };
        assert!(timeout.is_timeout_like());

        let gateway = HttpError::Status {
            code: 504,
            reason: "Gateway Timeout".to_string(),
            url: "http://x".to_string(),
            body: String::new(),
        };
        assert!(gateway.is_timeout_like());

        let deadline = HttpError::Network {
            url: "http://x".to_string(),
            message: "deadline has elapsed".to_string(),
        };
        assert!(deadline.is_timeout_like());
    }

    #[tokio::test]
    async fn test_post_json_sends_bearer_and_decodes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJsonString(r#"{"query":"kerning"}"#.to_string()))
            .with_status(200)
            .with_body(r#"{"results":[]}"#)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let url = format!("{}/search", server.url());
        let value = client
            .post_json(
                &url,
                &json!({"query": "kerning", "top_k": 5}),
                Some("secret"),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(value["results"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_json_body_is_wrapped() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/models")
            .with_status(200)
            .with_body("plain text")
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let value = client
            .get_json(&format!("{}/models", server.url()), None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(value["_raw"], "plain text");
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/models")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;

        let client = HttpClient::new().unwrap();
        let err = client
            .get_json(&format!("{}/models", server.url()), None, Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            HttpError::Status { code, body, .. } => {
                assert_eq!(code, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("Expected Status error, got: {:?}", other),
        }
    }
}
