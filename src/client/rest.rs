// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP/JSON operations client.
//!
//! Operation and resource names are resolved against
//! `{base_url}/{api_version}/`. Names that are already absolute URLs (for
//! example a `selfLink`) are used as given.

use super::{ExtendedOperationService, OperationsService, ResourceGetter};
use crate::error::{LroError, Result};
use crate::operation::{ExtendedOperation, Operation};
use crate::runtime::LOG_TARGET;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct RestOperationsClient {
    inner: reqwest::Client,
    base_url: String,
    api_version: String,
    access_token: Option<String>,
    quota_project: Option<String>,
    request_timeout: Option<Duration>,
}

impl RestOperationsClient {
    /// Create a client for `base_url`, e.g. `https://run.googleapis.com`.
    pub fn new(base_url: impl Into<String>, api_version: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let inner = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| LroError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            inner,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_version: api_version.into().trim_matches('/').to_string(),
            access_token: None,
            quota_project: None,
            request_timeout: Some(Duration::from_secs(60)),
        })
    }

    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_quota_project(mut self, project: impl Into<String>) -> Self {
        self.quota_project = Some(project.into());
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Full URL for an operation or resource name.
    #[must_use]
    pub fn url(&self, name: &str) -> String {
        if name.starts_with("https://") || name.starts_with("http://") {
            return name.to_string();
        }
        let name = name.trim_start_matches('/');
        if self.api_version.is_empty() {
            format!("{}/{}", self.base_url, name)
        } else {
            format!("{}/{}/{}", self.base_url, self.api_version, name)
        }
    }

    async fn send(&self, mut request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }
        if let Some(project) = &self.quota_project {
            request = request.header("x-goog-user-project", project);
        }
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(LroError::Http {
            status: status.as_u16(),
            message: error_message(&body, status),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let url = self.url(name);
        tracing::trace!(target: LOG_TARGET, url = %url, "GET");

        let body = self.send(self.inner.get(&url)).await?.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| LroError::Decode(format!("Invalid response from [{url}]: {e}")))
    }
}

impl fmt::Debug for RestOperationsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestOperationsClient")
            .field("base_url", &self.base_url)
            .field("api_version", &self.api_version)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("quota_project", &self.quota_project)
            .finish_non_exhaustive()
    }
}

/// `{"error": {"code": 404, "message": "...", "status": "NOT_FOUND"}}`
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

fn error_message(body: &str, status: reqwest::StatusCode) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if !envelope.error.message.is_empty() {
            return envelope.error.message;
        }
    }
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body.to_string()
    }
}

#[async_trait]
impl OperationsService for RestOperationsClient {
    async fn get_operation(&self, name: &str) -> Result<Operation> {
        self.get_json(name).await
    }

    async fn cancel_operation(&self, name: &str) -> Result<()> {
        let url = format!("{}:cancel", self.url(name));
        tracing::debug!(target: LOG_TARGET, url = %url, "POST");
        self.send(self.inner.post(&url).body("{}")).await?;
        Ok(())
    }

    async fn delete_operation(&self, name: &str) -> Result<()> {
        let url = self.url(name);
        tracing::debug!(target: LOG_TARGET, url = %url, "DELETE");
        self.send(self.inner.delete(&url)).await?;
        Ok(())
    }
}

#[async_trait]
impl ResourceGetter for RestOperationsClient {
    type Resource = Value;

    async fn get(&self, name: &str) -> Result<Value> {
        self.get_json(name).await
    }
}

#[async_trait]
impl ExtendedOperationService for RestOperationsClient {
    async fn get_extended_operation(&self, name: &str) -> Result<ExtendedOperation> {
        self.get_json(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationStatus;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (MockServer, RestOperationsClient) {
        let server = MockServer::start().await;
        let client = RestOperationsClient::new(server.uri(), "v1").unwrap();
        (server, client)
    }

    #[test]
    fn test_url_building() {
        let client = RestOperationsClient::new("https://run.googleapis.com/", "/v2").unwrap();
        assert_eq!(
            client.url("projects/p/locations/l/operations/o"),
            "https://run.googleapis.com/v2/projects/p/locations/l/operations/o"
        );
        assert_eq!(
            client.url("https://compute.example.com/v1/projects/p/zones/z/operations/o"),
            "https://compute.example.com/v1/projects/p/zones/z/operations/o"
        );

        let unversioned = RestOperationsClient::new("https://example.com", "").unwrap();
        assert_eq!(unversioned.url("/operations/o"), "https://example.com/operations/o");
    }

    #[test]
    fn test_error_message_prefers_envelope() {
        let body = r#"{"error": {"code": 404, "message": "Operation not found", "status": "NOT_FOUND"}}"#;
        assert_eq!(
            error_message(body, reqwest::StatusCode::NOT_FOUND),
            "Operation not found"
        );
        assert_eq!(
            error_message("", reqwest::StatusCode::SERVICE_UNAVAILABLE),
            "Service Unavailable"
        );
        assert_eq!(
            error_message("upstream reset", reqwest::StatusCode::BAD_GATEWAY),
            "upstream reset"
        );
    }

    #[tokio::test]
    async fn test_get_operation_sends_credentials() {
        let (server, client) = setup().await;
        let client = client
            .with_access_token("ya29.token")
            .with_quota_project("billing");

        Mock::given(method("GET"))
            .and(path("/v1/projects/p/locations/l/operations/op-1"))
            .and(header("authorization", "Bearer ya29.token"))
            .and(header("x-goog-user-project", "billing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/p/locations/l/operations/op-1",
                "metadata": {"verb": "create"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let op = client
            .get_operation("projects/p/locations/l/operations/op-1")
            .await
            .unwrap();
        assert!(!op.is_done());
        assert_eq!(op.status_detail(), Some("create"));
    }

    #[tokio::test]
    async fn test_not_found_maps_to_http_error() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path("/v1/operations/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "Operation missing not found", "status": "NOT_FOUND"}
            })))
            .mount(&server)
            .await;

        let err = client.get_operation("operations/missing").await.unwrap_err();
        assert!(err.is_not_found());
        match err {
            LroError::Http { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "Operation missing not found");
            }
            other => panic!("Expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_body_is_decode_error() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path("/v1/operations/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client.get_operation("operations/garbled").await.unwrap_err();
        assert!(matches!(err, LroError::Decode(_)));
    }

    #[tokio::test]
    async fn test_cancel_and_delete() {
        let (server, client) = setup().await;

        Mock::given(method("POST"))
            .and(path("/v1/operations/op-1:cancel"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/v1/operations/op-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        client.cancel_operation("operations/op-1").await.unwrap();
        client.delete_operation("operations/op-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_get_resource_and_extended_operation() {
        let (server, client) = setup().await;

        Mock::given(method("GET"))
            .and(path("/v1/projects/p/buckets/b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "b"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/p/zones/z/operations/operation-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "operation-1",
                "status": "RUNNING",
                "progress": 30
            })))
            .mount(&server)
            .await;

        let bucket = client.get("projects/p/buckets/b").await.unwrap();
        assert_eq!(bucket["name"], "b");

        let op = client
            .get_extended_operation("projects/p/zones/z/operations/operation-1")
            .await
            .unwrap();
        assert_eq!(op.status, OperationStatus::Running);
        assert_eq!(op.progress, Some(30));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = RestOperationsClient::new("https://example.com", "v1")
            .unwrap()
            .with_access_token("secret");
        assert!(!format!("{client:?}").contains("secret"));
    }
}
