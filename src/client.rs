//! HTTP client for the content-understanding analysis service.
//!
//! The service's analyze API is asynchronous by design: a submit returns an
//! operation-tracking URL in its headers, and the caller polls that URL
//! until the operation reports a terminal status. This client hides the
//! submit/poll dance behind two calls while handing the raw terminal JSON
//! back to the caller, since the fields schema is analyzer-specific and not
//! validated here. Analyzer provisioning (delete + recreate + poll) rides
//! the same plumbing.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use snafu::prelude::*;
use tracing::{debug, info};
use url::Url;

use crate::error::{
    BodyDecodeSnafu, ClientError, ConfigError, EmptyApiVersionSnafu, EmptyEndpointSnafu,
    HttpClientSnafu, HttpSnafu, InvalidEndpointSnafu, JobFailedSnafu,
    MissingOperationLocationSnafu, ProvisioningFailedSnafu, RequestSnafu, TimeoutSnafu,
};

/// User agent tag sent with every service request.
const CLIENT_USER_AGENT: &str = concat!("flurry/", env!("CARGO_PKG_VERSION"));

/// Transport-level timeout per request; polling budgets are separate.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Produces a bearer token on demand.
///
/// Implemented by anything that can mint a token at request time; a plain
/// closure works: `Credentials::token(|| session.token())`.
pub trait TokenSource: Send + Sync {
    fn fetch(&self) -> String;
}

impl<F> TokenSource for F
where
    F: Fn() -> String + Send + Sync,
{
    fn fetch(&self) -> String {
        self()
    }
}

/// How requests authenticate: a static subscription key or a token source.
pub enum Credentials {
    /// Sent as `Ocp-Apim-Subscription-Key`.
    SubscriptionKey(SecretString),
    /// Fetched per request and sent as `Authorization: Bearer`.
    Token(Arc<dyn TokenSource>),
}

impl Credentials {
    /// Wrap a static subscription key.
    pub fn subscription_key(key: impl Into<String>) -> Self {
        Self::SubscriptionKey(SecretString::from(key.into()))
    }

    /// Wrap a token source.
    pub fn token(source: impl TokenSource + 'static) -> Self {
        Self::Token(Arc::new(source))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::SubscriptionKey(_) => write!(f, "Credentials::SubscriptionKey([REDACTED])"),
            Credentials::Token(_) => write!(f, "Credentials::Token(..)"),
        }
    }
}

/// What gets submitted for analysis.
///
/// The shape picks the wire form: bytes go out as an octet stream, URLs as
/// a JSON reference. Nothing here inspects paths on disk.
#[derive(Debug, Clone)]
pub enum AnalyzeSource {
    Bytes(Bytes),
    Url(String),
}

/// Handle for a submitted asynchronous operation.
#[derive(Debug, Clone)]
pub struct AnalysisOperation {
    operation_url: String,
}

impl AnalysisOperation {
    /// URL of the status resource this operation is polled at.
    pub fn url(&self) -> &str {
        &self.operation_url
    }
}

/// Parsed `status` field of a poll response, matched case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationStatus {
    Succeeded,
    Failed,
    /// Running, notStarted, missing: anything non-terminal.
    Pending,
}

fn operation_status(body: &Value) -> OperationStatus {
    match body
        .get("status")
        .and_then(Value::as_str)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("succeeded") => OperationStatus::Succeeded,
        Some("failed") => OperationStatus::Failed,
        _ => OperationStatus::Pending,
    }
}

/// Client for the analyze and analyzer-management endpoints.
///
/// Each run constructs its own client; there is no shared state between
/// jobs beyond the underlying connection pool.
pub struct AnalysisClient {
    http: reqwest::Client,
    endpoint: String,
    api_version: String,
    credentials: Credentials,
}

impl std::fmt::Debug for AnalysisClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisClient")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl AnalysisClient {
    /// Create a client for `endpoint` at `api_version`.
    ///
    /// Fails fast on an empty or unparseable endpoint or an empty API
    /// version; credential presence is enforced by the `Credentials` type.
    pub fn new(
        endpoint: &str,
        api_version: &str,
        credentials: Credentials,
    ) -> Result<Self, ConfigError> {
        ensure!(!endpoint.trim().is_empty(), EmptyEndpointSnafu);
        Url::parse(endpoint).context(InvalidEndpointSnafu { endpoint })?;
        ensure!(!api_version.trim().is_empty(), EmptyApiVersionSnafu);

        let mut headers = HeaderMap::new();
        headers.insert("x-ms-useragent", HeaderValue::from_static(CLIENT_USER_AGENT));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context(HttpClientSnafu)?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            credentials,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Credentials::SubscriptionKey(key) => {
                request.header("Ocp-Apim-Subscription-Key", key.expose_secret())
            }
            Credentials::Token(source) => request.bearer_auth(source.fetch()),
        }
    }

    fn analyze_url(&self, analyzer_id: &str) -> String {
        format!(
            "{}/contentunderstanding/analyzers/{}:analyze?api-version={}&stringEncoding=utf16",
            self.endpoint, analyzer_id, self.api_version
        )
    }

    fn analyzer_url(&self, analyzer_id: &str) -> String {
        format!(
            "{}/contentunderstanding/analyzers/{}?api-version={}",
            self.endpoint, analyzer_id, self.api_version
        )
    }

    /// Submit a payload for analysis.
    ///
    /// Non-2xx responses surface as [`ClientError::Http`]; nothing is
    /// retried. The returned handle carries the operation-tracking URL from
    /// the `Operation-Location` header (matched case-insensitively); a
    /// missing header is a protocol error, never silently ignored.
    pub async fn begin_analyze(
        &self,
        analyzer_id: &str,
        source: AnalyzeSource,
    ) -> Result<AnalysisOperation, ClientError> {
        let url = self.analyze_url(analyzer_id);
        let request = match source {
            AnalyzeSource::Bytes(data) => self
                .http
                .post(&url)
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(data),
            AnalyzeSource::Url(remote) => {
                self.http.post(&url).json(&serde_json::json!({ "url": remote }))
            }
        };

        let response = self
            .authorize(request)
            .send()
            .await
            .context(RequestSnafu { url: &url })?;
        let response = Self::checked("analyze", response).await?;

        info!("Submitted analysis to analyzer {analyzer_id}");
        Self::operation_from(&response, "analyze")
    }

    /// Poll an operation until terminal status or the wall-clock budget
    /// runs out.
    ///
    /// Each iteration checks elapsed time first, so once the budget is
    /// exceeded no further request goes out. `succeeded` returns the full
    /// response body; `failed` is terminal and carries the body; any other
    /// status sleeps `interval` and polls again. Constant interval, no
    /// iteration cap beyond the wall clock.
    pub async fn poll_result(
        &self,
        operation: &AnalysisOperation,
        timeout: Duration,
        interval: Duration,
    ) -> Result<Value, ClientError> {
        let started = tokio::time::Instant::now();

        loop {
            let elapsed = started.elapsed();
            ensure!(elapsed <= timeout, TimeoutSnafu { budget: timeout });

            let body = self.fetch_status(operation).await?;
            match operation_status(&body) {
                OperationStatus::Succeeded => {
                    info!("Operation completed after {:.2}s", elapsed.as_secs_f64());
                    return Ok(body);
                }
                OperationStatus::Failed => return JobFailedSnafu { body }.fail(),
                OperationStatus::Pending => {
                    debug!(
                        "Operation still in progress after {:.2}s",
                        elapsed.as_secs_f64()
                    );
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }

    /// Delete an analyzer, ignoring failure.
    ///
    /// Deleting one that does not exist is the expected first half of
    /// delete-then-create.
    pub async fn delete_analyzer(&self, analyzer_id: &str) {
        let url = self.analyzer_url(analyzer_id);
        match self.authorize(self.http.delete(&url)).send().await {
            Ok(response) => debug!("Delete analyzer {analyzer_id}: HTTP {}", response.status()),
            Err(err) => debug!("Delete analyzer {analyzer_id} failed: {err}"),
        }
    }

    /// Create an analyzer from its schema document.
    ///
    /// Returns the provisioning operation handle from the response headers.
    pub async fn create_analyzer(
        &self,
        analyzer_id: &str,
        schema: &Value,
    ) -> Result<AnalysisOperation, ClientError> {
        let url = self.analyzer_url(analyzer_id);
        let response = self
            .authorize(self.http.put(&url).json(schema))
            .send()
            .await
            .context(RequestSnafu { url: &url })?;
        let response = Self::checked("create analyzer", response).await?;

        info!("Creation of analyzer {analyzer_id} accepted");
        Self::operation_from(&response, "create analyzer")
    }

    /// Poll a provisioning operation until it leaves `running`.
    ///
    /// No timeout: provisioning is bounded by the operator, not the client.
    /// `succeeded` returns the body; any other settled status is a failure
    /// carrying the full diagnostic body.
    pub async fn wait_for_provisioning(
        &self,
        operation: &AnalysisOperation,
        interval: Duration,
    ) -> Result<Value, ClientError> {
        loop {
            let body = self.fetch_status(operation).await?;
            match body
                .get("status")
                .and_then(Value::as_str)
                .map(str::to_ascii_lowercase)
                .as_deref()
            {
                Some("running") => {
                    debug!("Analyzer provisioning still running");
                    tokio::time::sleep(interval).await;
                }
                Some("succeeded") => return Ok(body),
                _ => return ProvisioningFailedSnafu { body }.fail(),
            }
        }
    }

    /// GET the operation's status resource and decode its JSON body.
    async fn fetch_status(&self, operation: &AnalysisOperation) -> Result<Value, ClientError> {
        let url = operation.url();
        let response = self
            .authorize(self.http.get(url))
            .send()
            .await
            .context(RequestSnafu { url })?;
        let response = Self::checked("status poll", response).await?;
        response.json().await.context(BodyDecodeSnafu { url })
    }

    /// Turn a non-2xx response into an `Http` error carrying the body.
    async fn checked(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        HttpSnafu {
            operation,
            status: status.as_u16(),
            body,
        }
        .fail()
    }

    /// Read the operation-tracking URL off a submit response.
    fn operation_from(
        response: &reqwest::Response,
        operation: &'static str,
    ) -> Result<AnalysisOperation, ClientError> {
        let header = response
            .headers()
            .get("operation-location")
            .and_then(|value| value.to_str().ok())
            .context(MissingOperationLocationSnafu { operation })?;

        Ok(AnalysisOperation {
            operation_url: header.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_status_is_case_insensitive() {
        let succeeded = serde_json::json!({"status": "Succeeded"});
        let failed = serde_json::json!({"status": "FAILED"});
        let running = serde_json::json!({"status": "running"});
        let not_started = serde_json::json!({"status": "notStarted"});
        let missing = serde_json::json!({});

        assert_eq!(operation_status(&succeeded), OperationStatus::Succeeded);
        assert_eq!(operation_status(&failed), OperationStatus::Failed);
        assert_eq!(operation_status(&running), OperationStatus::Pending);
        assert_eq!(operation_status(&not_started), OperationStatus::Pending);
        assert_eq!(operation_status(&missing), OperationStatus::Pending);
    }

    #[test]
    fn test_new_rejects_empty_endpoint() {
        let err = AnalysisClient::new("", "2025-05-01-preview", Credentials::subscription_key("k"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyEndpoint));
    }

    #[test]
    fn test_new_rejects_invalid_endpoint() {
        let err = AnalysisClient::new(
            "not a url",
            "2025-05-01-preview",
            Credentials::subscription_key("k"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEndpoint { .. }));
    }

    #[test]
    fn test_new_rejects_empty_api_version() {
        let err = AnalysisClient::new(
            "https://example.com",
            "  ",
            Credentials::subscription_key("k"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyApiVersion));
    }

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let client = AnalysisClient::new(
            "https://example.com/",
            "v1",
            Credentials::subscription_key("k"),
        )
        .unwrap();
        assert_eq!(
            client.analyze_url("cards"),
            "https://example.com/contentunderstanding/analyzers/cards:analyze\
             ?api-version=v1&stringEncoding=utf16"
        );
        assert_eq!(
            client.analyzer_url("cards"),
            "https://example.com/contentunderstanding/analyzers/cards?api-version=v1"
        );
    }

    #[test]
    fn test_credentials_debug_redacts_key() {
        let creds = Credentials::subscription_key("super-secret");
        let debug = format!("{creds:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }
}
