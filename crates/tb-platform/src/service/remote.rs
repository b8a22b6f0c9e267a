//! Shared plumbing for service-to-service HTTP calls

use std::sync::Arc;
use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, Url};
use tb_common::ErrorBody;
use tb_config::RemoteSettings;
use tracing::warn;

use crate::error::{PlatformError, Result};
use crate::service::auth::AuthService;
use crate::service::authorization::ADMIN_ROLE;

#[derive(Debug, Clone)]
pub struct RemoteServiceConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl RemoteServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeouts(mut self, connect_timeout: Duration, request_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self.request_timeout = request_timeout;
        self
    }

    pub fn event_service(settings: &RemoteSettings) -> Self {
        Self::new(&settings.event_service_url)
            .with_timeouts(settings.connect_timeout(), settings.request_timeout())
    }

    pub fn attendee_service(settings: &RemoteSettings) -> Self {
        Self::new(&settings.attendee_service_url)
            .with_timeouts(settings.connect_timeout(), settings.request_timeout())
    }

    /// Base URL extended with `segments`, each percent-encoded as a single
    /// path segment. `.`, `..` and empty segments are rejected.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(PlatformError::validation(format!("invalid identifier '{}'", bad)));
        }

        let mut url = Url::parse(&self.base_url)
            .map_err(|e| PlatformError::internal(format!("Invalid base URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| PlatformError::internal(format!("Base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) fn build_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| PlatformError::internal(format!("Failed to build HTTP client: {}", e)))
    }
}

/// Mints the bearer token a service presents to its peers
#[derive(Clone)]
pub struct ServiceCredentials {
    auth: Arc<AuthService>,
    service_name: String,
}

impl ServiceCredentials {
    pub fn new(auth: Arc<AuthService>, service_name: impl Into<String>) -> Self {
        Self {
            auth,
            service_name: service_name.into(),
        }
    }

    pub(crate) fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.auth.issue_token(&self.service_name, ADMIN_ROLE)?;
        Ok(request.bearer_auth(token))
    }
}

/// Send a request, turning transport failures and timeouts into `RemoteUnavailable`
pub(crate) async fn send(service: &'static str, operation: &'static str, request: RequestBuilder) -> Result<Response> {
    match request.send().await {
        Ok(response) => Ok(response),
        Err(e) => {
            record_call(service, operation, "unavailable");
            let reason = if e.is_timeout() { "timed out".to_string() } else { e.to_string() };
            warn!(service, operation, error = %reason, "Remote call failed");
            Err(PlatformError::remote_unavailable(service, reason))
        }
    }
}

/// Map a non-2xx response onto the error taxonomy.
///
/// 404 becomes `NotFound` for the requested entity, 5xx and unexpected codes
/// become `RemoteUnavailable`, 400 keeps the peer's message as a validation
/// error. Callers that understand more specific 400s check the body first.
pub(crate) fn classify_failure(
    service: &'static str,
    entity_type: &str,
    id: &str,
    status: StatusCode,
    body: Option<&ErrorBody>,
) -> PlatformError {
    let message = body
        .map(|b| b.message.clone())
        .unwrap_or_else(|| status.to_string());

    match status {
        StatusCode::NOT_FOUND => PlatformError::not_found(entity_type, id),
        StatusCode::BAD_REQUEST => PlatformError::validation(format!("{} rejected request: {}", service, message)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PlatformError::internal(format!("{} rejected service credentials: {}", service, message))
        }
        _ => PlatformError::remote_unavailable(service, format!("HTTP {}: {}", status.as_u16(), message)),
    }
}

/// Read an error body, tolerating peers that answer with non-JSON
pub(crate) async fn read_error_body(response: Response) -> Option<ErrorBody> {
    let text = response.text().await.ok()?;
    serde_json::from_str(&text).ok()
}

/// Decode a 2xx JSON body; a malformed body is a peer failure
pub(crate) async fn decode<T: serde::de::DeserializeOwned>(service: &'static str, response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| PlatformError::remote_unavailable(service, format!("malformed response: {}", e)))
}

pub(crate) fn record_call(target: &'static str, operation: &'static str, outcome: &'static str) {
    metrics::counter!(
        "tb_remote_calls_total",
        "target" => target,
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}
