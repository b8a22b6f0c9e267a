//! Event Service Client
//!
//! Used by the booking workflow to read an event's remaining tickets and to
//! apply the decrement once a booking has been stored.

use async_trait::async_trait;
use reqwest::StatusCode;
use tb_common::{ErrorBody, EventEnvelope, EventView, UpdateTicketsRequest};
use tracing::debug;

use crate::error::{PlatformError, Result};
use crate::service::remote::{self, RemoteServiceConfig, ServiceCredentials};

pub const EVENT_SERVICE: &str = "event-service";

#[async_trait]
pub trait EventServiceClient: Send + Sync {
    async fn fetch_event(&self, event_id: &str) -> Result<EventView>;

    /// Remaining tickets. A pure read.
    async fn fetch_availability(&self, event_id: &str) -> Result<i64> {
        Ok(self.fetch_event(event_id).await?.ticket_availability)
    }

    /// Subtract `tickets`. The event side re-checks availability and answers
    /// with `InsufficientAvailability` when too few remain.
    async fn apply_decrement(&self, event_id: &str, tickets: i64) -> Result<EventView>;
}

pub struct HttpEventServiceClient {
    config: RemoteServiceConfig,
    credentials: ServiceCredentials,
    client: reqwest::Client,
}

impl HttpEventServiceClient {
    pub fn new(config: RemoteServiceConfig, credentials: ServiceCredentials) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self { config, credentials, client })
    }
}

#[async_trait]
impl EventServiceClient for HttpEventServiceClient {
    async fn fetch_event(&self, event_id: &str) -> Result<EventView> {
        let url = self.config.endpoint(&["api", "events", event_id])?;
        debug!(url = %url, "Fetching event");

        let request = self.credentials.authorize(self.client.get(url))?;
        let response = remote::send(EVENT_SERVICE, "fetch_event", request).await?;

        let status = response.status();
        if status.is_success() {
            let event = remote::decode::<EventView>(EVENT_SERVICE, response).await?;
            remote::record_call(EVENT_SERVICE, "fetch_event", "ok");
            return Ok(event);
        }

        let body = remote::read_error_body(response).await;
        remote::record_call(EVENT_SERVICE, "fetch_event", "error");
        Err(remote::classify_failure(EVENT_SERVICE, "Event", event_id, status, body.as_ref()))
    }

    async fn apply_decrement(&self, event_id: &str, tickets: i64) -> Result<EventView> {
        let url = self.config.endpoint(&["api", "events", "updateTickets"])?;
        let payload = UpdateTicketsRequest {
            event_id: Some(event_id.to_string()),
            tickets: Some(tickets),
        };
        debug!(url = %url, tickets, "Applying ticket decrement");

        let request = self.credentials.authorize(self.client.patch(url).json(&payload))?;
        let response = remote::send(EVENT_SERVICE, "apply_decrement", request).await?;

        let status = response.status();
        if status.is_success() {
            let envelope = remote::decode::<EventEnvelope>(EVENT_SERVICE, response).await?;
            remote::record_call(EVENT_SERVICE, "apply_decrement", "ok");
            return Ok(envelope.event);
        }

        let body = remote::read_error_body(response).await;
        remote::record_call(EVENT_SERVICE, "apply_decrement", "error");

        if status == StatusCode::BAD_REQUEST && body.as_ref().is_some_and(is_insufficient) {
            return Err(PlatformError::InsufficientAvailability {
                event_id: event_id.to_string(),
                requested: tickets,
                available: None,
            });
        }
        Err(remote::classify_failure(EVENT_SERVICE, "Event", event_id, status, body.as_ref()))
    }
}

fn is_insufficient(body: &ErrorBody) -> bool {
    body.error.as_deref() == Some("INSUFFICIENT_AVAILABILITY")
        || body.message.starts_with("not enough tickets available")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::auth::{AuthConfig, AuthService};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpEventServiceClient {
        let auth = Arc::new(AuthService::new(AuthConfig::new("secret")));
        let config = RemoteServiceConfig::new(server.uri())
            .with_timeouts(Duration::from_millis(500), Duration::from_millis(300));
        HttpEventServiceClient::new(config, ServiceCredentials::new(auth, "ticket-service")).unwrap()
    }

    fn event_json(availability: i64) -> serde_json::Value {
        json!({
            "id": "e1",
            "name": "RustConf",
            "location": "Montreal",
            "date": "2025-09-01T00:00:00Z",
            "ticketAvailability": availability
        })
    }

    #[tokio::test]
    async fn test_fetch_availability_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events/e1"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(event_json(5)))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server);
        assert_eq!(client.fetch_availability("e1").await.unwrap(), 5);
        assert_eq!(client.fetch_availability("e1").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_fetch_unknown_event_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "event not found"})))
            .mount(&server)
            .await;

        let err = client(&server).fetch_availability("missing").await.unwrap_err();
        assert!(matches!(err, PlatformError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_server_error_and_timeout_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events/e500"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/events/slow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(event_json(5)).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = client(&server);
        let err = client.fetch_event("e500").await.unwrap_err();
        assert!(matches!(err, PlatformError::RemoteUnavailable { .. }));

        let err = client.fetch_event("slow").await.unwrap_err();
        assert!(matches!(err, PlatformError::RemoteUnavailable { .. }));
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_reserved_characters_do_not_reach_another_event() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/events/e1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(event_json(5)))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server);
        for id in ["e1?", "e1#x", "zzz/../e1"] {
            let err = client.fetch_availability(id).await.unwrap_err();
            assert!(matches!(err, PlatformError::NotFound { .. }), "id {:?} gave {:?}", id, err);
        }

        let err = client.fetch_availability("..").await.unwrap_err();
        assert!(matches!(err, PlatformError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_apply_decrement() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/events/updateTickets"))
            .and(body_json(json!({"eventId": "e1", "tickets": 3})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"message": "ticket availability updated", "event": event_json(2)})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let event = client(&server).apply_decrement("e1", 3).await.unwrap();
        assert_eq!(event.ticket_availability, 2);
    }

    #[tokio::test]
    async fn test_decrement_rejected_by_event_side() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/events/updateTickets"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "message": "not enough tickets available",
                "error": "INSUFFICIENT_AVAILABILITY"
            })))
            .mount(&server)
            .await;

        let err = client(&server).apply_decrement("e1", 3).await.unwrap_err();
        assert!(matches!(err, PlatformError::InsufficientAvailability { requested: 3, .. }));
    }
}
