//! Attendee Service Client

use async_trait::async_trait;
use tb_common::AttendeeView;
use tracing::debug;

use crate::error::{PlatformError, Result};
use crate::service::remote::{self, RemoteServiceConfig, ServiceCredentials};

pub const ATTENDEE_SERVICE: &str = "attendee-service";

#[async_trait]
pub trait AttendeeServiceClient: Send + Sync {
    async fn fetch_attendee(&self, attendee_id: &str) -> Result<AttendeeView>;

    /// Succeeds only for a known attendee whose registration flag is set
    async fn validate(&self, attendee_id: &str) -> Result<()> {
        let attendee = self.fetch_attendee(attendee_id).await?;
        if attendee.is_registered {
            Ok(())
        } else {
            Err(PlatformError::NotRegistered {
                attendee_id: attendee_id.to_string(),
            })
        }
    }
}

pub struct HttpAttendeeServiceClient {
    config: RemoteServiceConfig,
    credentials: ServiceCredentials,
    client: reqwest::Client,
}

impl HttpAttendeeServiceClient {
    pub fn new(config: RemoteServiceConfig, credentials: ServiceCredentials) -> Result<Self> {
        let client = config.build_client()?;
        Ok(Self { config, credentials, client })
    }
}

#[async_trait]
impl AttendeeServiceClient for HttpAttendeeServiceClient {
    async fn fetch_attendee(&self, attendee_id: &str) -> Result<AttendeeView> {
        let url = self.config.endpoint(&["api", "attendees", attendee_id])?;
        debug!(url = %url, "Fetching attendee");

        let request = self.credentials.authorize(self.client.get(url))?;
        let response = remote::send(ATTENDEE_SERVICE, "fetch_attendee", request).await?;

        let status = response.status();
        if status.is_success() {
            let attendee = remote::decode::<AttendeeView>(ATTENDEE_SERVICE, response).await?;
            remote::record_call(ATTENDEE_SERVICE, "fetch_attendee", "ok");
            return Ok(attendee);
        }

        let body = remote::read_error_body(response).await;
        remote::record_call(ATTENDEE_SERVICE, "fetch_attendee", "error");
        Err(remote::classify_failure(ATTENDEE_SERVICE, "Attendee", attendee_id, status, body.as_ref()))
    }
}
