//! Ticket Booking API
//!
//! Booking goes through the [`BookingOrchestrator`]. Reads expand the
//! referenced event and attendee from their owning services; a reference
//! that cannot be resolved renders as `null`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tb_common::{AttendeeView, EventView};
use tb_config::AppConfig;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::api::middleware::{Authenticated, JsonBody};
use crate::domain::{Booking, BookingRequest, PaymentInfo};
use crate::error::PlatformError;
use crate::repository::BookingRepository;
use crate::service::{
    checks, AttendeeServiceClient, AuthService, BookingOrchestrator, EventServiceClient,
    HttpAttendeeServiceClient, HttpEventServiceClient, RemoteServiceConfig, RetryPolicy,
    ServiceCredentials, StubPaymentGateway,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfoBody {
    pub amount: Option<f64>,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub attendee_id: Option<String>,
    pub event_id: Option<String>,
    pub tickets_booked: Option<i64>,
    pub payment_info: Option<PaymentInfoBody>,
}

impl From<CreateTicketRequest> for BookingRequest {
    fn from(req: CreateTicketRequest) -> Self {
        let payment = req.payment_info.unwrap_or_default();
        BookingRequest {
            attendee_id: req.attendee_id.unwrap_or_default(),
            event_id: req.event_id.unwrap_or_default(),
            tickets_booked: req.tickets_booked.unwrap_or_default(),
            payment: PaymentInfo {
                amount: payment.amount,
                transaction_id: payment.transaction_id,
            },
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdjustTicketsRequest {
    pub ticket_booking_id: Option<String>,
    pub tickets: Option<i64>,
}

/// Stored booking
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub attendee_id: String,
    pub event_id: String,
    pub tickets_booked: i64,
    pub booking_date: DateTime<Utc>,
    pub payment_reference: String,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            attendee_id: b.attendee_id,
            event_id: b.event_id,
            tickets_booked: b.tickets_booked,
            booking_date: b.booking_date,
            payment_reference: b.payment_reference,
        }
    }
}

/// Booking with its event and attendee resolved
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    #[serde(flatten)]
    pub booking: BookingResponse,
    pub event: Option<EventView>,
    pub attendee: Option<AttendeeView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookingEnvelope {
    pub message: String,
    pub ticket_booking: BookingResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdjustedEnvelope {
    pub message: String,
    pub ticket: BookingResponse,
}

#[derive(Clone)]
pub struct TicketsState {
    pub orchestrator: Arc<BookingOrchestrator>,
    pub event_client: Arc<dyn EventServiceClient>,
    pub attendee_client: Arc<dyn AttendeeServiceClient>,
}

impl TicketsState {
    /// Wire the orchestrator to HTTP clients for the event and attendee services
    pub fn from_config(
        config: &AppConfig,
        auth_service: Arc<AuthService>,
        bookings: Arc<dyn BookingRepository>,
    ) -> Result<Self, PlatformError> {
        let credentials = ServiceCredentials::new(auth_service, "ticket-service");
        let event_client: Arc<dyn EventServiceClient> = Arc::new(HttpEventServiceClient::new(
            RemoteServiceConfig::event_service(&config.remote),
            credentials.clone(),
        )?);
        let attendee_client: Arc<dyn AttendeeServiceClient> = Arc::new(HttpAttendeeServiceClient::new(
            RemoteServiceConfig::attendee_service(&config.remote),
            credentials,
        )?);

        let orchestrator = BookingOrchestrator::new(
            bookings,
            Arc::new(StubPaymentGateway::new()),
            event_client.clone(),
            attendee_client.clone(),
        )
        .with_retry(RetryPolicy::from(&config.remote.retry))
        .with_compensation(config.booking.compensation);

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            event_client,
            attendee_client,
        })
    }

    async fn expand(&self, booking: Booking) -> TicketResponse {
        let (event, attendee) = futures::join!(
            self.event_client.fetch_event(&booking.event_id),
            self.attendee_client.fetch_attendee(&booking.attendee_id),
        );
        if let Err(e) = &event {
            debug!(booking_id = %booking.id, error = %e, "Event reference not resolved");
        }
        if let Err(e) = &attendee {
            debug!(booking_id = %booking.id, error = %e, "Attendee reference not resolved");
        }

        TicketResponse {
            booking: booking.into(),
            event: event.ok(),
            attendee: attendee.ok(),
        }
    }
}

/// Book tickets
#[utoipa::path(
    post,
    path = "/api/tickets",
    tag = "tickets",
    request_body = CreateTicketRequest,
    responses(
        (status = 201, description = "Ticket booked", body = BookingEnvelope),
        (status = 400, description = "Invalid request, payment failed, not enough tickets or attendee not registered", body = tb_common::ErrorBody),
        (status = 404, description = "Event or attendee not found", body = tb_common::ErrorBody),
        (status = 500, description = "Booking stored but not completed", body = tb_common::ErrorBody),
        (status = 502, description = "A peer service is unavailable", body = tb_common::ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_ticket(
    State(state): State<TicketsState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<CreateTicketRequest>,
) -> Result<(StatusCode, Json<BookingEnvelope>), PlatformError> {
    checks::require_admin(&auth.0)?;

    let booking = state.orchestrator.book_ticket(req.into()).await?;
    info!(booking_id = %booking.id, caller = %auth.0.username, "Ticket booked");

    Ok((
        StatusCode::CREATED,
        Json(BookingEnvelope {
            message: "ticket successfully booked".to_string(),
            ticket_booking: booking.into(),
        }),
    ))
}

/// Get a booking with its event and attendee
#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    tag = "tickets",
    params(("id" = String, Path, description = "Ticket booking ID")),
    responses(
        (status = 200, description = "Booking found", body = TicketResponse),
        (status = 404, description = "Booking not found", body = tb_common::ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_ticket(
    State(state): State<TicketsState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<TicketResponse>, PlatformError> {
    let booking = state.orchestrator.find_booking(&id).await?;
    Ok(Json(state.expand(booking).await))
}

/// List bookings with their events and attendees
#[utoipa::path(
    get,
    path = "/api/tickets",
    tag = "tickets",
    responses(
        (status = 200, description = "All bookings", body = Vec<TicketResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_tickets(
    State(state): State<TicketsState>,
    _auth: Authenticated,
) -> Result<Json<Vec<TicketResponse>>, PlatformError> {
    let bookings = state.orchestrator.list_bookings().await?;
    let tickets = join_all(bookings.into_iter().map(|b| state.expand(b))).await;
    Ok(Json(tickets))
}

/// Add tickets to an existing booking
#[utoipa::path(
    patch,
    path = "/api/tickets/updateTickets",
    tag = "tickets",
    request_body = AdjustTicketsRequest,
    responses(
        (status = 200, description = "Booking updated", body = AdjustedEnvelope),
        (status = 400, description = "Missing fields", body = tb_common::ErrorBody),
        (status = 404, description = "Booking not found", body = tb_common::ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn adjust_tickets(
    State(state): State<TicketsState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<AdjustTicketsRequest>,
) -> Result<Json<AdjustedEnvelope>, PlatformError> {
    checks::require_admin(&auth.0)?;

    let (Some(booking_id), Some(tickets)) = (req.ticket_booking_id, req.tickets) else {
        return Err(PlatformError::validation("ticket booking ID and tickets are required"));
    };

    let booking = state.orchestrator.adjust_booking_tickets(&booking_id, tickets).await?;

    Ok(Json(AdjustedEnvelope {
        message: "updated".to_string(),
        ticket: booking.into(),
    }))
}

pub fn tickets_router(state: TicketsState) -> Router {
    Router::new()
        .route("/", post(create_ticket).get(list_tickets))
        .route("/updateTickets", patch(adjust_tickets))
        .route("/:id", get(get_ticket))
        .with_state(state)
}
