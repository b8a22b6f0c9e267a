//! Events API
//!
//! Event Management endpoints. The `updateTickets` call is the decrement the
//! booking workflow applies after storing a booking.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use tb_common::{EventEnvelope, EventView, UpdateTicketsRequest};
use tracing::info;
use utoipa::ToSchema;

use crate::api::common::required;
use crate::api::middleware::{Authenticated, JsonBody};
use crate::domain::{parse_event_date, Event};
use crate::error::PlatformError;
use crate::repository::EventRepository;
use crate::service::checks;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub date: Option<String>,
    pub ticket_availability: Option<i64>,
}

impl CreateEventRequest {
    fn into_event(self) -> Result<Event, PlatformError> {
        let name = required(self.name, "name")?;
        let location = required(self.location, "location")?;
        let date = parse_event_date(&required(self.date, "date")?)?;
        let availability = self
            .ticket_availability
            .ok_or_else(|| PlatformError::validation("\"ticketAvailability\" is required"))?;
        if availability < 0 {
            return Err(PlatformError::validation(
                "\"ticketAvailability\" must be greater than or equal to 0",
            ));
        }
        Ok(Event::new(name, location, date, availability))
    }
}

#[derive(Clone)]
pub struct EventsState {
    pub event_repo: Arc<dyn EventRepository>,
}

/// Create an event
#[utoipa::path(
    post,
    path = "/api/events",
    tag = "events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event created", body = EventEnvelope),
        (status = 400, description = "Validation error", body = tb_common::ErrorBody),
        (status = 403, description = "Missing token or not an admin", body = tb_common::ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_event(
    State(state): State<EventsState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventEnvelope>), PlatformError> {
    checks::require_admin(&auth.0)?;

    let event = req.into_event()?;
    state.event_repo.insert(&event).await?;
    info!(event_id = %event.id, availability = event.ticket_availability, "Event created");

    Ok((
        StatusCode::CREATED,
        Json(EventEnvelope {
            message: "event successfully created".to_string(),
            event: event.into(),
        }),
    ))
}

/// Get an event by ID
#[utoipa::path(
    get,
    path = "/api/events/{id}",
    tag = "events",
    params(("id" = String, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Event found", body = EventView),
        (status = 404, description = "Event not found", body = tb_common::ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_event(
    State(state): State<EventsState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<EventView>, PlatformError> {
    let event = state.event_repo.find_by_id(&id).await?
        .ok_or_else(|| PlatformError::not_found("Event", &id))?;

    Ok(Json(event.into()))
}

/// List events that still have tickets
#[utoipa::path(
    get,
    path = "/api/events",
    tag = "events",
    responses(
        (status = 200, description = "Events with ticketAvailability > 0", body = Vec<EventView>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_events(
    State(state): State<EventsState>,
    _auth: Authenticated,
) -> Result<Json<Vec<EventView>>, PlatformError> {
    let events = state.event_repo.find_available().await?;
    Ok(Json(events.into_iter().map(EventView::from).collect()))
}

/// Subtract booked tickets from an event
#[utoipa::path(
    patch,
    path = "/api/events/updateTickets",
    tag = "events",
    request_body = UpdateTicketsRequest,
    responses(
        (status = 200, description = "Availability decremented", body = EventEnvelope),
        (status = 400, description = "Missing fields or not enough tickets", body = tb_common::ErrorBody),
        (status = 404, description = "Event not found", body = tb_common::ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_tickets(
    State(state): State<EventsState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<UpdateTicketsRequest>,
) -> Result<Json<EventEnvelope>, PlatformError> {
    checks::require_admin(&auth.0)?;

    let (Some(event_id), Some(tickets)) = (req.event_id.filter(|id| !id.is_empty()), req.tickets) else {
        return Err(PlatformError::validation("event ID and tickets are required"));
    };
    if tickets < 1 {
        return Err(PlatformError::validation("\"tickets\" must be greater than or equal to 1"));
    }

    match state.event_repo.decrement_if_available(&event_id, tickets).await? {
        Some(event) => {
            info!(
                event_id = %event.id,
                tickets,
                remaining = event.ticket_availability,
                caller = %auth.0.username,
                "Ticket availability decremented"
            );
            Ok(Json(EventEnvelope {
                message: "ticket availability updated".to_string(),
                event: event.into(),
            }))
        }
        None => {
            let event = state.event_repo.find_by_id(&event_id).await?
                .ok_or_else(|| PlatformError::not_found("Event", &event_id))?;
            Err(PlatformError::InsufficientAvailability {
                event_id,
                requested: tickets,
                available: Some(event.ticket_availability),
            })
        }
    }
}

pub fn events_router(state: EventsState) -> Router {
    Router::new()
        .route("/", post(create_event).get(list_events))
        .route("/updateTickets", patch(update_tickets))
        .route("/:id", get(get_event))
        .with_state(state)
}
