//! API Layer
//!
//! REST routers for the three services. Each `*_app` function assembles one
//! service: its resource router, login, health and the OpenAPI document.
//! Callers add transport layers (tracing, CORS) on top.

pub mod common;
pub mod middleware;
pub mod auth;
pub mod events;
pub mod attendees;
pub mod tickets;
pub mod health;
pub mod openapi;

use axum::{routing::get, Extension, Json, Router};
use utoipa::OpenApi;

pub use common::*;
pub use middleware::{AppState, Authenticated, JsonBody};
pub use auth::auth_router;
pub use events::{EventsState, events_router};
pub use attendees::{AttendeesState, attendees_router};
pub use tickets::{TicketsState, tickets_router};
pub use health::health_router;
pub use openapi::{EventApiDoc, AttendeeApiDoc, TicketApiDoc};

pub fn event_service_app(app_state: AppState, state: EventsState) -> Router {
    Router::new()
        .nest("/api/events", events_router(state))
        .nest("/api/auth", auth_router())
        .route("/api/openapi.json", get(|| async { Json(EventApiDoc::openapi()) }))
        .merge(health_router("event-service"))
        .layer(Extension(app_state))
}

pub fn attendee_service_app(app_state: AppState, state: AttendeesState) -> Router {
    Router::new()
        .nest("/api/attendees", attendees_router(state))
        .nest("/api/auth", auth_router())
        .route("/api/openapi.json", get(|| async { Json(AttendeeApiDoc::openapi()) }))
        .merge(health_router("attendee-service"))
        .layer(Extension(app_state))
}

pub fn ticket_service_app(app_state: AppState, state: TicketsState) -> Router {
    Router::new()
        .nest("/api/tickets", tickets_router(state))
        .nest("/api/auth", auth_router())
        .route("/api/openapi.json", get(|| async { Json(TicketApiDoc::openapi()) }))
        .merge(health_router("ticket-service"))
        .layer(Extension(app_state))
}
