//! OpenAPI Documentation
//!
//! One document per service, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::api::common::BearerAuthAddon;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Event Management API",
        version = "1.0.0",
        description = "Events and their remaining ticket availability"
    ),
    servers((url = "http://localhost:5001", description = "Local development")),
    tags(
        (name = "auth", description = "Token issuance"),
        (name = "events", description = "Event management")
    ),
    paths(
        super::auth::login,
        super::events::create_event,
        super::events::get_event,
        super::events::list_events,
        super::events::update_tickets,
    ),
    modifiers(&BearerAuthAddon)
)]
pub struct EventApiDoc;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendee Management API",
        version = "1.0.0",
        description = "Attendee registration and preferences"
    ),
    servers((url = "http://localhost:5002", description = "Local development")),
    tags(
        (name = "auth", description = "Token issuance"),
        (name = "attendees", description = "Attendee management")
    ),
    paths(
        super::auth::login,
        super::attendees::create_attendee,
        super::attendees::get_attendee,
        super::attendees::update_preferences,
        super::attendees::update_registration,
    ),
    modifiers(&BearerAuthAddon)
)]
pub struct AttendeeApiDoc;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ticket Booking API",
        version = "1.0.0",
        description = "Ticket bookings coordinated across payment, events and attendees"
    ),
    servers((url = "http://localhost:5003", description = "Local development")),
    tags(
        (name = "auth", description = "Token issuance"),
        (name = "tickets", description = "Ticket booking")
    ),
    paths(
        super::auth::login,
        super::tickets::create_ticket,
        super::tickets::get_ticket,
        super::tickets::list_tickets,
        super::tickets::adjust_tickets,
    ),
    modifiers(&BearerAuthAddon)
)]
pub struct TicketApiDoc;
