//! Attendees API

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tb_common::{AttendeeView, MealPreference, Preferences};
use tracing::info;
use utoipa::ToSchema;

use crate::api::common::required;
use crate::api::middleware::{Authenticated, JsonBody};
use crate::domain::Attendee;
use crate::error::PlatformError;
use crate::repository::AttendeeRepository;
use crate::service::checks;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendeeRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Event ID the attendee registers for
    pub event: Option<String>,
    pub tickets_booked: Option<i64>,
}

impl CreateAttendeeRequest {
    fn into_attendee(self) -> Result<Attendee, PlatformError> {
        let name = required(self.name, "name")?;
        let email = required(self.email, "email")?;
        if !email.contains('@') {
            return Err(PlatformError::validation("\"email\" must be a valid email"));
        }
        let phone = required(self.phone, "phone")?;
        let event = required(self.event, "event")?;
        let tickets = self
            .tickets_booked
            .ok_or_else(|| PlatformError::validation("\"ticketsBooked\" is required"))?;
        if tickets < 1 {
            return Err(PlatformError::validation(
                "\"ticketsBooked\" must be greater than or equal to 1",
            ));
        }
        Ok(Attendee::new(name, email, phone, event, tickets))
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AttendeeEnvelope {
    pub message: String,
    pub attendee: AttendeeView,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePreferencesRequest {
    /// One of `vegan`, `vegetarian`, `non-vegetarian`; absent leaves it unchanged
    pub meal: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PreferencesEnvelope {
    pub message: String,
    pub preferences: Preferences,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRegistrationRequest {
    pub is_registered: bool,
}

#[derive(Clone)]
pub struct AttendeesState {
    pub attendee_repo: Arc<dyn AttendeeRepository>,
}

/// Register an attendee
#[utoipa::path(
    post,
    path = "/api/attendees",
    tag = "attendees",
    request_body = CreateAttendeeRequest,
    responses(
        (status = 201, description = "Attendee registered", body = AttendeeEnvelope),
        (status = 400, description = "Validation error", body = tb_common::ErrorBody),
        (status = 409, description = "Email already registered", body = tb_common::ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_attendee(
    State(state): State<AttendeesState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<CreateAttendeeRequest>,
) -> Result<(StatusCode, Json<AttendeeEnvelope>), PlatformError> {
    checks::require_admin(&auth.0)?;

    let attendee = req.into_attendee()?;
    state.attendee_repo.insert(&attendee).await?;
    info!(attendee_id = %attendee.id, event_id = %attendee.event_id, "Attendee registered");

    Ok((
        StatusCode::CREATED,
        Json(AttendeeEnvelope {
            message: "attendee successfully registered".to_string(),
            attendee: attendee.into(),
        }),
    ))
}

/// Get an attendee by ID
#[utoipa::path(
    get,
    path = "/api/attendees/{id}",
    tag = "attendees",
    params(("id" = String, Path, description = "Attendee ID")),
    responses(
        (status = 200, description = "Attendee found", body = AttendeeView),
        (status = 404, description = "Attendee not found", body = tb_common::ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_attendee(
    State(state): State<AttendeesState>,
    _auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<AttendeeView>, PlatformError> {
    let attendee = state.attendee_repo.find_by_id(&id).await?
        .ok_or_else(|| PlatformError::not_found("Attendee", &id))?;

    Ok(Json(attendee.into()))
}

/// Update an attendee's meal preference
#[utoipa::path(
    patch,
    path = "/api/attendees/{id}/preferences",
    tag = "attendees",
    params(("id" = String, Path, description = "Attendee ID")),
    request_body = UpdatePreferencesRequest,
    responses(
        (status = 200, description = "Preferences updated", body = PreferencesEnvelope),
        (status = 400, description = "Unknown meal preference", body = tb_common::ErrorBody),
        (status = 404, description = "Attendee not found", body = tb_common::ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_preferences(
    State(state): State<AttendeesState>,
    auth: Authenticated,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdatePreferencesRequest>,
) -> Result<Json<PreferencesEnvelope>, PlatformError> {
    checks::require_admin(&auth.0)?;

    let attendee = match req.meal {
        Some(meal) => {
            let meal: MealPreference = meal
                .parse()
                .map_err(|e: tb_common::InvalidMealPreference| PlatformError::validation(e.to_string()))?;
            state.attendee_repo.update_meal_preference(&id, meal).await?
        }
        None => state.attendee_repo.find_by_id(&id).await?,
    }
    .ok_or_else(|| PlatformError::not_found("Attendee", &id))?;

    info!(attendee_id = %id, meal = %attendee.preferences.meal, "Meal preference updated");

    Ok(Json(PreferencesEnvelope {
        message: "attendee meal preference updated".to_string(),
        preferences: attendee.preferences,
    }))
}

/// Set or clear an attendee's registration flag
#[utoipa::path(
    patch,
    path = "/api/attendees/{id}/registration",
    tag = "attendees",
    params(("id" = String, Path, description = "Attendee ID")),
    request_body = UpdateRegistrationRequest,
    responses(
        (status = 200, description = "Registration updated", body = AttendeeEnvelope),
        (status = 404, description = "Attendee not found", body = tb_common::ErrorBody)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_registration(
    State(state): State<AttendeesState>,
    auth: Authenticated,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateRegistrationRequest>,
) -> Result<Json<AttendeeEnvelope>, PlatformError> {
    checks::require_admin(&auth.0)?;

    let attendee = state.attendee_repo.set_registered(&id, req.is_registered).await?
        .ok_or_else(|| PlatformError::not_found("Attendee", &id))?;
    info!(attendee_id = %id, registered = req.is_registered, "Registration updated");

    Ok(Json(AttendeeEnvelope {
        message: "attendee registration updated".to_string(),
        attendee: attendee.into(),
    }))
}

pub fn attendees_router(state: AttendeesState) -> Router {
    Router::new()
        .route("/", post(create_attendee))
        .route("/:id", get(get_attendee))
        .route("/:id/preferences", patch(update_preferences))
        .route("/:id/registration", patch(update_registration))
        .with_state(state)
}
