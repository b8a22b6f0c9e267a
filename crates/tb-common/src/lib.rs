//! Shared wire types for the ticketing services.
//!
//! The Event and Attendee services produce these views and the Ticket Booking
//! service consumes them through its remote clients, so both sides agree on one
//! JSON shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use utoipa::ToSchema;

// ============================================================================
// Event / Attendee Views
// ============================================================================

/// Event as exposed by the Event Management service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    pub id: String,
    pub name: String,
    pub location: String,
    pub date: DateTime<Utc>,
    pub ticket_availability: i64,
}

/// Meal preference recorded for an attendee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum MealPreference {
    Vegan,
    #[default]
    Vegetarian,
    NonVegetarian,
}

impl MealPreference {
    pub const ALL: [MealPreference; 3] = [
        MealPreference::Vegan,
        MealPreference::Vegetarian,
        MealPreference::NonVegetarian,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealPreference::Vegan => "vegan",
            MealPreference::Vegetarian => "vegetarian",
            MealPreference::NonVegetarian => "non-vegetarian",
        }
    }
}

impl fmt::Display for MealPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("meal must be one of [vegan, vegetarian, non-vegetarian], got '{0}'")]
pub struct InvalidMealPreference(pub String);

impl FromStr for MealPreference {
    type Err = InvalidMealPreference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MealPreference::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| InvalidMealPreference(s.to_string()))
    }
}

/// Attendee preferences sub-document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Preferences {
    #[serde(default)]
    pub meal: MealPreference,
}

/// Attendee as exposed by the Attendee Management service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// Identifier of the event the attendee registered for
    pub event: String,
    pub tickets_booked: i64,
    pub is_registered: bool,
    #[serde(default)]
    pub preferences: Preferences,
}

// ============================================================================
// Generic Bodies
// ============================================================================

/// Error body returned by every service: `{message, error?}`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub message: String,
    /// Machine readable error code (e.g. `INSUFFICIENT_AVAILABILITY`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), error: None }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error: Some(code.into()),
        }
    }
}

/// Body of the ticket-count decrement call between Ticket Booking and Event Management
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketsRequest {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub tickets: Option<i64>,
}

/// Response envelope of the decrement call
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventEnvelope {
    pub message: String,
    pub event: EventView,
}

// ============================================================================
// Logging
// ============================================================================

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` controls filtering (default `info`); `TB_LOG_FORMAT=json` switches
/// to JSON lines.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("TB_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    // a second call is a no-op
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
