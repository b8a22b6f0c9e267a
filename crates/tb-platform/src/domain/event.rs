//! Event Entity

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tb_common::EventView;

use crate::error::{PlatformError, Result};

/// A ticketed event owned by the Event Management service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    pub location: String,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,

    /// Remaining tickets; never negative. Only the Event service's own
    /// decrement changes it after creation.
    pub ticket_availability: i64,

    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        date: DateTime<Utc>,
        ticket_availability: i64,
    ) -> Self {
        Self {
            id: super::new_id(),
            name: name.into(),
            location: location.into(),
            date,
            ticket_availability,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn has_tickets(&self, tickets: i64) -> bool {
        self.ticket_availability >= tickets
    }

    pub fn to_view(&self) -> EventView {
        EventView {
            id: self.id.clone(),
            name: self.name.clone(),
            location: self.location.clone(),
            date: self.date,
            ticket_availability: self.ticket_availability,
        }
    }
}

impl From<Event> for EventView {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            name: e.name,
            location: e.location,
            date: e.date,
            ticket_availability: e.ticket_availability,
        }
    }
}

/// Parse an event date given either as RFC 3339 or as a plain `YYYY-MM-DD` day
pub fn parse_event_date(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| PlatformError::validation(format!("\"date\" must be a valid date, got '{}'", value)))
}
