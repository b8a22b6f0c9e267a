//! Ticket Booking Entity
//!
//! A booking references an attendee and an event that live in other services;
//! neither reference is owned here and neither is checked again after the
//! booking is created.

use std::fmt;

use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};

/// Persisted booking record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,

    pub attendee_id: String,

    pub event_id: String,

    /// At least 1
    pub tickets_booked: i64,

    /// Set at creation, never modified
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub booking_date: DateTime<Utc>,

    /// Transaction id returned by the payment gateway
    pub payment_reference: String,
}

impl Booking {
    pub fn new(
        attendee_id: impl Into<String>,
        event_id: impl Into<String>,
        tickets_booked: i64,
        payment_reference: impl Into<String>,
    ) -> Self {
        Self {
            id: super::new_id(),
            attendee_id: attendee_id.into(),
            event_id: event_id.into(),
            tickets_booked,
            booking_date: Utc::now(),
            payment_reference: payment_reference.into(),
        }
    }
}

/// Payment details supplied with a booking request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentInfo {
    pub amount: Option<f64>,
    pub transaction_id: Option<String>,
}

/// Input of the booking workflow
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub attendee_id: String,
    pub event_id: String,
    pub tickets_booked: i64,
    pub payment: PaymentInfo,
}

impl BookingRequest {
    pub fn new(
        attendee_id: impl Into<String>,
        event_id: impl Into<String>,
        tickets_booked: i64,
        amount: f64,
    ) -> Self {
        Self {
            attendee_id: attendee_id.into(),
            event_id: event_id.into(),
            tickets_booked,
            payment: PaymentInfo {
                amount: Some(amount),
                transaction_id: None,
            },
        }
    }

    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.payment.transaction_id = Some(transaction_id.into());
        self
    }

    /// Structural checks only; nothing here touches another service
    pub fn validate(&self) -> Result<()> {
        if self.attendee_id.trim().is_empty() {
            return Err(PlatformError::validation("\"attendeeId\" is required"));
        }
        if self.event_id.trim().is_empty() {
            return Err(PlatformError::validation("\"eventId\" is required"));
        }
        if self.tickets_booked < 1 {
            return Err(PlatformError::validation("\"ticketsBooked\" must be greater than or equal to 1"));
        }
        match self.payment.amount {
            None => Err(PlatformError::validation("\"paymentInfo.amount\" is required")),
            Some(amount) if !amount.is_finite() || amount <= 0.0 => Err(PlatformError::validation(
                "\"paymentInfo.amount\" must be a positive number",
            )),
            Some(_) => Ok(()),
        }
    }

    /// Amount after validation
    pub fn amount(&self) -> f64 {
        self.payment.amount.unwrap_or_default()
    }
}

/// Progress of a single booking attempt.
///
/// The happy path is strictly linear; any stage may instead move to
/// `Failed`, which is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingStage {
    Received,
    PaymentCaptured,
    AvailabilityConfirmed,
    AttendeeConfirmed,
    Persisted,
    Decremented,
    Failed { reason: String },
}

impl BookingStage {
    /// Next stage on the happy path
    pub fn next(&self) -> Option<BookingStage> {
        match self {
            Self::Received => Some(Self::PaymentCaptured),
            Self::PaymentCaptured => Some(Self::AvailabilityConfirmed),
            Self::AvailabilityConfirmed => Some(Self::AttendeeConfirmed),
            Self::AttendeeConfirmed => Some(Self::Persisted),
            Self::Persisted => Some(Self::Decremented),
            Self::Decremented | Self::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Decremented | Self::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::PaymentCaptured => "payment_captured",
            Self::AvailabilityConfirmed => "availability_confirmed",
            Self::AttendeeConfirmed => "attendee_confirmed",
            Self::Persisted => "persisted",
            Self::Decremented => "decremented",
            Self::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for BookingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "failed({})", reason),
            other => f.write_str(other.name()),
        }
    }
}
