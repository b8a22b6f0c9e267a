//! Platform Error Types

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tb_common::ErrorBody;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Duplicate {entity_type} with {field}={value}")]
    Duplicate { entity_type: String, field: String, value: String },

    #[error("{message}")]
    Validation { message: String },

    /// Missing or malformed credentials
    #[error("{message}")]
    Unauthorized { message: String },

    /// Credentials present but failed verification
    #[error("invalid token: {message}")]
    InvalidToken { message: String },

    #[error("{message}")]
    Forbidden { message: String },

    #[error("not enough tickets available for event {event_id}: requested {requested}{}", fmt_available(.available))]
    InsufficientAvailability {
        event_id: String,
        requested: i64,
        available: Option<i64>,
    },

    #[error("attendee {attendee_id} is not registered")]
    NotRegistered { attendee_id: String },

    #[error("{service} unavailable: {message}")]
    RemoteUnavailable { service: String, message: String },

    #[error("payment failed: {message}")]
    PaymentFailed { message: String },

    #[error("booking {booking_id} was persisted but not completed (payment {payment_reference}): {cause}")]
    PartiallyCommitted {
        booking_id: String,
        payment_reference: String,
        #[source]
        cause: Box<PlatformError>,
    },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bson::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] bson::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl PlatformError {
    pub fn not_found(entity_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(entity_type: impl Into<String>, field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type: entity_type.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn remote_unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Stable machine-readable code, rendered as the `error` field of [`ErrorBody`]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Duplicate { .. } => "DUPLICATE",
            Self::Validation { .. } | Self::Json(_) => "INVALID_REQUEST",
            Self::Unauthorized { .. } | Self::InvalidToken { .. } => "UNAUTHORIZED",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::InsufficientAvailability { .. } => "INSUFFICIENT_AVAILABILITY",
            Self::NotRegistered { .. } => "NOT_REGISTERED",
            Self::RemoteUnavailable { .. } => "REMOTE_UNAVAILABLE",
            Self::PaymentFailed { .. } => "PAYMENT_FAILED",
            Self::PartiallyCommitted { .. } => "PARTIALLY_COMMITTED",
            Self::Persistence { .. }
            | Self::Database(_)
            | Self::Serialization(_)
            | Self::Deserialization(_) => "PERSISTENCE_ERROR",
            Self::Internal { .. } => "INTERNAL",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::Json(_)
            | Self::InvalidToken { .. }
            | Self::InsufficientAvailability { .. }
            | Self::NotRegistered { .. }
            | Self::PaymentFailed { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } | Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Duplicate { .. } => StatusCode::CONFLICT,
            Self::RemoteUnavailable { .. } => StatusCode::BAD_GATEWAY,
            Self::PartiallyCommitted { .. }
            | Self::Persistence { .. }
            | Self::Database(_)
            | Self::Serialization(_)
            | Self::Deserialization(_)
            | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Transport-level failures worth retrying on idempotent calls
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteUnavailable { .. })
    }

    /// Store failures surface to booking callers as `PERSISTENCE_ERROR`
    pub fn into_persistence(self) -> Self {
        match self {
            Self::Database(_) | Self::Serialization(_) | Self::Deserialization(_) => {
                Self::persistence(self.to_string())
            }
            other => other,
        }
    }
}

impl From<JsonRejection> for PlatformError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl IntoResponse for PlatformError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(code = self.code(), "Request failed: {}", self);
        }
        let body = ErrorBody::with_code(self.to_string(), self.code());
        (status, Json(body)).into_response()
    }
}

fn fmt_available(available: &Option<i64>) -> String {
    available.map(|a| format!(", available {}", a)).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, PlatformError>;
