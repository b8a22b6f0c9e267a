//! Service Layer
//!
//! Authentication, the authorization policy, the payment gateway, clients
//! for the peer services and the booking orchestrator.

pub mod auth;
pub mod authorization;
pub mod payment;
pub mod remote;
pub mod retry;
pub mod event_client;
pub mod attendee_client;
pub mod booking;

pub use auth::{AuthService, AuthConfig, AccessTokenClaims, extract_bearer_token};
pub use authorization::{AuthContext, AccessDecision, ADMIN_ROLE, authorize, checks};
pub use payment::{PaymentGateway, PaymentReceipt, PaymentStatus, StubPaymentGateway};
pub use remote::{RemoteServiceConfig, ServiceCredentials};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use event_client::{EventServiceClient, HttpEventServiceClient, EVENT_SERVICE};
pub use attendee_client::{AttendeeServiceClient, HttpAttendeeServiceClient, ATTENDEE_SERVICE};
pub use booking::{BookingOrchestrator, BookingAttempt};
