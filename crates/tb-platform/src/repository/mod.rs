//! Repository Layer
//!
//! Document store adapter for the three collections. Each collection has a
//! trait with a MongoDB implementation and an in-memory implementation; the
//! in-memory stores back tests and `TB_STORE=memory`.
//!
//! Single-document writes are atomic in both implementations. Nothing spans
//! collections: a booking and the event it decremented are never written
//! together.

pub mod event;
pub mod attendee;
pub mod booking;

pub use event::{EventRepository, MongoEventRepository, InMemoryEventRepository};
pub use attendee::{AttendeeRepository, MongoAttendeeRepository, InMemoryAttendeeRepository};
pub use booking::{BookingRepository, MongoBookingRepository, InMemoryBookingRepository};
