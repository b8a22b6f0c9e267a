//! Domain Models
//!
//! Entities owned by the three services. Identifiers are BSON ObjectId hex
//! strings so documents stay compatible with existing MongoDB collections.

pub mod event;
pub mod attendee;
pub mod booking;

pub use event::*;
pub use attendee::*;
pub use booking::*;

/// Generate a new document identifier
pub fn new_id() -> String {
    bson::oid::ObjectId::new().to_hex()
}
