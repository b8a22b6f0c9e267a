//! Ticketing Platform
//!
//! Shared core of the three ticketing services:
//! - Event management with an atomic conditional ticket decrement
//! - Attendee registration and meal preferences
//! - Ticket booking coordinated across payment, the event service and the
//!   attendee service, with an explicit partial-failure policy
//! - Bearer token authentication and a role-based authorization policy

pub mod domain;
pub mod repository;
pub mod service;
pub mod api;
pub mod error;

pub use domain::*;
pub use error::{PlatformError, Result};
