//! Booking Orchestrator
//!
//! Sequences payment capture, the remote availability check, the remote
//! attendee check, the local insert and the remote decrement into one
//! booking outcome. There is no shared transaction: once a step with side
//! effects has run, a later failure is handled by the configured
//! [`CompensationMode`].

use std::sync::Arc;
use std::time::Instant;

use tb_config::CompensationMode;
use tracing::{debug, error, info, warn};

use crate::domain::{Booking, BookingRequest, BookingStage};
use crate::error::{PlatformError, Result};
use crate::repository::BookingRepository;
use crate::service::attendee_client::AttendeeServiceClient;
use crate::service::event_client::EventServiceClient;
use crate::service::payment::{PaymentGateway, PaymentReceipt};
use crate::service::retry::{retry_with_backoff, RetryPolicy};

/// State of one `book_ticket` call
#[derive(Debug)]
pub struct BookingAttempt {
    pub event_id: String,
    pub attendee_id: String,
    pub tickets: i64,
    pub stage: BookingStage,
    pub receipt: Option<PaymentReceipt>,
    pub booking_id: Option<String>,
}

impl BookingAttempt {
    fn new(request: &BookingRequest) -> Self {
        Self {
            event_id: request.event_id.clone(),
            attendee_id: request.attendee_id.clone(),
            tickets: request.tickets_booked,
            stage: BookingStage::Received,
            receipt: None,
            booking_id: None,
        }
    }

    fn advance(&mut self, stage: BookingStage) {
        debug_assert_eq!(self.stage.next().as_ref(), Some(&stage));
        info!(
            booking.stage = stage.name(),
            event_id = %self.event_id,
            attendee_id = %self.attendee_id,
            tickets = self.tickets,
            "Booking stage reached"
        );
        self.stage = stage;
    }

    fn fail(&mut self, err: &PlatformError) {
        warn!(
            booking.stage = "failed",
            failed_after = self.stage.name(),
            event_id = %self.event_id,
            attendee_id = %self.attendee_id,
            tickets = self.tickets,
            error = %err,
            "Booking failed"
        );
        self.stage = BookingStage::Failed {
            reason: err.code().to_string(),
        };
    }
}

pub struct BookingOrchestrator {
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentGateway>,
    events: Arc<dyn EventServiceClient>,
    attendees: Arc<dyn AttendeeServiceClient>,
    retry: RetryPolicy,
    compensation: CompensationMode,
}

impl BookingOrchestrator {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentGateway>,
        events: Arc<dyn EventServiceClient>,
        attendees: Arc<dyn AttendeeServiceClient>,
    ) -> Self {
        Self {
            bookings,
            payments,
            events,
            attendees,
            retry: RetryPolicy::default(),
            compensation: CompensationMode::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_compensation(mut self, compensation: CompensationMode) -> Self {
        self.compensation = compensation;
        self
    }

    /// Book tickets for an attendee.
    ///
    /// Steps run strictly in order and the first failure aborts the rest:
    /// validate, capture payment, check availability, validate the attendee,
    /// store the booking, decrement the event.
    pub async fn book_ticket(&self, request: BookingRequest) -> Result<Booking> {
        let started = Instant::now();
        let mut attempt = BookingAttempt::new(&request);

        let result = match self.run(&mut attempt, &request).await {
            Ok(booking) => Ok(booking),
            Err(err) => {
                attempt.fail(&err);
                Err(self.handle_failure(&attempt, err).await)
            }
        };

        let outcome = match &result {
            Ok(_) => "booked",
            Err(e) => e.code(),
        };
        metrics::counter!("tb_bookings_total", "outcome" => outcome).increment(1);
        metrics::histogram!("tb_booking_duration_seconds").record(started.elapsed().as_secs_f64());

        result
    }

    async fn run(&self, attempt: &mut BookingAttempt, request: &BookingRequest) -> Result<Booking> {
        request.validate()?;

        let receipt = self
            .payments
            .capture(request.amount(), request.payment.transaction_id.as_deref())
            .await?;
        if !receipt.is_completed() {
            return Err(PlatformError::PaymentFailed {
                message: format!("payment status {:?}", receipt.status).to_lowercase(),
            });
        }
        let payment_reference = receipt.transaction_id.clone();
        attempt.receipt = Some(receipt);
        attempt.advance(BookingStage::PaymentCaptured);

        let available = retry_with_backoff(&self.retry, "fetch_availability", || {
            self.events.fetch_availability(&request.event_id)
        })
        .await?;
        if available < request.tickets_booked {
            return Err(PlatformError::InsufficientAvailability {
                event_id: request.event_id.clone(),
                requested: request.tickets_booked,
                available: Some(available),
            });
        }
        attempt.advance(BookingStage::AvailabilityConfirmed);

        retry_with_backoff(&self.retry, "validate_attendee", || {
            self.attendees.validate(&request.attendee_id)
        })
        .await?;
        attempt.advance(BookingStage::AttendeeConfirmed);

        let booking = Booking::new(
            &request.attendee_id,
            &request.event_id,
            request.tickets_booked,
            payment_reference,
        );
        self.bookings
            .insert(&booking)
            .await
            .map_err(PlatformError::into_persistence)?;
        attempt.booking_id = Some(booking.id.clone());
        attempt.advance(BookingStage::Persisted);

        self.events
            .apply_decrement(&request.event_id, request.tickets_booked)
            .await?;
        attempt.advance(BookingStage::Decremented);

        Ok(booking)
    }

    async fn handle_failure(&self, attempt: &BookingAttempt, err: PlatformError) -> PlatformError {
        match self.compensation {
            CompensationMode::Report => match (&attempt.booking_id, &attempt.receipt) {
                (Some(booking_id), Some(receipt)) => PlatformError::PartiallyCommitted {
                    booking_id: booking_id.clone(),
                    payment_reference: receipt.transaction_id.clone(),
                    cause: Box::new(err),
                },
                _ => err,
            },
            CompensationMode::Compensate => {
                if let Some(booking_id) = &attempt.booking_id {
                    self.retract_booking(booking_id).await;
                }
                if let Some(receipt) = &attempt.receipt {
                    self.void_payment(receipt).await;
                }
                err
            }
        }
    }

    async fn retract_booking(&self, booking_id: &str) {
        match self.bookings.delete(booking_id).await {
            Ok(true) => info!(booking_id, "Retracted booking"),
            Ok(false) => warn!(booking_id, "Booking to retract was already gone"),
            Err(e) => error!(booking_id, error = %e, "Failed to retract booking"),
        }
    }

    async fn void_payment(&self, receipt: &PaymentReceipt) {
        match self.payments.void(receipt).await {
            Ok(()) => info!(transaction_id = %receipt.transaction_id, "Voided payment"),
            Err(e) => error!(transaction_id = %receipt.transaction_id, error = %e, "Failed to void payment"),
        }
    }

    /// Add tickets to an existing booking.
    ///
    /// The event's availability is neither checked nor decremented.
    pub async fn adjust_booking_tickets(&self, booking_id: &str, additional_tickets: i64) -> Result<Booking> {
        if booking_id.trim().is_empty() {
            return Err(PlatformError::validation("ticket booking ID and tickets are required"));
        }
        if additional_tickets < 1 {
            return Err(PlatformError::validation("\"tickets\" must be greater than or equal to 1"));
        }

        let booking = self
            .bookings
            .add_tickets(booking_id, additional_tickets)
            .await
            .map_err(PlatformError::into_persistence)?
            .ok_or_else(|| PlatformError::not_found("TicketBooking", booking_id))?;

        debug!(booking_id, added = additional_tickets, total = booking.tickets_booked, "Booking adjusted");
        Ok(booking)
    }

    pub async fn find_booking(&self, booking_id: &str) -> Result<Booking> {
        self.bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| PlatformError::not_found("TicketBooking", booking_id))
    }

    pub async fn list_bookings(&self) -> Result<Vec<Booking>> {
        self.bookings.find_all().await
    }
}
