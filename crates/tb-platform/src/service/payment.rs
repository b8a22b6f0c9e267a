//! Payment Gateway
//!
//! The booking workflow only sees the [`PaymentGateway`] trait. The bundled
//! [`StubPaymentGateway`] completes every capture.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Completed,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub status: PaymentStatus,
    pub transaction_id: String,
    pub amount: f64,
}

impl PaymentReceipt {
    pub fn is_completed(&self) -> bool {
        self.status == PaymentStatus::Completed
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Capture `amount`. Repeated captures are not deduplicated.
    async fn capture(&self, amount: f64, transaction_id: Option<&str>) -> Result<PaymentReceipt>;

    /// Release a previously captured payment
    async fn void(&self, receipt: &PaymentReceipt) -> Result<()>;
}

#[derive(Debug, Default, Clone)]
pub struct StubPaymentGateway;

impl StubPaymentGateway {
    pub fn new() -> Self {
        Self
    }
}

/// `txn_<epoch millis>`
pub fn synthesize_transaction_id() -> String {
    format!("txn_{}", Utc::now().timestamp_millis())
}

#[async_trait]
impl PaymentGateway for StubPaymentGateway {
    async fn capture(&self, amount: f64, transaction_id: Option<&str>) -> Result<PaymentReceipt> {
        let transaction_id = transaction_id
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(synthesize_transaction_id);

        info!(amount, transaction_id = %transaction_id, "Payment captured");

        Ok(PaymentReceipt {
            status: PaymentStatus::Completed,
            transaction_id,
            amount,
        })
    }

    async fn void(&self, receipt: &PaymentReceipt) -> Result<()> {
        debug!(transaction_id = %receipt.transaction_id, "Payment voided");
        Ok(())
    }
}
