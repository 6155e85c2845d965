use thiserror::Error;

use crate::{
    db_types::{NewPaymentFailure, PaymentRecord, PremiumPayment},
    traits::UpgradeResult,
};

#[derive(Debug, Clone, Error)]
pub enum PaymentApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for PaymentApiError {
    fn from(e: sqlx::Error) -> Self {
        PaymentApiError::DatabaseError(e.to_string())
    }
}

/// Payment bookkeeping.
///
/// Signature checks happen before anything reaches this trait. By the time `upgrade_to_premium` is called the payment
/// is known to be genuine, and the only remaining question is whether it has been applied already.
#[allow(async_fn_in_trait)]
pub trait PaymentManagement {
    /// Fetches a previously processed payment by the gateway's payment id.
    async fn fetch_payment_by_external_id(&self, payment_id: &str) -> Result<Option<PaymentRecord>, PaymentApiError>;

    /// Records the payment and marks the subject as premium in a single atomic step. If the payment id has been
    /// recorded before, nothing is changed and [`UpgradeResult::AlreadyProcessed`] is returned.
    async fn upgrade_to_premium(
        &self,
        subject: &str,
        payment: &PremiumPayment,
    ) -> Result<UpgradeResult, PaymentApiError>;

    /// Appends a record to the payment failure log.
    async fn log_payment_failure(&self, subject: &str, failure: &NewPaymentFailure) -> Result<(), PaymentApiError>;
}
