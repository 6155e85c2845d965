//! Applies verified payments and records failed ones.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewPaymentFailure, PaymentRecord, PremiumPayment},
    traits::{PaymentApiError, PaymentManagement, UpgradeResult},
};

pub struct PaymentApi<B> {
    db: B,
}

impl<B: Debug> Debug for PaymentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi ({:?})", self.db)
    }
}

impl<B> PaymentApi<B>
where B: PaymentManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn payment_by_id(&self, payment_id: &str) -> Result<Option<PaymentRecord>, PaymentApiError> {
        self.db.fetch_payment_by_external_id(payment_id).await
    }

    /// Upgrades the subject to premium on the strength of a payment whose signature has already been checked.
    ///
    /// Payments that were processed before are reported as [`UpgradeResult::AlreadyProcessed`] without touching the
    /// subject's entitlements. The backend enforces the same rule atomically, so concurrent duplicates are also safe.
    pub async fn process_verified_payment(
        &self,
        subject: &str,
        payment: &PremiumPayment,
    ) -> Result<UpgradeResult, PaymentApiError> {
        if let Some(existing) = self.db.fetch_payment_by_external_id(&payment.payment_id).await? {
            info!(
                "💳️ Payment {} was already processed for {} at {}. Skipping.",
                existing.payment_id, existing.subject, existing.created_at
            );
            return Ok(UpgradeResult::AlreadyProcessed);
        }
        let result = self.db.upgrade_to_premium(subject, payment).await?;
        match result {
            UpgradeResult::Upgraded => info!("💳️ {subject} upgraded to premium with {payment}"),
            UpgradeResult::AlreadyProcessed => info!("💳️ {payment} was processed concurrently. Nothing to do."),
        }
        Ok(result)
    }

    pub async fn log_failure(&self, subject: &str, failure: &NewPaymentFailure) -> Result<(), PaymentApiError> {
        warn!("💳️ Payment failure reported for {subject}: {failure}");
        self.db.log_payment_failure(subject, failure).await
    }
}
