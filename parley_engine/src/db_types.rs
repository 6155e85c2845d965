use std::fmt::Display;

use chrono::{DateTime, Utc};
use parley_common::MinorUnits;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Payment failures reported by the gateway webhook are not tied to a signed-in user, so they are filed under this
/// sentinel subject.
pub const WEBHOOK_SUBJECT: &str = "webhook";

//--------------------------------------   VerifiedIdentity   ---------------------------------------------------------
/// A user identity that has passed verification, either from an identity-provider assertion or from one of our own
/// session tokens.
///
/// `external_id` is the durable key used everywhere else. The remaining fields are presentation data and may be stale
/// relative to the identity provider. `picture_url` is never carried in session tokens, so identities rebuilt from a
/// session token always have `picture_url == None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedIdentity {
    pub external_id: String,
    pub email: String,
    pub display_name: String,
    pub picture_url: Option<String>,
}

impl Display for VerifiedIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.external_id, self.email)
    }
}

//--------------------------------------   EntitlementState   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EntitlementState {
    pub is_premium: bool,
    pub remaining_free_chats: i64,
    pub used_chat_count: i64,
}

impl EntitlementState {
    /// The state of a subject that has never chatted and never paid.
    pub fn free(allowance: i64) -> Self {
        Self { is_premium: false, remaining_free_chats: allowance.max(0), used_chat_count: 0 }
    }

    pub fn can_chat(&self) -> bool {
        self.is_premium || self.remaining_free_chats > 0
    }
}

//--------------------------------------     UserAccount      ---------------------------------------------------------
/// The stored profile of a user, joined with their entitlement counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    pub subject: String,
    pub email: String,
    pub display_name: String,
    pub picture_url: Option<String>,
    pub is_premium: bool,
    pub remaining_free_chats: i64,
    pub used_chat_count: i64,
    pub premium_since: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}

//--------------------------------------       Payments       ---------------------------------------------------------
/// A verified gateway payment that upgrades its payer to premium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumPayment {
    pub order_id: String,
    pub payment_id: String,
    pub amount: MinorUnits,
    pub currency: String,
    pub paid_at: DateTime<Utc>,
}

impl Display for PremiumPayment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "payment {} for order {} ({} {})", self.payment_id, self.order_id, self.amount, self.currency)
    }
}

/// A payment that has already been processed. The gateway's payment id is the idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub order_id: String,
    pub subject: String,
    pub amount: MinorUnits,
    pub currency: String,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPaymentFailure {
    pub order_id: String,
    pub payment_id: Option<String>,
    pub error_code: String,
    pub error_description: String,
    pub error_source: Option<String>,
    pub error_step: Option<String>,
    pub error_reason: Option<String>,
}

impl Display for NewPaymentFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order {} failed with {}: {}", self.order_id, self.error_code, self.error_description)
    }
}
