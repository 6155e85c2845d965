use chrono::{DateTime, Utc};
use parley_common::{MinorUnits, DEFAULT_CURRENCY};
use parley_engine::{
    db_types::{EntitlementState, NewPaymentFailure, UserAccount},
    UpgradeResult,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

//----------------------------------------------   Auth  --------------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleLoginRequest {
    /// The Google ID token. Google's sign-in button calls this `credential`.
    #[serde(alias = "credential")]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserAccount,
}

//----------------------------------------------   Chat  --------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatStatus {
    pub is_premium: bool,
    pub remaining_chats: i64,
    pub used_chats: i64,
    pub can_chat: bool,
}

impl From<EntitlementState> for ChatStatus {
    fn from(state: EntitlementState) -> Self {
        Self {
            is_premium: state.is_premium,
            remaining_chats: state.remaining_free_chats.max(0),
            used_chats: state.used_chat_count,
            can_chat: state.can_chat(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAdmission {
    pub admitted: bool,
    pub is_premium: bool,
    /// Absent for premium users, who have no limit.
    pub remaining_chats: Option<i64>,
}

//----------------------------------------------   Payments  ----------------------------------------------------------
fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// In the currency's minor unit, e.g. paise.
    pub amount: MinorUnits,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: MinorUnits,
    pub currency: String,
}

/// The fields Razorpay's checkout hands back to the client after a successful payment. All of them are optional here
/// so that a missing field is reported as such rather than as a malformed body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
    pub amount: Option<MinorUnits>,
    pub currency: Option<String>,
}

/// The three values needed to check a payment signature.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

impl VerifyPaymentRequest {
    pub fn confirmation(&self) -> Result<PaymentConfirmation, ServerError> {
        let fields = [
            ("razorpay_order_id", &self.razorpay_order_id),
            ("razorpay_payment_id", &self.razorpay_payment_id),
            ("razorpay_signature", &self.razorpay_signature),
        ];
        let missing = missing_fields(&fields);
        if !missing.is_empty() {
            return Err(ServerError::MissingFields(missing.join(", ")));
        }
        Ok(PaymentConfirmation {
            order_id: self.razorpay_order_id.clone().unwrap_or_default(),
            payment_id: self.razorpay_payment_id.clone().unwrap_or_default(),
            signature: self.razorpay_signature.clone().unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyPaymentResponse {
    pub status: String,
    pub message: String,
    pub is_premium: bool,
    pub unlimited_chats: bool,
}

impl From<UpgradeResult> for VerifyPaymentResponse {
    fn from(result: UpgradeResult) -> Self {
        let (status, message) = match result {
            UpgradeResult::Upgraded => ("success", "Payment verified and premium activated!"),
            UpgradeResult::AlreadyProcessed => ("already_processed", "Payment already processed. Premium is active."),
        };
        Self { status: status.to_string(), message: message.to_string(), is_premium: true, unlimited_chats: true }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentFailedRequest {
    pub order_id: Option<String>,
    pub payment_id: Option<String>,
    pub error_code: Option<String>,
    pub error_description: Option<String>,
    pub error_source: Option<String>,
    pub error_step: Option<String>,
    pub error_reason: Option<String>,
    pub user_id: Option<String>,
}

impl PaymentFailedRequest {
    /// Splits the request into the reporting user's id and the failure record, or reports which required fields are
    /// missing.
    pub fn into_failure(self) -> Result<(String, NewPaymentFailure), ServerError> {
        let fields = [("order_id", &self.order_id), ("error_code", &self.error_code), ("user_id", &self.user_id)];
        let missing = missing_fields(&fields);
        if !missing.is_empty() {
            return Err(ServerError::MissingFields(missing.join(", ")));
        }
        let failure = NewPaymentFailure {
            order_id: self.order_id.unwrap_or_default(),
            payment_id: self.payment_id,
            error_code: self.error_code.unwrap_or_default(),
            error_description: self.error_description.unwrap_or_default(),
            error_source: self.error_source,
            error_step: self.error_step,
            error_reason: self.error_reason,
        };
        Ok((self.user_id.unwrap_or_default(), failure))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailedResponse {
    pub status: String,
    pub message: String,
    pub error_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
}

impl WebhookResponse {
    pub fn processed() -> Self {
        Self { status: "webhook_processed".to_string() }
    }
}

fn missing_fields<'a>(fields: &[(&'a str, &Option<String>)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter(|(_, v)| v.as_deref().map(str::trim).unwrap_or_default().is_empty())
        .map(|(name, _)| *name)
        .collect()
}
