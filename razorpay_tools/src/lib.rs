//! Tools for talking to the Razorpay payment gateway.
//!
//! * [`RazorpayApi`] creates orders over Razorpay's REST API. Callers that only need order creation should depend on
//!   the [`OrderGateway`] trait so that a fake gateway can be substituted in tests.
//! * [`signature`] computes and checks the HMAC-SHA256 signatures Razorpay attaches to payments and webhooks.
//! * [`failure_codes`] maps Razorpay error codes to messages that are safe to show to users.
mod api;
mod config;
mod data_objects;
mod error;

pub mod failure_codes;
pub mod signature;

pub use api::RazorpayApi;
pub use config::RazorpayConfig;
pub use data_objects::{
    NewOrderRequest,
    PaymentEntity,
    RazorpayOrder,
    WebhookEvent,
    WebhookPayload,
    WebhookPaymentWrapper,
};
pub use error::RazorpayApiError;
use parley_common::MinorUnits;

/// Creates payment orders with a gateway.
#[allow(async_fn_in_trait)]
pub trait OrderGateway {
    /// Creates an order for `amount` (in the currency's minor unit) that is captured automatically once paid.
    async fn create_order(&self, amount: MinorUnits, currency: &str) -> Result<RazorpayOrder, RazorpayApiError>;
}
