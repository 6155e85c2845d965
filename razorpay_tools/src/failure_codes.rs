//! User-facing messages for Razorpay payment failures.
//!
//! Razorpay's own error descriptions can be technical, so clients are shown one of these curated messages instead.

pub const FALLBACK_FAILURE_MESSAGE: &str = "Payment failed. Please try again or use a different payment method.";

const FAILURE_MESSAGES: &[(&str, &str)] = &[
    ("BAD_REQUEST_ERROR", "The payment could not be processed. Please check your payment details and try again."),
    ("GATEWAY_ERROR", "The payment gateway is having trouble right now. Please try again in a few minutes."),
    ("SERVER_ERROR", "Something went wrong on the payment provider's side. Please try again later."),
    ("PAYMENT_CANCELLED", "The payment was cancelled. You can try again whenever you are ready."),
    ("PAYMENT_DECLINED", "Your bank declined the payment. Please try a different payment method."),
    ("CARD_DECLINED", "Your card was declined. Please try a different card."),
    ("INSUFFICIENT_FUNDS", "Insufficient funds. Please use a different account or payment method."),
    ("AUTHENTICATION_FAILED", "Payment authentication failed. Please try again and complete the verification step."),
    ("PAYMENT_TIMEOUT", "The payment timed out. Please try again."),
    ("INVALID_CARD", "The card details are invalid. Please check them and try again."),
    ("CARD_EXPIRED", "Your card has expired. Please use a different card."),
    ("NETWORK_ERROR", "A network error interrupted the payment. Please check your connection and try again."),
];

/// Maps a Razorpay error code to a message that is safe to show to users. Matching ignores case and surrounding
/// whitespace. Unknown or empty codes get [`FALLBACK_FAILURE_MESSAGE`].
pub fn failure_message(code: &str) -> &'static str {
    let code = code.trim();
    FAILURE_MESSAGES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(code))
        .map(|(_, message)| *message)
        .unwrap_or(FALLBACK_FAILURE_MESSAGE)
}
