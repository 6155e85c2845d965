//! Razorpay payment and webhook signatures.
//!
//! A payment signature is the hex-encoded HMAC-SHA256 of `"{order_id}|{payment_id}"`, keyed with the account's key
//! secret. Webhook signatures use the same scheme over the raw request body, keyed with the webhook secret.
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}

/// Calculates the hex-encoded HMAC-SHA256 of `data`.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> String {
    let mut mac = mac_for(secret);
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// The signature Razorpay issues for a successful payment.
pub fn payment_signature(secret: &str, order_id: &str, payment_id: &str) -> String {
    calculate_hmac(secret, format!("{order_id}|{payment_id}").as_bytes())
}

/// Checks a client-supplied payment signature in constant time.
pub fn verify_payment_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    verify_hex_signature(secret, format!("{order_id}|{payment_id}").as_bytes(), signature)
}

/// Checks a hex-encoded HMAC-SHA256 signature of `data` in constant time. Signatures that are not valid hex are
/// rejected.
pub fn verify_hex_signature(secret: &str, data: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = mac_for(secret);
    mac.update(data);
    mac.verify_slice(&expected).is_ok()
}
