use std::time::Duration;

use log::*;
use parley_common::Secret;

pub const DEFAULT_RAZORPAY_API_URL: &str = "https://api.razorpay.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    /// Authenticates API calls, and is also the HMAC key for payment signatures.
    pub key_secret: Secret<String>,
    pub webhook_secret: Option<Secret<String>>,
    pub api_url: String,
    pub timeout: Duration,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: String::default(),
            key_secret: Secret::default(),
            webhook_secret: None,
            api_url: DEFAULT_RAZORPAY_API_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl RazorpayConfig {
    pub fn new_from_env_or_default() -> Self {
        let key_id = std::env::var("PARLEY_RAZORPAY_KEY_ID").unwrap_or_else(|_| {
            warn!("🪛️ PARLEY_RAZORPAY_KEY_ID not set, using (probably useless) default");
            "rzp_test_00000000000000".to_string()
        });
        let key_secret = Secret::new(std::env::var("PARLEY_RAZORPAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("🪛️ PARLEY_RAZORPAY_KEY_SECRET not set, using (probably useless) default");
            "00000000000000".to_string()
        }));
        let webhook_secret = match std::env::var("PARLEY_RAZORPAY_WEBHOOK_SECRET") {
            Ok(s) if !s.is_empty() => Some(Secret::new(s)),
            _ => {
                warn!("🪛️ PARLEY_RAZORPAY_WEBHOOK_SECRET not set. Webhook signatures cannot be checked.");
                None
            },
        };
        let api_url = std::env::var("PARLEY_RAZORPAY_API_URL").unwrap_or_else(|_| DEFAULT_RAZORPAY_API_URL.to_string());
        let timeout = std::env::var("PARLEY_EXTERNAL_CALL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| match s.parse::<u64>() {
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(e) => {
                    warn!("🪛️ Invalid PARLEY_EXTERNAL_CALL_TIMEOUT_SECS value: {s}. {e}");
                    None
                },
            })
            .unwrap_or(DEFAULT_TIMEOUT);
        Self { key_id, key_secret, webhook_secret, api_url, timeout }
    }
}
