mod hmac;
mod session;

pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService, RAZORPAY_SIGNATURE_HEADER};
pub use session::{SessionAuthMiddlewareFactory, SessionAuthMiddlewareService};
