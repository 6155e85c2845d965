use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use parley_common::Secret;
use parley_engine::{db_types::WEBHOOK_SUBJECT, PaymentApi};
use razorpay_tools::signature::calculate_hmac;
use serde_json::json;

use super::{helpers::*, mocks::MockPaymentManager};
use crate::{
    middleware::{HmacMiddlewareFactory, RAZORPAY_SIGNATURE_HEADER},
    payment_routes::PaymentWebhookRoute,
};

const CAPTURED_EVENT: &str = r#"{
  "entity": "event",
  "account_id": "acc_BFQ7uQEaa7j2z7",
  "event": "payment.captured",
  "contains": ["payment"],
  "payload": {
    "payment": {
      "entity": {
        "id": "pay_123",
        "entity": "payment",
        "amount": 49900,
        "currency": "INR",
        "status": "captured",
        "order_id": "order_abc",
        "method": "upi",
        "email": "alice@example.com"
      }
    }
  },
  "created_at": 1767225600
}"#;

const FAILED_EVENT: &str = r#"{
  "entity": "event",
  "event": "payment.failed",
  "payload": {
    "payment": {
      "entity": {
        "id": "pay_123",
        "amount": 49900,
        "currency": "INR",
        "status": "failed",
        "order_id": "order_abc",
        "error_code": "BAD_REQUEST_ERROR",
        "error_description": "Payment processing failed because of incorrect OTP",
        "error_source": "customer",
        "error_step": "payment_authentication",
        "error_reason": "incorrect_otp"
      }
    }
  },
  "created_at": 1767225600
}"#;

fn configure_app(
    payments: MockPaymentManager,
    secret: Option<&'static str>,
    enabled: bool,
) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let key = secret.map(|s| Secret::new(s.to_string()));
        let hmac = HmacMiddlewareFactory::new(RAZORPAY_SIGNATURE_HEADER, key, enabled);
        cfg.app_data(web::Data::new(PaymentApi::new(payments)))
            .service(web::scope("/webhook").wrap(hmac).service(PaymentWebhookRoute::<MockPaymentManager>::new()));
    }
}

async fn send_webhook(
    body: &str,
    signature: Option<String>,
    payments: MockPaymentManager,
    secret: Option<&'static str>,
    enabled: bool,
) -> (StatusCode, String) {
    let mut req = TestRequest::post()
        .uri("/webhook")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    if let Some(sig) = signature {
        req = req.insert_header((RAZORPAY_SIGNATURE_HEADER, sig));
    }
    send_request(req, configure_app(payments, secret, enabled)).await
}

fn sign(body: &str) -> Option<String> {
    Some(calculate_hmac(TEST_WEBHOOK_SECRET, body.as_bytes()))
}

#[actix_web::test]
async fn captured_payment_is_acknowledged() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_log_payment_failure().never();
    payments.expect_upgrade_to_premium().never();
    let (status, body) =
        send_webhook(CAPTURED_EVENT, sign(CAPTURED_EVENT), payments, Some(TEST_WEBHOOK_SECRET), true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({"status": "webhook_processed"}));
}

#[actix_web::test]
async fn failed_payment_is_logged_under_webhook_subject() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments
        .expect_log_payment_failure()
        .withf(|subject, f| {
            subject == WEBHOOK_SUBJECT
                && f.order_id == "order_abc"
                && f.payment_id.as_deref() == Some("pay_123")
                && f.error_code == "BAD_REQUEST_ERROR"
                && f.error_reason.as_deref() == Some("incorrect_otp")
        })
        .times(1)
        .returning(|_, _| Ok(()));
    let (status, body) =
        send_webhook(FAILED_EVENT, sign(FAILED_EVENT), payments, Some(TEST_WEBHOOK_SECRET), true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({"status": "webhook_processed"}));
}

#[actix_web::test]
async fn tampered_body_is_rejected() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_log_payment_failure().never();
    let tampered = FAILED_EVENT.replace("49900", "100");
    let (status, body) =
        send_webhook(&tampered, sign(FAILED_EVENT), payments, Some(TEST_WEBHOOK_SECRET), true).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid signature"}"#);
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_log_payment_failure().never();
    let (status, body) = send_webhook(FAILED_EVENT, None, payments, Some(TEST_WEBHOOK_SECRET), true).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains(RAZORPAY_SIGNATURE_HEADER), "was: {body}");
}

#[actix_web::test]
async fn truncated_signature_is_rejected() {
    let _ = env_logger::try_init();
    let signature = sign(CAPTURED_EVENT).map(|s| s[..32].to_string());
    let (status, _) =
        send_webhook(CAPTURED_EVENT, signature, MockPaymentManager::new(), Some(TEST_WEBHOOK_SECRET), true).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unsigned_calls_pass_when_checks_are_off() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_log_payment_failure().times(1).returning(|_, _| Ok(()));
    let (status, _) = send_webhook(FAILED_EVENT, None, payments, Some(TEST_WEBHOOK_SECRET), false).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unsigned_calls_pass_without_a_secret() {
    let _ = env_logger::try_init();
    let (status, _) = send_webhook(CAPTURED_EVENT, None, MockPaymentManager::new(), None, true).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn unreadable_events_are_acknowledged() {
    let _ = env_logger::try_init();
    let body = "this is not json";
    let (status, reply) =
        send_webhook(body, sign(body), MockPaymentManager::new(), Some(TEST_WEBHOOK_SECRET), true).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&reply), json!({"status": "webhook_processed"}));
}

#[actix_web::test]
async fn store_errors_do_not_fail_the_webhook() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_log_payment_failure().returning(|_, _| {
        Err(parley_engine::traits::PaymentApiError::DatabaseError("database is locked".into()))
    });
    let (status, _) =
        send_webhook(FAILED_EVENT, sign(FAILED_EVENT), payments, Some(TEST_WEBHOOK_SECRET), true).await;
    assert_eq!(status, StatusCode::OK);
}
