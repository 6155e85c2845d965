use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::Utc;
use parley_common::MinorUnits;
use parley_engine::{
    db_types::PaymentRecord,
    traits::{PaymentApiError, UpgradeResult},
    PaymentApi,
};
use razorpay_tools::{
    failure_codes::{failure_message, FALLBACK_FAILURE_MESSAGE},
    signature::payment_signature,
    RazorpayApiError,
    RazorpayOrder,
};
use serde_json::json;

use super::{
    helpers::*,
    mocks::{MockGateway, MockPaymentManager},
};
use crate::{
    errors::GENERIC_ERROR_MESSAGE,
    payment_routes::{CreateOrderRoute, PaymentFailedRoute, VerifyPaymentRoute},
};

fn configure_app(payments: MockPaymentManager, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        cfg.app_data(web::Data::new(PaymentApi::new(payments)))
            .app_data(web::Data::new(gateway))
            .app_data(web::Data::new(razorpay_config()))
            .service(CreateOrderRoute::<MockGateway>::new())
            .service(VerifyPaymentRoute::<MockPaymentManager>::new())
            .service(PaymentFailedRoute::<MockPaymentManager>::new());
    }
}

async fn post(
    path: &str,
    body: serde_json::Value,
    authenticated: bool,
    payments: MockPaymentManager,
    gateway: MockGateway,
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).set_json(body);
    if authenticated {
        req = req.insert_header(bearer(&issue_token(&alice())));
    }
    send_request(req, configure_app(payments, gateway)).await
}

fn order(id: &str, amount: i64) -> RazorpayOrder {
    RazorpayOrder {
        id: id.to_string(),
        entity: "order".to_string(),
        amount: MinorUnits::from(amount),
        amount_paid: MinorUnits::default(),
        amount_due: MinorUnits::from(amount),
        currency: "INR".to_string(),
        receipt: None,
        status: "created".to_string(),
        attempts: 0,
        created_at: 1_767_225_600,
    }
}

fn signed_confirmation() -> serde_json::Value {
    json!({
        "razorpay_order_id": "order_abc",
        "razorpay_payment_id": "pay_123",
        "razorpay_signature": payment_signature(TEST_KEY_SECRET, "order_abc", "pay_123"),
        "amount": 49900,
        "currency": "INR",
    })
}

//----------------------------------------------   Create order  ----------------------------------------------------

#[actix_web::test]
async fn create_order_requires_a_session() {
    let _ = env_logger::try_init();
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().never();
    let (status, _) =
        post("/create-order", json!({"amount": 49900}), false, MockPaymentManager::new(), gateway).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_order() {
    let _ = env_logger::try_init();
    let mut gateway = MockGateway::new();
    gateway
        .expect_create_order()
        .withf(|amount, currency| amount.value() == 49_900 && currency == "INR")
        .times(1)
        .returning(|amount, _| Ok(order("order_IluGWxBm9U8zJ8", amount.value())));
    let (status, body) =
        post("/create-order", json!({"amount": 49900}), true, MockPaymentManager::new(), gateway).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({"order_id": "order_IluGWxBm9U8zJ8", "amount": 49900, "currency": "INR"}));
}

#[actix_web::test]
async fn create_order_rejects_non_positive_amounts() {
    let _ = env_logger::try_init();
    for amount in [0, -100] {
        let mut gateway = MockGateway::new();
        gateway.expect_create_order().never();
        let (status, body) =
            post("/create-order", json!({"amount": amount}), true, MockPaymentManager::new(), gateway).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "amount {amount}: {body}");
    }
}

#[actix_web::test]
async fn create_order_when_gateway_fails() {
    let _ = env_logger::try_init();
    let mut gateway = MockGateway::new();
    gateway.expect_create_order().returning(|_, _| {
        Err(RazorpayApiError::QueryError { status: 401, message: "Authentication failed".into() })
    });
    let (status, body) =
        post("/create-order", json!({"amount": 49900}), true, MockPaymentManager::new(), gateway).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(&body), json!({"error": GENERIC_ERROR_MESSAGE}));
}

//----------------------------------------------   Verify payment  ---------------------------------------------------

#[actix_web::test]
async fn verify_payment_with_missing_fields() {
    let _ = env_logger::try_init();
    let body = json!({"razorpay_order_id": "order_abc"});
    let (status, body) = post("/verify-payment", body, true, MockPaymentManager::new(), MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Missing required fields: razorpay_payment_id, razorpay_signature"}"#);
}

#[actix_web::test]
async fn verify_payment_with_bad_signature() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_fetch_payment_by_external_id().never();
    payments.expect_upgrade_to_premium().never();
    let mut body = signed_confirmation();
    body["razorpay_payment_id"] = json!("pay_124");
    let (status, body) = post("/verify-payment", body, true, payments, MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Invalid signature"}"#);
}

#[actix_web::test]
async fn verify_payment_requires_a_session() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_upgrade_to_premium().never();
    let (status, _) = post("/verify-payment", signed_confirmation(), false, payments, MockGateway::new()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn verify_payment_upgrades_the_session_user() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_fetch_payment_by_external_id().withf(|id| id == "pay_123").returning(|_| Ok(None));
    payments
        .expect_upgrade_to_premium()
        .withf(|subject, p| {
            subject == TEST_SUBJECT
                && p.order_id == "order_abc"
                && p.payment_id == "pay_123"
                && p.amount.value() == 49_900
        })
        .times(1)
        .returning(|_, _| Ok(UpgradeResult::Upgraded));
    let (status, body) = post("/verify-payment", signed_confirmation(), true, payments, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({
            "status": "success",
            "message": "Payment verified and premium activated!",
            "is_premium": true,
            "unlimited_chats": true
        })
    );
}

#[actix_web::test]
async fn verify_payment_twice_is_harmless() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_fetch_payment_by_external_id().returning(|_| {
        Ok(Some(PaymentRecord {
            payment_id: "pay_123".into(),
            order_id: "order_abc".into(),
            subject: TEST_SUBJECT.into(),
            amount: MinorUnits::from(49_900),
            currency: "INR".into(),
            paid_at: Utc::now(),
            created_at: Utc::now(),
        }))
    });
    payments.expect_upgrade_to_premium().never();
    let (status, body) = post("/verify-payment", signed_confirmation(), true, payments, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    let body = json_body(&body);
    assert_eq!(body["status"], "already_processed");
    assert_eq!(body["is_premium"], true);
}

#[actix_web::test]
async fn verify_payment_when_store_fails() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_fetch_payment_by_external_id().returning(|_| Ok(None));
    payments
        .expect_upgrade_to_premium()
        .returning(|_, _| Err(PaymentApiError::DatabaseError("database is locked".into())));
    let (status, body) = post("/verify-payment", signed_confirmation(), true, payments, MockGateway::new()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(&body), json!({"error": GENERIC_ERROR_MESSAGE}));
}

//----------------------------------------------   Payment failed  ---------------------------------------------------

fn failure_report(code: &str) -> serde_json::Value {
    json!({
        "order_id": "order_abc",
        "payment_id": "pay_123",
        "error_code": code,
        "error_description": "Your card was declined by the bank",
        "error_source": "bank",
        "error_step": "payment_authorization",
        "error_reason": "card_declined",
        "user_id": "u-42",
    })
}

#[actix_web::test]
async fn payment_failed_is_logged() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments
        .expect_log_payment_failure()
        .withf(|subject, f| {
            subject == "u-42"
                && f.order_id == "order_abc"
                && f.error_code == "CARD_DECLINED"
                && f.error_step.as_deref() == Some("payment_authorization")
        })
        .times(1)
        .returning(|_, _| Ok(()));
    let (status, body) =
        post("/payment-failed", failure_report("CARD_DECLINED"), false, payments, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({"status": "failed", "message": failure_message("CARD_DECLINED"), "error_code": "CARD_DECLINED"})
    );
}

#[actix_web::test]
async fn payment_failed_with_unknown_code() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_log_payment_failure().returning(|_, _| Ok(()));
    let (status, body) =
        post("/payment-failed", failure_report("SOMETHING_NEW"), false, payments, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["message"], FALLBACK_FAILURE_MESSAGE);
}

#[actix_web::test]
async fn payment_failed_survives_store_errors() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments
        .expect_log_payment_failure()
        .returning(|_, _| Err(PaymentApiError::DatabaseError("database is locked".into())));
    let (status, body) =
        post("/payment-failed", failure_report("GATEWAY_ERROR"), false, payments, MockGateway::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body)["message"], failure_message("GATEWAY_ERROR"));
}

#[actix_web::test]
async fn payment_failed_with_missing_fields() {
    let _ = env_logger::try_init();
    let mut payments = MockPaymentManager::new();
    payments.expect_log_payment_failure().never();
    let body = json!({"order_id": "order_abc"});
    let (status, body) = post("/payment-failed", body, false, payments, MockGateway::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, r#"{"error":"Missing required fields: error_code, user_id"}"#);
}
