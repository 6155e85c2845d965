//! Payment handlers: order creation, payment verification, failure reports and the Razorpay webhook.
use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::*;
use parley_common::DEFAULT_CURRENCY;
use parley_engine::{
    db_types::{NewPaymentFailure, PremiumPayment, VerifiedIdentity, WEBHOOK_SUBJECT},
    traits::PaymentManagement,
    PaymentApi,
};
use razorpay_tools::{
    failure_codes::failure_message,
    signature::verify_payment_signature,
    OrderGateway,
    RazorpayConfig,
    WebhookEvent,
};

use crate::{
    data_objects::{
        CreateOrderRequest,
        CreateOrderResponse,
        PaymentFailedRequest,
        PaymentFailedResponse,
        VerifyPaymentRequest,
        VerifyPaymentResponse,
        WebhookResponse,
    },
    errors::ServerError,
    route,
};

//----------------------------------------------   Orders  ----------------------------------------------------
route!(create_order => Post "/create-order" impl OrderGateway where authenticated);
pub async fn create_order<G: OrderGateway>(
    identity: web::ReqData<VerifiedIdentity>,
    body: web::Json<CreateOrderRequest>,
    gateway: web::Data<G>,
) -> Result<HttpResponse, ServerError> {
    let CreateOrderRequest { amount, currency } = body.into_inner();
    info!("💻️ Creating order for {} ({amount} {currency})", identity.email);
    if !amount.is_positive() {
        return Err(ServerError::InvalidRequestBody(format!("The order amount must be positive, not {amount}")));
    }
    let order = gateway.create_order(amount, &currency).await?;
    info!("💳️ Razorpay order {} created for {}", order.id, identity.external_id);
    let response = CreateOrderResponse { order_id: order.id, amount: order.amount, currency: order.currency };
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Verify payment  ---------------------------------------------
route!(verify_payment => Post "/verify-payment" impl PaymentManagement where authenticated);
/// Verifies a payment reported by the client after checkout and upgrades the caller to premium.
///
/// Checks happen in a fixed order: required fields, then the payment signature, then whether the payment was seen
/// before. A payment that was already applied returns the success shape with `status: "already_processed"`.
pub async fn verify_payment<B: PaymentManagement>(
    identity: web::ReqData<VerifiedIdentity>,
    body: web::Json<VerifyPaymentRequest>,
    api: web::Data<PaymentApi<B>>,
    razorpay: web::Data<RazorpayConfig>,
) -> Result<HttpResponse, ServerError> {
    let subject = identity.external_id.as_str();
    let confirmation = body.confirmation()?;
    info!("💳️ Verifying payment {} for {subject}", confirmation.payment_id);
    let secret = razorpay.key_secret.reveal();
    if !verify_payment_signature(secret, &confirmation.order_id, &confirmation.payment_id, &confirmation.signature) {
        warn!("💳️ Invalid signature for payment {} from {subject}", confirmation.payment_id);
        return Err(ServerError::SignatureMismatch);
    }
    debug!("💳️ Signature for payment {} verified", confirmation.payment_id);
    let payment = PremiumPayment {
        order_id: confirmation.order_id,
        payment_id: confirmation.payment_id,
        amount: body.amount.unwrap_or_default(),
        currency: body.currency.clone().unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        paid_at: Utc::now(),
    };
    let result = api.process_verified_payment(subject, &payment).await?;
    Ok(HttpResponse::Ok().json(VerifyPaymentResponse::from(result)))
}

//----------------------------------------------   Payment failed  ---------------------------------------------
route!(payment_failed => Post "/payment-failed" impl PaymentManagement);
/// Records a failed checkout reported by the client and tells the user what went wrong, in plain words.
///
/// If the failure cannot be saved, the error is logged and the user still gets their message.
pub async fn payment_failed<B: PaymentManagement>(
    body: web::Json<PaymentFailedRequest>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let (user_id, failure) = body.into_inner().into_failure()?;
    if let Err(e) = api.log_failure(&user_id, &failure).await {
        error!("💳️ Could not save the payment failure for {user_id}. {e}. The failure was: {failure}");
    }
    let message = failure_message(&failure.error_code);
    Ok(HttpResponse::Ok().json(PaymentFailedResponse {
        status: "failed".to_string(),
        message: message.to_string(),
        error_code: failure.error_code,
    }))
}

//----------------------------------------------   Webhook  ----------------------------------------------------
route!(payment_webhook => Post "" impl PaymentManagement);
/// Receives Razorpay webhook events. Signature checks are done by the HMAC middleware before this handler runs.
///
/// `payment.failed` events are written to the failure log under the `webhook` subject, and `payment.captured` events
/// are logged. Every other event, and any body that cannot be understood, is acknowledged and otherwise ignored.
pub async fn payment_webhook<B: PaymentManagement>(
    body: web::Bytes,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let event = match serde_json::from_slice::<WebhookEvent>(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("💳️ Could not parse webhook body. {e}");
            return Ok(HttpResponse::Ok().json(WebhookResponse::processed()));
        },
    };
    match (event.event.as_str(), event.payment()) {
        ("payment.failed", Some(payment)) => {
            let failure = NewPaymentFailure {
                order_id: payment.order_id.clone().unwrap_or_default(),
                payment_id: Some(payment.id.clone()),
                error_code: payment.error_code.clone().unwrap_or_default(),
                error_description: payment.error_description.clone().unwrap_or_default(),
                error_source: payment.error_source.clone(),
                error_step: payment.error_step.clone(),
                error_reason: payment.error_reason.clone(),
            };
            if let Err(e) = api.log_failure(WEBHOOK_SUBJECT, &failure).await {
                error!("💳️ Could not save the webhook payment failure. {e}. The failure was: {failure}");
            }
        },
        ("payment.captured", Some(payment)) => {
            info!("💳️ Payment {} captured for {} {}", payment.id, payment.amount, payment.currency);
        },
        (other, _) => debug!("💳️ Ignoring webhook event {other}"),
    }
    Ok(HttpResponse::Ok().json(WebhookResponse::processed()))
}
