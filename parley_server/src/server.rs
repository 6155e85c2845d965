use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use parley_engine::{AccountApi, EntitlementApi, PaymentApi, SqliteDatabase};
use razorpay_tools::RazorpayApi;

use crate::{
    auth::SessionTokens,
    config::ServerConfig,
    errors::ServerError,
    integrations::google::{AssertionVerifier, GoogleKeySet},
    middleware::{HmacMiddlewareFactory, RAZORPAY_SIGNATURE_HEADER},
    payment_routes::{CreateOrderRoute, PaymentFailedRoute, PaymentWebhookRoute, VerifyPaymentRoute},
    routes::{health, ChatAdmitRoute, ChatStatusRoute, GoogleLoginRoute, MeRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections, config.external_call_timeout)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?
        .with_free_chat_allowance(config.free_chat_allowance);
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    info!("🚀️ Database ready at {}", db.url());
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// Malformed JSON bodies are reported like every other client error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        debug!("💻️ Could not deserialize request body. {err}");
        ServerError::InvalidRequestBody(err.to_string()).into()
    })
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    // Shared across workers, so the identity provider's keys are downloaded and cached once
    let keys = GoogleKeySet::new(&config.auth.google_certs_url, config.external_call_timeout)
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let verifier = web::Data::new(AssertionVerifier::new(keys, &config.auth.google_client_id));
    let gateway = web::Data::new(
        RazorpayApi::new(config.razorpay.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?,
    );
    let razorpay_config = web::Data::new(config.razorpay.clone());
    let session_tokens = web::Data::new(SessionTokens::new(&config.auth));
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let accounts_api = AccountApi::new(db.clone());
        let entitlement_api = EntitlementApi::new(db.clone()).with_free_chat_allowance(config.free_chat_allowance);
        let payment_api = PaymentApi::new(db.clone());
        let webhook_scope = web::scope("/webhook")
            .wrap(HmacMiddlewareFactory::new(
                RAZORPAY_SIGNATURE_HEADER,
                config.razorpay.webhook_secret.clone(),
                config.webhook_hmac_checks,
            ))
            .service(PaymentWebhookRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("parley::access_log"))
            .app_data(json_config())
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(entitlement_api))
            .app_data(web::Data::new(payment_api))
            .app_data(verifier.clone())
            .app_data(gateway.clone())
            .app_data(razorpay_config.clone())
            .app_data(session_tokens.clone())
            .service(health)
            .service(GoogleLoginRoute::<SqliteDatabase, GoogleKeySet>::new())
            .service(MeRoute::<SqliteDatabase>::new())
            .service(ChatStatusRoute::<SqliteDatabase>::new())
            .service(ChatAdmitRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<RazorpayApi>::new())
            .service(VerifyPaymentRoute::<SqliteDatabase>::new())
            .service(PaymentFailedRoute::<SqliteDatabase>::new())
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
