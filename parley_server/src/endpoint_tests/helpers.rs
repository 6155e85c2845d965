use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, web::ServiceConfig, App};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::debug;
use parley_common::Secret;
use parley_engine::db_types::{UserAccount, VerifiedIdentity};
use razorpay_tools::RazorpayConfig;
use serde_json::json;

use crate::{auth::SessionTokens, config::AuthConfig, integrations::google::StaticKeys, server::json_config};

pub const TEST_CLIENT_ID: &str = "test-client.apps.googleusercontent.com";
pub const TEST_KEY_ID: &str = "test-key-1";
pub const TEST_SUBJECT: &str = "108318052268079221395";
pub const TEST_KEY_SECRET: &str = "s3cr3t";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_only";

// A throwaway RSA key pair. DO NOT re-use these keys anywhere.
const TEST_RSA_PRIVATE_KEY: &[u8] = include_bytes!("keys/test_rsa.pem");
const TEST_RSA_PUBLIC_KEY: &[u8] = include_bytes!("keys/test_rsa_pub.pem");

/// Knobs for minting a Google-style ID token signed with the test key.
#[derive(Debug, Clone)]
pub struct AssertionOptions {
    pub iss: String,
    pub aud: String,
    /// Seconds from now. Negative values produce an expired token.
    pub expires_in: i64,
    pub kid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl Default for AssertionOptions {
    fn default() -> Self {
        Self {
            iss: "https://accounts.google.com".to_string(),
            aud: TEST_CLIENT_ID.to_string(),
            expires_in: 3600,
            kid: TEST_KEY_ID.to_string(),
            email: Some("alice@example.com".to_string()),
            name: Some("Alice Example".to_string()),
        }
    }
}

pub fn google_assertion(options: AssertionOptions) -> String {
    let now = Utc::now().timestamp();
    let mut claims = json!({
        "iss": options.iss,
        "aud": options.aud,
        "sub": TEST_SUBJECT,
        "iat": now,
        "exp": now + options.expires_in,
        "email_verified": true,
        "picture": "https://lh3.googleusercontent.com/a/alice",
    });
    if let Some(email) = options.email {
        claims["email"] = json!(email);
    }
    if let Some(name) = options.name {
        claims["name"] = json!(name);
    }
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(options.kid);
    let key = EncodingKey::from_rsa_pem(TEST_RSA_PRIVATE_KEY).expect("test key should load");
    encode(&header, &claims, &key).expect("Failed to sign assertion")
}

pub fn static_keys() -> StaticKeys {
    StaticKeys::new().with_rsa_pem(TEST_KEY_ID, TEST_RSA_PUBLIC_KEY).expect("test key should load")
}

// Creates a test `AuthConfig` for issuing tokens. DO NOT re-use this secret anywhere.
pub fn get_auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: Secret::new("a5b8ba1c0e6f4a2f9d3c7e1b0a4f8d2c6e0b9a3f".to_string()),
        session_duration: Duration::hours(24),
        google_client_id: TEST_CLIENT_ID.to_string(),
        google_certs_url: "http://127.0.0.1:1/certs".to_string(),
    }
}

pub fn session_tokens() -> SessionTokens {
    SessionTokens::new(&get_auth_config())
}

pub fn razorpay_config() -> RazorpayConfig {
    RazorpayConfig {
        key_id: "rzp_test_1234567890".to_string(),
        key_secret: Secret::new(TEST_KEY_SECRET.to_string()),
        webhook_secret: Some(Secret::new(TEST_WEBHOOK_SECRET.to_string())),
        ..Default::default()
    }
}

pub fn alice() -> VerifiedIdentity {
    VerifiedIdentity {
        external_id: TEST_SUBJECT.to_string(),
        email: "alice@example.com".to_string(),
        display_name: "Alice Example".to_string(),
        picture_url: None,
    }
}

pub fn alice_account() -> UserAccount {
    let created_at = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z").unwrap().with_timezone(&Utc);
    UserAccount {
        subject: TEST_SUBJECT.to_string(),
        email: "alice@example.com".to_string(),
        display_name: "Alice Example".to_string(),
        picture_url: Some("https://lh3.googleusercontent.com/a/alice".to_string()),
        is_premium: false,
        remaining_free_chats: 5,
        used_chat_count: 0,
        premium_since: None,
        created_at,
        last_login_at: created_at,
    }
}

pub fn issue_token(identity: &VerifiedIdentity) -> String {
    session_tokens().issue(identity).expect("Failed to sign token").access_token
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Sends `req` to an app built by `configure`, with the session verifier and JSON error handling of the real server.
///
/// Errors raised by middleware come back as errors rather than responses, so they are rendered here the same way
/// actix renders them for a live client.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig)
{
    let app = App::new().app_data(json_config()).app_data(web::Data::new(session_tokens())).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap_or_default();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub fn json_body(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Body is not JSON ({e}): {body}"))
}
