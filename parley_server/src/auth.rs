//! Session tokens.
//!
//! Once a user has proven who they are with an identity assertion, they receive a session token: an HS256 JWT carrying
//! their subject id, email and display name. Every authenticated endpoint accepts this token as a bearer credential.
//!
//! Token lifetime is fixed. `exp - iat` always equals the configured session duration, and there is no refresh. The
//! picture URL is deliberately left out of the claims, so identities rebuilt from a session token never have one.
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use parley_engine::db_types::VerifiedIdentity;
use serde::{Deserialize, Serialize};

use crate::{config::AuthConfig, errors::AuthError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

impl From<SessionClaims> for VerifiedIdentity {
    fn from(claims: SessionClaims) -> Self {
        Self { external_id: claims.sub, email: claims.email, display_name: claims.name, picture_url: None }
    }
}

/// A freshly minted session token.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies session tokens with a server-held secret.
#[derive(Clone)]
pub struct SessionTokens {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    duration: Duration,
}

impl SessionTokens {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            duration: config.session_duration,
        }
    }

    pub fn session_duration(&self) -> Duration {
        self.duration
    }

    pub fn issue(&self, identity: &VerifiedIdentity) -> Result<IssuedSession, jsonwebtoken::errors::Error> {
        self.issue_at(identity, Utc::now())
    }

    /// Issues a session token as if the current time were `now`. The output depends only on the identity, `now` and
    /// the server secret.
    pub fn issue_at(
        &self,
        identity: &VerifiedIdentity,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, jsonwebtoken::errors::Error> {
        let iat = now.timestamp();
        let exp = iat + self.duration.num_seconds();
        let claims = SessionClaims {
            sub: identity.external_id.clone(),
            email: identity.email.clone(),
            name: identity.display_name.clone(),
            iat,
            exp,
        };
        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        let expires_at = Utc.timestamp_opt(exp, 0).single().unwrap_or(now + self.duration);
        trace!("🔐️ Issued session token for {} expiring at {expires_at}", identity.external_id);
        Ok(IssuedSession { access_token, expires_at })
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies a session token as if the current time were `now`.
    ///
    /// A token whose signature does not verify, or which cannot be decoded at all, is [`AuthError::Malformed`]. A valid
    /// token is [`AuthError::Expired`] once `now >= exp`. No leeway is applied.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedIdentity, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the caller's clock
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                debug!("🔐️ Rejected session token. {e}");
                AuthError::Malformed(e.to_string())
            })?
            .claims;
        if now.timestamp() >= claims.exp {
            debug!("🔐️ Session token for {} expired at {}", claims.sub, claims.exp);
            return Err(AuthError::Expired);
        }
        Ok(claims.into())
    }
}
