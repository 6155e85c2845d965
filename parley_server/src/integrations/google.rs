//! Google identity assertions.
//!
//! A client signs in with Google and sends us the resulting ID token (an RS256 JWT). [`AssertionVerifier`] checks the
//! signature against Google's published keys, checks that the token was issued by Google for our OAuth client, and
//! extracts a [`VerifiedIdentity`].
//!
//! Keys come from a [`VerificationKeys`] implementation. [`GoogleKeySet`] downloads and caches Google's JWKS document,
//! while [`StaticKeys`] serves a fixed set of keys.
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use log::*;
use parley_engine::db_types::VerifiedIdentity;
use reqwest::{header::CACHE_CONTROL, Client};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::errors::AuthError;

/// The only issuer values Google documents for its ID tokens. Matching is exact.
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

const DEFAULT_KEY_CACHE_LIFETIME: Duration = Duration::from_secs(3600);
/// Unknown key ids never cause more than one download of the key set per interval.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Error)]
pub enum KeySetError {
    #[error("Could not fetch the key set. {0}")]
    Fetch(String),
    #[error("The key set is invalid. {0}")]
    InvalidKeySet(String),
}

#[derive(Debug, Clone, Error)]
pub enum AssertionError {
    #[error(transparent)]
    Rejected(#[from] AuthError),
    #[error("Could not obtain the identity provider's keys. {0}")]
    KeySource(#[from] KeySetError),
}

/// The claims of a Google ID token that we care about.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleClaims {
    pub sub: String,
    pub iss: String,
    pub exp: i64,
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// A source of RS256 verification keys, looked up by key id.
#[allow(async_fn_in_trait)]
pub trait VerificationKeys {
    /// Returns the key with the given id, or `None` if the source has no such key. Errors mean the source itself could
    /// not be consulted.
    async fn key_for(&self, kid: &str) -> Result<Option<DecodingKey>, KeySetError>;
}

//----------------------------------------------   StaticKeys  --------------------------------------------------------
#[derive(Clone, Default)]
pub struct StaticKeys {
    keys: HashMap<String, DecodingKey>,
}

impl StaticKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, kid: &str, key: DecodingKey) -> Self {
        self.keys.insert(kid.to_string(), key);
        self
    }

    pub fn with_rsa_pem(self, kid: &str, pem: &[u8]) -> Result<Self, KeySetError> {
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| KeySetError::InvalidKeySet(e.to_string()))?;
        Ok(self.with_key(kid, key))
    }

    /// Builds a key set from a JWKS document. Keys without a key id, or that are not usable for signature checks, are
    /// skipped.
    pub fn from_jwks_json(json: &str) -> Result<Self, KeySetError> {
        let jwks = serde_json::from_str::<JwkSet>(json).map_err(|e| KeySetError::InvalidKeySet(e.to_string()))?;
        Ok(Self { keys: keys_from_jwks(&jwks) })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl VerificationKeys for StaticKeys {
    async fn key_for(&self, kid: &str) -> Result<Option<DecodingKey>, KeySetError> {
        Ok(self.keys.get(kid).cloned())
    }
}

fn keys_from_jwks(jwks: &JwkSet) -> HashMap<String, DecodingKey> {
    jwks.keys
        .iter()
        .filter_map(|jwk| {
            let kid = jwk.common.key_id.clone()?;
            match DecodingKey::from_jwk(jwk) {
                Ok(key) => Some((kid, key)),
                Err(e) => {
                    warn!("🔐️ Skipping unusable key {kid} in the identity provider's key set. {e}");
                    None
                },
            }
        })
        .collect()
}

//----------------------------------------------   GoogleKeySet  ------------------------------------------------------
struct CachedKeys {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
    expires_at: Instant,
}

enum CacheLookup {
    Hit(DecodingKey),
    /// The key set is fresh, was downloaded recently and does not have the key.
    Unknown,
    Stale,
}

/// Google's signing keys, fetched over HTTPS and cached for as long as Google's `Cache-Control` header allows.
///
/// Downloads are serialized. Concurrent callers that find the cache stale wait for a single download and share it. An
/// unknown key id triggers a download only if the key set is older than the minimum refresh interval, so a stream of
/// tokens with made-up key ids cannot make the server hammer Google.
pub struct GoogleKeySet {
    client: Client,
    certs_url: String,
    cache: RwLock<Option<CachedKeys>>,
    // Time of the last download attempt, successful or not
    last_attempt: Mutex<Option<Instant>>,
    min_refresh_interval: Duration,
}

impl GoogleKeySet {
    pub fn new(certs_url: &str, timeout: Duration) -> Result<Self, KeySetError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| KeySetError::Fetch(e.to_string()))?;
        Ok(Self {
            client,
            certs_url: certs_url.to_string(),
            cache: RwLock::new(None),
            last_attempt: Mutex::new(None),
            min_refresh_interval: DEFAULT_MIN_REFRESH_INTERVAL,
        })
    }

    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval = interval;
        self
    }

    async fn lookup(&self, kid: &str) -> CacheLookup {
        let cache = self.cache.read().await;
        let now = Instant::now();
        match cache.as_ref().filter(|c| c.expires_at > now) {
            Some(cached) => match cached.keys.get(kid) {
                Some(key) => CacheLookup::Hit(key.clone()),
                None if now.duration_since(cached.fetched_at) < self.min_refresh_interval => CacheLookup::Unknown,
                None => CacheLookup::Stale,
            },
            None => CacheLookup::Stale,
        }
    }

    async fn fetch(&self) -> Result<CachedKeys, KeySetError> {
        debug!("🔐️ Fetching identity provider keys from {}", self.certs_url);
        let response = self.client.get(&self.certs_url).send().await.map_err(|e| KeySetError::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(KeySetError::Fetch(format!("{} returned {}", self.certs_url, response.status())));
        }
        let lifetime = response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .and_then(max_age)
            .unwrap_or(DEFAULT_KEY_CACHE_LIFETIME);
        let jwks = response.json::<JwkSet>().await.map_err(|e| KeySetError::InvalidKeySet(e.to_string()))?;
        let keys = keys_from_jwks(&jwks);
        if keys.is_empty() {
            return Err(KeySetError::InvalidKeySet("No usable keys were found".into()));
        }
        info!("🔐️ Loaded {} identity provider keys, valid for {}s", keys.len(), lifetime.as_secs());
        let now = Instant::now();
        Ok(CachedKeys { keys, fetched_at: now, expires_at: now + lifetime })
    }

    /// The key from a stale cache, for use when a fresh download is not allowed yet.
    async fn stale_key(&self, kid: &str) -> Option<DecodingKey> {
        self.cache.read().await.as_ref().and_then(|c| c.keys.get(kid).cloned())
    }
}

impl VerificationKeys for GoogleKeySet {
    async fn key_for(&self, kid: &str) -> Result<Option<DecodingKey>, KeySetError> {
        match self.lookup(kid).await {
            CacheLookup::Hit(key) => return Ok(Some(key)),
            CacheLookup::Unknown => {
                debug!("🔐️ Key {kid} is not in the recently fetched key set.");
                return Ok(None);
            },
            CacheLookup::Stale => {},
        }
        let mut last_attempt = self.last_attempt.lock().await;
        // Another caller may have refreshed the cache while we waited for the lock
        match self.lookup(kid).await {
            CacheLookup::Hit(key) => return Ok(Some(key)),
            CacheLookup::Unknown => return Ok(None),
            CacheLookup::Stale => {},
        }
        if last_attempt.is_some_and(|t| t.elapsed() < self.min_refresh_interval) {
            warn!("🔐️ The identity provider's key set was downloaded moments ago. Not downloading it again yet.");
            let has_keys = self.cache.read().await.is_some();
            return match self.stale_key(kid).await {
                Some(key) => Ok(Some(key)),
                None if has_keys => Ok(None),
                None => Err(KeySetError::Fetch("The last attempt to download the key set failed".into())),
            };
        }
        *last_attempt = Some(Instant::now());
        let fresh = self.fetch().await?;
        let key = fresh.keys.get(kid).cloned();
        *self.cache.write().await = Some(fresh);
        Ok(key)
    }
}

/// Extracts `max-age` from a `Cache-Control` header value.
fn max_age(header: &str) -> Option<Duration> {
    header.split(',').map(str::trim).find_map(|directive| {
        let (name, value) = directive.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("max-age") {
            value.trim().parse::<u64>().ok().map(Duration::from_secs)
        } else {
            None
        }
    })
}

//----------------------------------------------   AssertionVerifier  -------------------------------------------------
pub struct AssertionVerifier<K> {
    keys: K,
    client_id: String,
}

impl<K: VerificationKeys> AssertionVerifier<K> {
    pub fn new(keys: K, client_id: &str) -> Self {
        Self { keys, client_id: client_id.to_string() }
    }

    /// Verifies a Google ID token and extracts the identity it asserts.
    ///
    /// Bad signatures, unknown keys, the wrong issuer or audience, expired tokens and tokens without an email address
    /// are all rejected as [`AuthError::InvalidAssertion`]. Failing to obtain the keys is a [`KeySetError`] instead.
    pub async fn verify(&self, assertion: &str) -> Result<VerifiedIdentity, AssertionError> {
        let header = decode_header(assertion).map_err(|e| invalid(format!("Could not decode the header. {e}")))?;
        if header.alg != Algorithm::RS256 {
            return Err(invalid(format!("Unexpected signing algorithm {:?}", header.alg)));
        }
        let kid = header.kid.ok_or_else(|| invalid("The assertion has no key id".into()))?;
        let key = self.keys.key_for(&kid).await?.ok_or_else(|| invalid(format!("Unknown signing key {kid}")))?;
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        let claims = decode::<GoogleClaims>(assertion, &key, &validation).map_err(|e| invalid(e.to_string()))?.claims;
        let email = claims.email.filter(|e| !e.is_empty()).ok_or_else(|| invalid("No email claim".into()))?;
        let display_name = claims.name.filter(|n| !n.is_empty()).unwrap_or_else(|| email.clone());
        debug!("🔐️ Verified identity assertion for {} ({email}) from {}", claims.sub, claims.iss);
        Ok(VerifiedIdentity { external_id: claims.sub, email, display_name, picture_url: claims.picture })
    }
}

fn invalid(reason: String) -> AssertionError {
    debug!("🔐️ Identity assertion rejected. {reason}");
    AssertionError::Rejected(AuthError::InvalidAssertion(reason))
}
