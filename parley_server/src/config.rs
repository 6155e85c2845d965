use std::{env, io::Write, time::Duration as StdDuration};

use chrono::Duration;
use log::*;
use parley_common::{parse_boolean_flag, Secret};
use parley_engine::DEFAULT_FREE_CHAT_ALLOWANCE;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use razorpay_tools::RazorpayConfig;
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_PARLEY_HOST: &str = "127.0.0.1";
const DEFAULT_PARLEY_PORT: u16 = 8480;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/parley.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_SESSION_HOURS: i64 = 24;
const DEFAULT_EXTERNAL_CALL_TIMEOUT: StdDuration = StdDuration::from_secs(10);
pub const DEFAULT_GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub auth: AuthConfig,
    pub razorpay: RazorpayConfig,
    /// If false, webhook calls are accepted without checking their signature. **DANGER**
    pub webhook_hmac_checks: bool,
    /// The number of free chats a new user starts with.
    pub free_chat_allowance: i64,
    /// Applied to every call to the identity provider and the payment gateway, and to database connection acquisition.
    pub external_call_timeout: StdDuration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_PARLEY_HOST.to_string(),
            port: DEFAULT_PARLEY_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            auth: AuthConfig::default(),
            razorpay: RazorpayConfig::default(),
            webhook_hmac_checks: true,
            free_chat_allowance: DEFAULT_FREE_CHAT_ALLOWANCE,
            external_call_timeout: DEFAULT_EXTERNAL_CALL_TIMEOUT,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("PARLEY_HOST").ok().unwrap_or_else(|| DEFAULT_PARLEY_HOST.into());
        let port = env::var("PARLEY_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for PARLEY_PORT. {e} Using the default, {DEFAULT_PARLEY_PORT}, \
                         instead."
                    );
                    DEFAULT_PARLEY_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_PARLEY_PORT);
        let database_url = env::var("PARLEY_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ PARLEY_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let db_max_connections =
            parse_env_or("PARLEY_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS, |s| s.parse::<u32>().ok());
        let external_call_timeout = parse_env_or("PARLEY_EXTERNAL_CALL_TIMEOUT_SECS", DEFAULT_EXTERNAL_CALL_TIMEOUT, |s| {
            s.parse::<u64>().ok().map(StdDuration::from_secs)
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let razorpay = RazorpayConfig { timeout: external_call_timeout, ..RazorpayConfig::new_from_env_or_default() };
        let webhook_hmac_checks = parse_boolean_flag(env::var("PARLEY_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !webhook_hmac_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Anyone can post fake payment events to /webhook.");
        }
        let free_chat_allowance = parse_env_or("PARLEY_FREE_CHAT_ALLOWANCE", DEFAULT_FREE_CHAT_ALLOWANCE, |s| {
            s.parse::<i64>().ok().filter(|n| *n >= 0)
        });
        Self {
            host,
            port,
            database_url,
            db_max_connections,
            auth,
            razorpay,
            webhook_hmac_checks,
            free_chat_allowance,
            external_call_timeout,
        }
    }
}

fn parse_env_or<T: std::fmt::Debug, F>(name: &str, default: T, parse: F) -> T
where F: FnOnce(&str) -> Option<T> {
    match env::var(name) {
        Ok(s) => parse(s.trim()).unwrap_or_else(|| {
            warn!("🪛️ Invalid configuration value for {name}: {s}. Using the default, {default:?}, instead.");
            default
        }),
        Err(_) => {
            info!("🪛️ {name} is not set. Using the default value of {default:?}.");
            default
        },
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 secret used to sign and verify session tokens.
    pub jwt_secret: Secret<String>,
    /// Every session token is valid for exactly this long after it is issued.
    pub session_duration: Duration,
    /// The OAuth client id that identity assertions must be addressed to.
    pub google_client_id: String,
    pub google_certs_url: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since all sessions will be invalidated when the server restarts. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(64).map(char::from).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => match writeln!(f, "{secret}") {
                Ok(()) => warn!(
                    "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, you \
                     are doing it wrong! Set the PARLEY_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                    p.to_str().unwrap_or("???")
                ),
                Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret.");
            },
        }
        Self {
            jwt_secret: Secret::new(secret),
            session_duration: session_duration_from_env(),
            google_client_id: google_client_id_from_env(),
            google_certs_url: google_certs_url_from_env(),
        }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let jwt_secret =
            env::var("PARLEY_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} PARLEY_JWT_SECRET")))?;
        if jwt_secret.len() < 32 {
            return Err(ServerError::ConfigurationError(
                "PARLEY_JWT_SECRET must be at least 32 characters long.".to_string(),
            ));
        }
        Ok(Self {
            jwt_secret: Secret::new(jwt_secret),
            session_duration: session_duration_from_env(),
            google_client_id: google_client_id_from_env(),
            google_certs_url: google_certs_url_from_env(),
        })
    }
}

fn session_duration_from_env() -> Duration {
    parse_env_or("PARLEY_SESSION_DURATION_HOURS", Duration::hours(DEFAULT_SESSION_HOURS), |s| {
        s.parse::<i64>().ok().filter(|h| *h > 0).map(Duration::hours)
    })
}

fn google_client_id_from_env() -> String {
    env::var("PARLEY_GOOGLE_CLIENT_ID").ok().unwrap_or_else(|| {
        error!("🪛️ PARLEY_GOOGLE_CLIENT_ID is not set. Every Google sign-in will be rejected until it is.");
        String::default()
    })
}

fn google_certs_url_from_env() -> String {
    env::var("PARLEY_GOOGLE_CERTS_URL").ok().unwrap_or_else(|| DEFAULT_GOOGLE_CERTS_URL.to_string())
}
