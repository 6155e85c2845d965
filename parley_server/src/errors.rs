use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use parley_engine::{AccountApiError, EntitlementApiError, PaymentApiError, QuotaExceeded};
use razorpay_tools::RazorpayApiError;
use thiserror::Error;

use crate::integrations::google::{AssertionError, KeySetError};

pub const GENERIC_ERROR_MESSAGE: &str = "An internal error occurred. Please try again later.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("The payment gateway returned an error. {0}")]
    PaymentGatewayError(String),
    #[error("The identity provider could not be reached. {0}")]
    IdentityProviderUnavailable(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Missing required fields: {0}")]
    MissingFields(String),
    #[error("Invalid signature")]
    SignatureMismatch,
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("Could not serialize access token. {0}")]
    CouldNotSerializeAccessToken(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{}", .0.message)]
    QuotaExceeded(QuotaExceeded),
}

impl ServerError {
    fn is_internal(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::MissingFields(_) => StatusCode::BAD_REQUEST,
            Self::SignatureMismatch => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            Self::QuotaExceeded(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::PaymentGatewayError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IdentityProviderUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::CouldNotSerializeAccessToken(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            Self::QuotaExceeded(q) => {
                serde_json::to_value(q).unwrap_or_else(|_| serde_json::json!({ "error": q.message }))
            },
            e if e.is_internal() => {
                // The cause stays in the logs. Clients only ever see the generic message.
                error!("💻️ {e}");
                serde_json::json!({ "error": GENERIC_ERROR_MESSAGE })
            },
            e => serde_json::json!({ "error": e.to_string() }),
        };
        HttpResponse::build(self.status_code()).insert_header(ContentType::json()).body(body.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("The identity assertion is invalid. {0}")]
    InvalidAssertion(String),
    #[error("The session token has expired.")]
    Expired,
    #[error("The session token is malformed. {0}")]
    Malformed(String),
    #[error("No bearer token was provided.")]
    MissingToken,
}

impl From<AccountApiError> for ServerError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<EntitlementApiError> for ServerError {
    fn from(e: EntitlementApiError) -> Self {
        match e {
            EntitlementApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<PaymentApiError> for ServerError {
    fn from(e: PaymentApiError) -> Self {
        match e {
            PaymentApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<RazorpayApiError> for ServerError {
    fn from(e: RazorpayApiError) -> Self {
        Self::PaymentGatewayError(e.to_string())
    }
}

impl From<KeySetError> for ServerError {
    fn from(e: KeySetError) -> Self {
        Self::IdentityProviderUnavailable(e.to_string())
    }
}

impl From<AssertionError> for ServerError {
    fn from(e: AssertionError) -> Self {
        match e {
            AssertionError::Rejected(e) => Self::AuthenticationError(e),
            AssertionError::KeySource(e) => e.into(),
        }
    }
}
