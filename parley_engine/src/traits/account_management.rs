use thiserror::Error;

use crate::db_types::{UserAccount, VerifiedIdentity};

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}

/// The `AccountManagement` trait defines behaviour for recording who has signed in.
///
/// Profiles are keyed by the identity provider's stable subject id. Email, display name and picture are refreshed on
/// every login, but nothing else in the system relies on them.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Creates the user record for a newly verified identity, or refreshes the presentation fields and last-login time
    /// of an existing one. New users also receive a free-tier entitlement record. Returns true if a record was written.
    async fn create_or_update_user_session(&self, identity: &VerifiedIdentity) -> Result<bool, AccountApiError>;

    /// Fetches the stored profile and entitlement counters for the subject. If the subject has never signed in, `None`
    /// is returned.
    async fn fetch_user_account(&self, subject: &str) -> Result<Option<UserAccount>, AccountApiError>;
}
