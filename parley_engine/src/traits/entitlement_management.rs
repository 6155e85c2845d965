use thiserror::Error;

use crate::db_types::EntitlementState;

#[derive(Debug, Clone, Error)]
pub enum EntitlementApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for EntitlementApiError {
    fn from(e: sqlx::Error) -> Self {
        EntitlementApiError::DatabaseError(e.to_string())
    }
}

/// Read and consume per-subject chat entitlements.
///
/// Errors returned from these methods must only represent a failure to talk to the store. A subject without a record
/// is `Ok(None)`, and an exhausted quota is a normal result, never an error.
#[allow(async_fn_in_trait)]
pub trait EntitlementManagement {
    /// Fetches the premium flag and free-tier counters for the subject, or `None` if the store has no record of it.
    async fn fetch_entitlement(&self, subject: &str) -> Result<Option<EntitlementState>, EntitlementApiError>;

    /// Atomically consumes one free chat for the subject, if any remain, and returns the number of free chats left
    /// afterwards. If the subject has no free chats left, `Ok(None)` is returned and nothing changes.
    ///
    /// Implementations must make the check and the decrement a single atomic step, so that two concurrent callers can
    /// never both consume the last chat. Subjects without a record start with the backend's free allowance.
    async fn try_consume_free_chat(&self, subject: &str) -> Result<Option<i64>, EntitlementApiError>;
}
