use serde::{Deserialize, Serialize};

pub const QUOTA_EXCEEDED_MESSAGE: &str = "You've used all your free chats. Upgrade to premium for unlimited access!";

/// Returned to clients when a non-premium user has no free chats left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaExceeded {
    #[serde(rename = "error")]
    pub message: String,
    pub remaining_chats: i64,
    pub is_premium: bool,
    pub upgrade_required: bool,
}

impl Default for QuotaExceeded {
    fn default() -> Self {
        Self {
            message: QUOTA_EXCEEDED_MESSAGE.to_string(),
            remaining_chats: 0,
            is_premium: false,
            upgrade_required: true,
        }
    }
}

/// The verdict of the entitlement gate for a single chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// The request may proceed. `remaining_chats` is `None` for premium users, who have no limit.
    Admitted { is_premium: bool, remaining_chats: Option<i64> },
    Rejected(QuotaExceeded),
}

impl AdmissionDecision {
    pub fn premium() -> Self {
        Self::Admitted { is_premium: true, remaining_chats: None }
    }

    pub fn free(remaining_chats: i64) -> Self {
        Self::Admitted { is_premium: false, remaining_chats: Some(remaining_chats) }
    }

    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}
