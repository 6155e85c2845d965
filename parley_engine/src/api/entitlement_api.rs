//! The entitlement gate.
//!
//! [`EntitlementApi`] decides whether a verified subject may send another chat message. Premium subjects are always
//! admitted. Everyone else is admitted while they have free chats left, and each admission consumes one.
use std::fmt::Debug;

use log::*;

use crate::{
    api::admission::{AdmissionDecision, QuotaExceeded},
    db_types::EntitlementState,
    traits::{EntitlementApiError, EntitlementManagement},
    DEFAULT_FREE_CHAT_ALLOWANCE,
};

pub struct EntitlementApi<B> {
    db: B,
    free_chat_allowance: i64,
}

impl<B: Debug> Debug for EntitlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntitlementApi ({:?}, allowance: {})", self.db, self.free_chat_allowance)
    }
}

impl<B> EntitlementApi<B>
where B: EntitlementManagement
{
    pub fn new(db: B) -> Self {
        Self { db, free_chat_allowance: DEFAULT_FREE_CHAT_ALLOWANCE }
    }

    /// Sets the number of free chats assumed for subjects the store has no record of.
    pub fn with_free_chat_allowance(mut self, allowance: i64) -> Self {
        self.free_chat_allowance = allowance.max(0);
        self
    }

    pub fn free_chat_allowance(&self) -> i64 {
        self.free_chat_allowance
    }

    /// The current entitlement state of the subject. Subjects without a record are treated as fresh free-tier users.
    pub async fn entitlement_for(&self, subject: &str) -> Result<EntitlementState, EntitlementApiError> {
        let state = self.db.fetch_entitlement(subject).await?;
        Ok(state.unwrap_or_else(|| {
            trace!("💬️ No entitlement record for {subject}. Assuming a fresh free-tier state.");
            EntitlementState::free(self.free_chat_allowance)
        }))
    }

    /// Reports what [`Self::admit_chat`] would decide right now, without consuming anything.
    pub async fn check_admission(&self, subject: &str) -> Result<AdmissionDecision, EntitlementApiError> {
        let state = self.entitlement_for(subject).await?;
        let decision = match (state.is_premium, state.remaining_free_chats) {
            (true, _) => AdmissionDecision::premium(),
            (false, n) if n > 0 => AdmissionDecision::free(n),
            (false, _) => AdmissionDecision::Rejected(QuotaExceeded::default()),
        };
        Ok(decision)
    }

    /// Admits a chat request for the subject, consuming one free chat if they are not premium.
    ///
    /// A store failure is returned as an error. It is never turned into a rejection, so callers can tell "you are out
    /// of chats" apart from "we could not check".
    pub async fn admit_chat(&self, subject: &str) -> Result<AdmissionDecision, EntitlementApiError> {
        let state = self.db.fetch_entitlement(subject).await?;
        if state.map(|s| s.is_premium).unwrap_or(false) {
            trace!("💬️ {subject} is premium. Admitted.");
            return Ok(AdmissionDecision::premium());
        }
        match self.db.try_consume_free_chat(subject).await? {
            Some(remaining) => {
                debug!("💬️ {subject} used a free chat. {remaining} remaining.");
                Ok(AdmissionDecision::free(remaining))
            },
            None => {
                // An upgrade may have landed between the premium check and the consume
                let state = self.db.fetch_entitlement(subject).await?;
                if state.map(|s| s.is_premium).unwrap_or(false) {
                    debug!("💬️ {subject} became premium while their chat was being admitted. Admitted.");
                    return Ok(AdmissionDecision::premium());
                }
                info!("💬️ {subject} has no free chats left. Rejected.");
                Ok(AdmissionDecision::Rejected(QuotaExceeded::default()))
            },
        }
    }
}
