//! Unifies API for recording sign-ins and reading user profiles.

use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{UserAccount, VerifiedIdentity},
    traits::{AccountApiError, AccountManagement},
};

pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Records a successful sign-in for the identity, creating the user on first login.
    pub async fn record_login(&self, identity: &VerifiedIdentity) -> Result<(), AccountApiError> {
        let written = self.db.create_or_update_user_session(identity).await?;
        if written {
            debug!("🔐️ Session recorded for {identity}");
        } else {
            warn!("🔐️ Session for {identity} was verified, but no user record was written");
        }
        Ok(())
    }

    /// Fetches the stored profile for the subject. If the subject has never signed in, `None` is returned.
    pub async fn account_for(&self, subject: &str) -> Result<Option<UserAccount>, AccountApiError> {
        self.db.fetch_user_account(subject).await
    }
}
