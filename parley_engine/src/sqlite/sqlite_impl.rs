//! `SqliteDatabase` is a concrete implementation of a Parley engine backend.
//!
//! It implements all the traits defined in the [`crate::traits`] module on top of a single SQLite connection pool.
use std::{fmt::Debug, time::Duration};

use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, entitlements, new_pool, payments, users};
use crate::{
    db_types::{EntitlementState, NewPaymentFailure, PaymentRecord, PremiumPayment, UserAccount, VerifiedIdentity},
    traits::{
        AccountApiError,
        AccountManagement,
        EntitlementApiError,
        EntitlementManagement,
        PaymentApiError,
        PaymentManagement,
        UpgradeResult,
    },
    DEFAULT_FREE_CHAT_ALLOWANCE,
};

const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
    free_chat_allowance: i64,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl AccountManagement for SqliteDatabase {
    async fn create_or_update_user_session(&self, identity: &VerifiedIdentity) -> Result<bool, AccountApiError> {
        let mut tx = self.pool.begin().await?;
        let rows = users::upsert_user(identity, &mut tx).await?;
        entitlements::ensure_entitlement(&identity.external_id, self.free_chat_allowance, &mut tx)
            .await
            .map_err(|e| AccountApiError::DatabaseError(e.to_string()))?;
        tx.commit().await?;
        trace!("🗃️ Upserted user {identity} ({rows} rows)");
        Ok(rows > 0)
    }

    async fn fetch_user_account(&self, subject: &str) -> Result<Option<UserAccount>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        users::fetch_user_account(subject, self.free_chat_allowance, &mut conn).await
    }
}

impl EntitlementManagement for SqliteDatabase {
    async fn fetch_entitlement(&self, subject: &str) -> Result<Option<EntitlementState>, EntitlementApiError> {
        let mut conn = self.pool.acquire().await?;
        entitlements::fetch_entitlement(subject, &mut conn).await
    }

    async fn try_consume_free_chat(&self, subject: &str) -> Result<Option<i64>, EntitlementApiError> {
        let mut conn = self.pool.acquire().await?;
        entitlements::ensure_entitlement(subject, self.free_chat_allowance, &mut conn).await?;
        let remaining = entitlements::consume_free_chat(subject, &mut conn).await?;
        trace!("🗃️ Free chat consumption for {subject}: {remaining:?}");
        Ok(remaining)
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn fetch_payment_by_external_id(&self, payment_id: &str) -> Result<Option<PaymentRecord>, PaymentApiError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment(payment_id, &mut conn).await
    }

    async fn upgrade_to_premium(
        &self,
        subject: &str,
        payment: &PremiumPayment,
    ) -> Result<UpgradeResult, PaymentApiError> {
        let mut tx = self.pool.begin().await?;
        if !payments::insert_payment(subject, payment, &mut tx).await? {
            tx.rollback().await?;
            debug!("🗃️ Payment {} is already on record", payment.payment_id);
            return Ok(UpgradeResult::AlreadyProcessed);
        }
        entitlements::grant_premium(subject, self.free_chat_allowance, &mut tx)
            .await
            .map_err(|e| PaymentApiError::DatabaseError(e.to_string()))?;
        tx.commit().await?;
        debug!("🗃️ Recorded payment {} and granted premium to {subject}", payment.payment_id);
        Ok(UpgradeResult::Upgraded)
    }

    async fn log_payment_failure(&self, subject: &str, failure: &NewPaymentFailure) -> Result<(), PaymentApiError> {
        let mut conn = self.pool.acquire().await?;
        let id = payments::insert_failure(subject, failure, &mut conn).await?;
        debug!("🗃️ Payment failure #{id} logged for order {}", failure.order_id);
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `PARLEY_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections, DEFAULT_ACQUIRE_TIMEOUT).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections, acquire_timeout).await?;
        let url = url.to_string();
        Ok(Self { url, pool, free_chat_allowance: DEFAULT_FREE_CHAT_ALLOWANCE })
    }

    /// Sets the number of free chats that new users start with.
    pub fn with_free_chat_allowance(mut self, allowance: i64) -> Self {
        self.free_chat_allowance = allowance.max(0);
        self
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
