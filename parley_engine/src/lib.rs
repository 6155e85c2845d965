//! Parley Engine
//!
//! The Parley engine holds the transport-agnostic core of the Parley premium-chat backend. It knows nothing about HTTP;
//! the server crate translates its results into responses.
//!
//! The library is divided into three main sections:
//! 1. The backend contracts ([`mod@traits`]). The engine never talks to a database directly. Anything that can store
//!    user sessions, entitlement counters and payment records implements [`AccountManagement`],
//!    [`EntitlementManagement`] and [`PaymentManagement`].
//! 2. The public API ([`mod@api`]). [`AccountApi`], [`EntitlementApi`] and [`PaymentApi`] wrap a backend and provide the
//!    operations the server needs. [`EntitlementApi`] is the entitlement gate that decides whether a verified user may
//!    send another chat message.
//! 3. A concrete SQLite backend ([`SqliteDatabase`]), enabled by the default `sqlite` feature.
pub mod api;
pub mod db_types;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use api::{
    accounts_api::AccountApi,
    admission::{AdmissionDecision, QuotaExceeded, QUOTA_EXCEEDED_MESSAGE},
    entitlement_api::EntitlementApi,
    payment_api::PaymentApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    AccountApiError,
    AccountManagement,
    EntitlementApiError,
    EntitlementManagement,
    PaymentApiError,
    PaymentManagement,
    UpgradeResult,
};

/// The number of free chats a brand-new user starts with, unless configured otherwise.
pub const DEFAULT_FREE_CHAT_ALLOWANCE: i64 = 5;
