//! # Backend contracts
//!
//! This module defines the interface contracts that storage *backends* must satisfy to be used by the Parley engine.
//! The engine treats the store as an opaque document service, so the contracts are deliberately narrow.
//!
//! * [`AccountManagement`] records user sessions and serves stored user profiles.
//! * [`EntitlementManagement`] reads premium status and free-tier counters, and consumes free chats atomically.
//! * [`PaymentManagement`] handles idempotent premium upgrades and the payment failure log.
mod account_management;
mod entitlement_management;
mod payment_management;

mod data_objects;

pub use account_management::{AccountApiError, AccountManagement};
pub use data_objects::UpgradeResult;
pub use entitlement_management::{EntitlementApiError, EntitlementManagement};
pub use payment_management::{PaymentApiError, PaymentManagement};
