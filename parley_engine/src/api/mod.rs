//! The public API of the Parley engine.
//!
//! Each `XxxApi` struct wraps a backend implementing the relevant trait(s) from [`crate::traits`]. The server holds one
//! of each and never calls the backend directly.
pub mod accounts_api;
pub mod admission;
pub mod entitlement_api;
pub mod payment_api;
