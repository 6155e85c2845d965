//! # Parley server
//! This crate hosts the HTTP server for the Parley premium-chat backend. It is responsible for:
//! * Verifying Google identity assertions and issuing session tokens.
//! * Gating chat requests behind the free-tier quota or a premium subscription.
//! * Creating and verifying Razorpay payment orders, and receiving Razorpay webhooks.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! Public:
//! * `GET /health`: A health check route that returns a 200 OK response.
//! * `POST /auth/google`: Exchanges a Google ID token for a session token.
//! * `POST /payment-failed`: Records a failed checkout and returns a user-facing message.
//! * `POST /webhook`: Razorpay webhook events. Signed with `X-Razorpay-Signature`.
//!
//! Authenticated with `Authorization: Bearer <session token>`:
//! * `GET /me`, `GET /chat/status`, `POST /chat/admit`, `POST /create-order`, `POST /verify-payment`.

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod payment_routes;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
