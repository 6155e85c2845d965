//! # SQLite Database methods
//!
//! Low-level SQLite interactions. These are plain functions that accept a `&mut SqliteConnection`, so callers can pass
//! a pooled connection or an open transaction without any other changes.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod entitlements;
pub mod payments;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/parley.db";

pub fn db_url() -> String {
    let result = env::var("PARLEY_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ PARLEY_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32, acquire_timeout: Duration) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await?;
    Ok(pool)
}
