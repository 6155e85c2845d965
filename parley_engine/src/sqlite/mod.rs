//! SQLite backend for the Parley engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
