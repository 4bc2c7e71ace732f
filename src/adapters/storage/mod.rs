//! Storage adapters
//!
//! - SQLite: single-file database with embedded migrations

pub mod sqlite;

pub use sqlite::SqliteStorage;
