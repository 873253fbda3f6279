//! Persistence implementations.

pub mod sqlite;

pub use sqlite::{DatabasePool, SqliteSessionStore, default_database_url};
