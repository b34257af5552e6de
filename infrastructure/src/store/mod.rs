//! Durable state store backed by SQLite

mod sqlite;

pub use sqlite::SqliteStore;
