//! Storage Module
//!
//! SQLite-backed append-only event log (C5) and key-value store (C6)
//! sharing one database file and connection pair.

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{Result, Storage, StorageError};
