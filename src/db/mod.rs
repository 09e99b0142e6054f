//! SQLite-backed entity storage.
//!
//! This module provides:
//! - Database initialization, pragmas, and schema migrations
//! - The Repository facade: load-by-key and upsert saves for every record

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
