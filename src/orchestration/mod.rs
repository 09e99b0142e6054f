//! Orchestration: the strictly sequential event applier.

pub mod indexer;

pub use indexer::{IndexError, Indexer, SyncStats};
