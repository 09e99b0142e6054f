//! Domain types for the share-ledger indexer.
//!
//! This module provides:
//! - Lossless numeric handling via the Decimal wrapper
//! - Domain primitives: Address, Timestamp, TxHash
//! - Chain event types: TransferEvent, SwapEvent
//! - Persisted entity records: Pool, Holder, HistoryBucket

pub mod decimal;
pub mod history;
pub mod holder;
pub mod pool;
pub mod primitives;
pub mod swap;
pub mod transfer;

pub use decimal::Decimal;
pub use history::HistoryBucket;
pub use holder::Holder;
pub use pool::Pool;
pub use primitives::{Address, Timestamp, TxHash, SECONDS_PER_DAY};
pub use swap::SwapEvent;
pub use transfer::{TransferEvent, TransferKind};
