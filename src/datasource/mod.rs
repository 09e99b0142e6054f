//! Chain source abstraction: the event feed and the point-in-time reads
//! the ledger depends on.

use crate::domain::{Decimal, SwapEvent, TransferEvent};
use async_trait::async_trait;
use std::fmt;

pub mod mock;
pub mod rpc;

pub use mock::MockChainSource;
pub use rpc::RpcChainSource;

/// Source of transfer/swap events and live contract reads.
///
/// Implementations must return events ordered by `(block_number,
/// log_index)` and handle their own retry/backoff; the reads are
/// point-in-time queries against current chain state, not event-time
/// snapshots.
#[async_trait]
pub trait ChainSource: Send + Sync + fmt::Debug {
    /// Highest block available upstream.
    async fn latest_block(&self) -> Result<u64, ChainSourceError>;

    /// Share-token transfer events within an inclusive block range.
    async fn fetch_transfers(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, ChainSourceError>;

    /// Swap events on the watched pairs within an inclusive block range.
    /// Empty when no pairs are watched.
    async fn fetch_swaps(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<SwapEvent>, ChainSourceError>;

    /// Current total supply of the share token, in token units.
    async fn share_supply(&self) -> Result<Decimal, ChainSourceError>;

    /// Current staked-asset balance held by the pool, in token units.
    async fn staked_balance(&self) -> Result<Decimal, ChainSourceError>;

    /// Current staked-asset price in the reference currency, derived from
    /// the price pair's reserves.
    async fn reference_price(&self) -> Result<Decimal, ChainSourceError>;
}

/// Error type for chain source operations.
#[derive(Debug, Clone)]
pub enum ChainSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// JSON-RPC level error returned by the node
    RpcError(String),
    /// Parsing error (malformed response, log, or hex word)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
}

impl fmt::Display for ChainSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ChainSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            ChainSourceError::RpcError(msg) => write!(f, "RPC error: {}", msg),
            ChainSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ChainSourceError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for ChainSourceError {}
