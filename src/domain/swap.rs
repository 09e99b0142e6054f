//! Pair-swap events consumed by the buyback tally.

use crate::domain::{Address, Decimal, Timestamp, TxHash};
use serde::{Deserialize, Serialize};

/// A swap on a liquidity pair, as emitted by the pair contract.
///
/// Only the fields the buyback tally reads are carried; `amount0_out` is
/// the bought-back asset quantity in token units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapEvent {
    /// Pair contract the swap executed on.
    pub pair: Address,
    /// Contract that initiated the swap (the fee converter, when relevant).
    pub sender: Address,
    /// Recipient of the output tokens.
    pub to: Address,
    /// Output amount of the pair's token0, in token units.
    pub amount0_out: Decimal,
    /// Externally-owned account that sent the transaction.
    pub tx_origin: Address,
    /// The pair's token0.
    pub token0: Address,
    /// The pair's token1.
    pub token1: Address,
    /// Block the event was emitted in.
    pub block_number: u64,
    /// Block timestamp.
    pub timestamp: Timestamp,
    /// Transaction hash.
    pub tx_hash: TxHash,
}
