//! Buyback tally: lifetime accounting of the fee-conversion revenue stream.
//!
//! A designated converter contract swaps accumulated fees into the staked
//! asset and delivers it to the pool. The tally records each such swap and
//! keeps lifetime totals per converter and per transaction origin. It
//! shares no state with the core ledger.

use crate::domain::{Address, Decimal, SwapEvent, Timestamp, TxHash};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Lifetime totals for the converter address (singleton record).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuybackTotals {
    /// Converter address; the storage key.
    pub id: Address,
    /// Lifetime asset delivered to the pool.
    pub asset_served: Decimal,
}

impl BuybackTotals {
    pub fn new(id: Address) -> Self {
        BuybackTotals {
            id,
            asset_served: Decimal::zero(),
        }
    }
}

/// Lifetime totals for one transaction origin that triggered conversions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuybackCaller {
    /// Caller (tx origin) address; the storage key.
    pub id: Address,
    /// Converter this caller served.
    pub converter: Address,
    /// Lifetime asset delivered via this caller's transactions.
    pub asset_served: Decimal,
}

impl BuybackCaller {
    pub fn new(id: Address, converter: Address) -> Self {
        BuybackCaller {
            id,
            converter,
            asset_served: Decimal::zero(),
        }
    }
}

/// One recorded conversion swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyback {
    /// `<pair>-<block>` key.
    pub id: String,
    pub converter: Address,
    pub caller: Address,
    pub pair: Address,
    pub token0: Address,
    pub token1: Address,
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub timestamp: Timestamp,
    /// Asset delivered to the pool by this swap.
    pub asset_served: Decimal,
}

/// Whether a swap is a conversion run: initiated by the converter, or
/// delivering output directly to the pool.
pub fn is_serving(swap: &SwapEvent, converter: &Address, pool: &Address) -> bool {
    swap.sender == *converter || swap.to == *pool
}

/// Record one conversion swap against the converter-wide and per-caller
/// lifetime totals.
pub fn apply_swap(
    totals: &mut BuybackTotals,
    caller: &mut BuybackCaller,
    swap: &SwapEvent,
) -> Buyback {
    let served = swap.amount0_out;

    totals.asset_served += served;
    caller.asset_served += served;

    info!(
        "{} served up {} asset for pair {}-{} at {}",
        caller.id,
        served,
        swap.token0,
        swap.token1,
        swap.timestamp.as_secs()
    );

    Buyback {
        id: format!("{}-{}", swap.pair, swap.block_number),
        converter: totals.id.clone(),
        caller: caller.id.clone(),
        pair: swap.pair.clone(),
        token0: swap.token0.clone(),
        token1: swap.token1.clone(),
        tx_hash: swap.tx_hash.clone(),
        block_number: swap.block_number,
        timestamp: swap.timestamp,
        asset_served: served,
    }
}
