//! The pool-wide accounting record.

use crate::domain::{Address, Decimal, Timestamp};
use serde::{Deserialize, Serialize};

/// Singleton-per-pool-address record of pool-wide aggregates.
///
/// `total_shares`, `total_staked` and `ratio` are refreshed from live chain
/// reads on every event; the remaining fields are lifetime accumulators
/// maintained by the ledger itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Pool (share token) address; the storage key.
    pub id: Address,
    /// Current share supply, refreshed each event.
    pub total_shares: Decimal,
    /// Current staked-asset balance held by the pool, refreshed each event.
    pub total_staked: Decimal,
    /// Assets per share: `total_staked / total_shares`, zero while no
    /// shares are outstanding.
    pub ratio: Decimal,
    /// Lifetime shares minted.
    pub shares_minted: Decimal,
    /// Lifetime shares burned.
    pub shares_burned: Decimal,
    /// Running share-age integral (share-quantity x days held).
    pub share_age: Decimal,
    /// Lifetime share-age removed by burns.
    pub share_age_destroyed: Decimal,
    /// Lifetime staked asset entering the pool via mints.
    pub staked_asset: Decimal,
    /// Reference-currency value of `staked_asset` at event time.
    pub staked_asset_value: Decimal,
    /// Lifetime asset leaving the pool via burns.
    pub harvested_asset: Decimal,
    /// Reference-currency value of `harvested_asset` at event time.
    pub harvested_asset_value: Decimal,
    /// Timestamp of the last mutation; age accrues from here.
    pub updated_at: Timestamp,
}

impl Pool {
    /// Create a zeroed pool record, as on first appearance.
    pub fn new(id: Address, now: Timestamp) -> Self {
        Pool {
            id,
            total_shares: Decimal::zero(),
            total_staked: Decimal::zero(),
            ratio: Decimal::zero(),
            shares_minted: Decimal::zero(),
            shares_burned: Decimal::zero(),
            share_age: Decimal::zero(),
            share_age_destroyed: Decimal::zero(),
            staked_asset: Decimal::zero(),
            staked_asset_value: Decimal::zero(),
            harvested_asset: Decimal::zero(),
            harvested_asset_value: Decimal::zero(),
            updated_at: now,
        }
    }

    /// The pool's aggregate share balance as seen by its own counters.
    ///
    /// Equals `total_shares` whenever every transfer event has been
    /// processed; used as the balance term for pool-level age accrual.
    pub fn net_shares(&self) -> Decimal {
        self.shares_minted - self.shares_burned
    }
}
