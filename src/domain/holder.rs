//! The per-holder accounting record.

use crate::domain::{Address, Decimal, Timestamp};
use serde::{Deserialize, Serialize};

/// Per-address accounting state, keyed by holder address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holder {
    /// Holder address; the storage key.
    pub id: Address,
    /// Pool membership: the pool address while `share_balance > 0`,
    /// absent once the balance returns to zero.
    pub pool: Option<Address>,
    /// Current share balance.
    pub share_balance: Decimal,
    /// Lifetime shares minted to this holder.
    pub shares_minted: Decimal,
    /// Lifetime shares burned by this holder.
    pub shares_burned: Decimal,
    /// Lifetime staked asset recognized for this holder (mints plus
    /// net-new inbound transfers).
    pub staked_asset: Decimal,
    /// Reference-currency value of `staked_asset` at recognition time.
    pub staked_asset_value: Decimal,
    /// Lifetime asset harvested via burns.
    pub harvested_asset: Decimal,
    /// Reference-currency value of `harvested_asset` at event time.
    pub harvested_asset_value: Decimal,
    /// Running share-age integral (share-quantity x days held).
    pub share_age: Decimal,
    /// Lifetime share-age removed by burns.
    pub share_age_destroyed: Decimal,
    /// Shares sent via peer transfers.
    pub shares_out: Decimal,
    /// Asset conversion of `shares_out` at transfer-time ratio.
    pub asset_out: Decimal,
    /// Reference-currency conversion of `asset_out`.
    pub value_out: Decimal,
    /// Shares received via peer transfers.
    pub shares_in: Decimal,
    /// Asset conversion of `shares_in` at transfer-time ratio.
    pub asset_in: Decimal,
    /// Reference-currency conversion of `asset_in`.
    pub value_in: Decimal,
    /// Inbound shares already recognized as staked value; prevents
    /// re-crediting the same pass-through shares twice.
    pub shares_offset: Decimal,
    /// Asset portion already recognized.
    pub asset_offset: Decimal,
    /// Reference-currency portion already recognized.
    pub value_offset: Decimal,
    /// Timestamp of the last mutation; age accrues from here.
    pub updated_at: Timestamp,
}

impl Holder {
    /// Create a zeroed holder record, as on first appearance.
    ///
    /// `updated_at` starts at the creating event's timestamp so the first
    /// age accrual spans zero days.
    pub fn new(id: Address, now: Timestamp) -> Self {
        Holder {
            id,
            pool: None,
            share_balance: Decimal::zero(),
            shares_minted: Decimal::zero(),
            shares_burned: Decimal::zero(),
            staked_asset: Decimal::zero(),
            staked_asset_value: Decimal::zero(),
            harvested_asset: Decimal::zero(),
            harvested_asset_value: Decimal::zero(),
            share_age: Decimal::zero(),
            share_age_destroyed: Decimal::zero(),
            shares_out: Decimal::zero(),
            asset_out: Decimal::zero(),
            value_out: Decimal::zero(),
            shares_in: Decimal::zero(),
            asset_in: Decimal::zero(),
            value_in: Decimal::zero(),
            shares_offset: Decimal::zero(),
            asset_offset: Decimal::zero(),
            value_offset: Decimal::zero(),
            updated_at: now,
        }
    }

    /// Whether the holder currently participates in the pool.
    pub fn is_member(&self) -> bool {
        self.pool.is_some()
    }
}
