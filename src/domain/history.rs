//! Daily history buckets of pool-level deltas.

use crate::domain::{Decimal, Timestamp, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};

/// One-day aggregation window of pool-level activity.
///
/// Delta fields are summed across the day's events; `share_age`,
/// `share_supply` and `ratio` are snapshots of the pool state after the
/// bucket's most recent event (last write wins). Buckets are created lazily
/// and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryBucket {
    /// Day index (`timestamp / 86400`); the storage key.
    pub day: i64,
    /// Day-aligned start timestamp of the bucket.
    pub date: Timestamp,
    /// Shares minted within the day.
    pub shares_minted: Decimal,
    /// Shares burned within the day.
    pub shares_burned: Decimal,
    /// Asset staked within the day.
    pub staked_asset: Decimal,
    /// Reference-currency value of `staked_asset`.
    pub staked_asset_value: Decimal,
    /// Asset harvested within the day.
    pub harvested_asset: Decimal,
    /// Reference-currency value of `harvested_asset`.
    pub harvested_asset_value: Decimal,
    /// Pool share-age after the bucket's last event (snapshot).
    pub share_age: Decimal,
    /// Share-age destroyed within the day.
    pub share_age_destroyed: Decimal,
    /// Share supply after the bucket's last event (snapshot).
    pub share_supply: Decimal,
    /// Pool ratio after the bucket's last event (snapshot).
    pub ratio: Decimal,
}

impl HistoryBucket {
    /// Day index for a timestamp.
    pub fn day_of(timestamp: Timestamp) -> i64 {
        timestamp.day_index()
    }

    /// Create a zeroed bucket for the given day.
    pub fn new(day: i64) -> Self {
        HistoryBucket {
            day,
            date: Timestamp::new(day * SECONDS_PER_DAY),
            shares_minted: Decimal::zero(),
            shares_burned: Decimal::zero(),
            staked_asset: Decimal::zero(),
            staked_asset_value: Decimal::zero(),
            harvested_asset: Decimal::zero(),
            harvested_asset_value: Decimal::zero(),
            share_age: Decimal::zero(),
            share_age_destroyed: Decimal::zero(),
            share_supply: Decimal::zero(),
            ratio: Decimal::zero(),
        }
    }
}
