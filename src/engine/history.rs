//! History aggregation: pool-level deltas folded into daily buckets.

use crate::domain::{Decimal, HistoryBucket, Pool};

/// Overwrite the bucket's pool snapshots with current post-update values.
/// Within a day the last event wins.
pub fn record_snapshot(bucket: &mut HistoryBucket, pool: &Pool) {
    bucket.share_age = pool.share_age;
    bucket.share_supply = pool.total_shares;
    bucket.ratio = pool.ratio;
}

/// Fold a mint's deltas into the bucket and refresh the snapshots.
pub fn record_mint(
    bucket: &mut HistoryBucket,
    pool: &Pool,
    shares: Decimal,
    asset: Decimal,
    value: Decimal,
) {
    bucket.shares_minted += shares;
    bucket.staked_asset += asset;
    bucket.staked_asset_value += value;
    record_snapshot(bucket, pool);
}

/// Fold a burn's deltas into the bucket and refresh the snapshots.
pub fn record_burn(
    bucket: &mut HistoryBucket,
    pool: &Pool,
    shares: Decimal,
    asset: Decimal,
    value: Decimal,
    age_destroyed: Decimal,
) {
    bucket.shares_burned += shares;
    bucket.harvested_asset += asset;
    bucket.harvested_asset_value += value;
    bucket.share_age_destroyed += age_destroyed;
    record_snapshot(bucket, pool);
}
