//! The write-side state machine: ratio refresh and the mint / burn / peer
//! transfer handlers.
//!
//! Each handler mutates the records it is given in one synchronous pass.
//! Callers load the records, invoke exactly one handler per event, and
//! persist every mutated record before touching the next event.

use crate::domain::{Address, Decimal, HistoryBucket, Holder, Pool, Timestamp, TransferEvent};
use crate::engine::{age, cost_basis, history, Recognized};
use tracing::info;

/// Point-in-time chain reads taken at event-processing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainReadings {
    /// Current share-token total supply.
    pub share_supply: Decimal,
    /// Current staked-asset balance held by the pool.
    pub staked_balance: Decimal,
    /// Current staked-asset price in the reference currency.
    pub asset_price: Decimal,
}

/// What a handler did, for logging and sync statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Minted {
        shares: Decimal,
        asset: Decimal,
        value: Decimal,
    },
    Burned {
        shares: Decimal,
        asset: Decimal,
        value: Decimal,
    },
    Transferred {
        shares: Decimal,
        asset: Decimal,
        value: Decimal,
        recognized: Option<Recognized>,
    },
}

/// Recompute the pool's supply, staked balance and ratio from the two
/// authoritative reads. Must run once per event before any conversion.
///
/// With no shares outstanding the ratio is set to zero, so every dependent
/// conversion in the event yields zero deltas instead of dividing by zero.
pub fn refresh_pool(pool: &mut Pool, readings: &ChainReadings) {
    pool.total_shares = readings.share_supply;
    pool.total_staked = readings.staked_balance;
    pool.ratio = if pool.total_shares.is_zero() {
        Decimal::zero()
    } else {
        pool.total_staked / pool.total_shares
    };
}

/// Handle a mint: shares created in exchange for staked asset.
pub fn apply_mint(
    pool: &mut Pool,
    holder: &mut Holder,
    bucket: &mut HistoryBucket,
    event: &TransferEvent,
    price: Decimal,
) -> Applied {
    let shares = event.value;
    let asset = shares * pool.ratio;
    let value = asset * price;
    let t = event.timestamp;

    info!(
        "{} minted {} shares in exchange for {} asset - staked before {} staked after {}",
        holder.id,
        shares,
        asset,
        holder.staked_asset,
        holder.staked_asset + asset,
    );

    if holder.share_balance.is_zero() {
        info!("{} entered the pool", holder.id);
        holder.pool = Some(pool.id.clone());
    }

    holder.shares_minted += shares;
    holder.staked_asset += asset;
    holder.staked_asset_value += value;
    holder.share_age += age::accrued_age(holder.share_balance, holder.updated_at, t);
    holder.share_balance += shares;
    holder.updated_at = t;

    pool.share_age += age::accrued_age(pool.net_shares(), pool.updated_at, t);
    pool.shares_minted += shares;
    pool.staked_asset += asset;
    pool.staked_asset_value += value;
    pool.updated_at = t;

    history::record_mint(bucket, pool, shares, asset, value);

    Applied::Minted {
        shares,
        asset,
        value,
    }
}

/// Handle a burn: shares destroyed, asset harvested out of the pool.
pub fn apply_burn(
    pool: &mut Pool,
    holder: &mut Holder,
    bucket: &mut HistoryBucket,
    event: &TransferEvent,
    price: Decimal,
) -> Applied {
    let shares = event.value;
    let asset = shares * pool.ratio;
    let value = asset * price;
    let t = event.timestamp;

    info!("{} burned {} shares for {} asset", holder.id, shares, asset);

    holder.shares_burned += shares;
    holder.harvested_asset += asset;
    holder.harvested_asset_value += value;

    // Accrue on the pre-burn balance, then remove the proportional slice.
    holder.share_age += age::accrued_age(holder.share_balance, holder.updated_at, t);
    let age_destroyed = age::removable_age(holder.share_age, holder.share_balance, shares);
    holder.share_age -= age_destroyed;
    holder.share_age_destroyed += age_destroyed;

    holder.share_balance -= shares;
    if holder.share_balance.is_zero() {
        info!("{} left the pool", holder.id);
        holder.pool = None;
    }
    holder.updated_at = t;

    pool.share_age += age::accrued_age(pool.net_shares(), pool.updated_at, t);
    pool.share_age -= age_destroyed;
    pool.share_age_destroyed += age_destroyed;
    pool.shares_burned += shares;
    pool.harvested_asset += asset;
    pool.harvested_asset_value += value;
    pool.updated_at = t;

    history::record_burn(bucket, pool, shares, asset, value, age_destroyed);

    Applied::Burned {
        shares,
        asset,
        value,
    }
}

/// Sender side of a peer transfer. Returns the age slice travelling with
/// the shares, to be handed to [`apply_peer_in`].
pub fn apply_peer_out(
    sender: &mut Holder,
    shares: Decimal,
    asset: Decimal,
    value: Decimal,
    t: Timestamp,
) -> Decimal {
    sender.share_age += age::accrued_age(sender.share_balance, sender.updated_at, t);
    let age_transferred = age::removable_age(sender.share_age, sender.share_balance, shares);
    sender.share_age -= age_transferred;
    sender.updated_at = t;

    sender.share_balance -= shares;
    sender.shares_out += shares;
    sender.asset_out += asset;
    sender.value_out += value;

    if sender.share_balance.is_zero() {
        info!("{} left the pool by transfer out", sender.id);
        sender.pool = None;
    }

    age_transferred
}

/// Receiver side of a peer transfer: own accrual plus the transferred age
/// slice, in-counters, then the cost-basis recognition gate.
pub fn apply_peer_in(
    pool_id: &Address,
    receiver: &mut Holder,
    age_transferred: Decimal,
    shares: Decimal,
    asset: Decimal,
    value: Decimal,
    t: Timestamp,
) -> Option<Recognized> {
    if !receiver.is_member() {
        info!("{} entered the pool by transfer in", receiver.id);
        receiver.pool = Some(pool_id.clone());
    }

    receiver.share_age +=
        age::accrued_age(receiver.share_balance, receiver.updated_at, t) + age_transferred;
    receiver.updated_at = t;

    receiver.share_balance += shares;
    receiver.shares_in += shares;
    receiver.asset_in += asset;
    receiver.value_in += value;

    cost_basis::recognize_inbound(receiver)
}

/// Pool-side bookkeeping for a peer transfer. The pool's balance is
/// unchanged, so this is only an age-accrual checkpoint plus a bucket
/// snapshot refresh.
pub fn apply_peer_checkpoint(pool: &mut Pool, bucket: &mut HistoryBucket, t: Timestamp) {
    pool.share_age += age::accrued_age(pool.net_shares(), pool.updated_at, t);
    pool.updated_at = t;
    history::record_snapshot(bucket, pool);
}

/// Handle a peer transfer between two distinct holders: shares move,
/// carrying their proportional age slice; the receiver may recognize
/// net-new staked value via the offset gate.
pub fn apply_peer(
    pool: &mut Pool,
    sender: &mut Holder,
    receiver: &mut Holder,
    bucket: &mut HistoryBucket,
    event: &TransferEvent,
    price: Decimal,
) -> Applied {
    let shares = event.value;
    let asset = shares * pool.ratio;
    let value = asset * price;
    let t = event.timestamp;

    info!(
        "transferred {} shares from {} to {}",
        shares, sender.id, receiver.id
    );

    let age_transferred = apply_peer_out(sender, shares, asset, value, t);
    let recognized = apply_peer_in(&pool.id, receiver, age_transferred, shares, asset, value, t);
    if let Some(r) = recognized {
        info!(
            "{} received a transfer of {} shares from {}, recognized {} asset as staked",
            receiver.id, shares, sender.id, r.asset
        );
    }

    apply_peer_checkpoint(pool, bucket, t);

    Applied::Transferred {
        shares,
        asset,
        value,
        recognized,
    }
}
