//! Cost-basis recognition for inbound peer transfers.
//!
//! A holder who receives transferred shares has genuinely new staked value
//! only to the extent the inbound total exceeds everything sent out plus
//! everything already recognized. The offset counters mark recognized
//! amounts so that shares merely passing through a holder are never
//! credited twice.

use crate::domain::{Decimal, Holder};

/// Amounts credited to a receiver by one recognition pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recognized {
    /// Net-new share quantity recognized.
    pub shares: Decimal,
    /// Asset amount credited to `staked_asset`.
    pub asset: Decimal,
    /// Reference-currency amount credited to `staked_asset_value`.
    pub value: Decimal,
}

/// Run the recognition gate for a receiver whose in-counters were just
/// incremented.
///
/// When `shares_in - shares_out - shares_offset` is positive, the matching
/// net asset and value are credited to the holder's staked totals and all
/// three offsets advance by the recognized amounts. Returns `None` when the
/// holder is only passing shares through.
pub fn recognize_inbound(holder: &mut Holder) -> Option<Recognized> {
    let net_new_shares = holder.shares_in - holder.shares_out - holder.shares_offset;
    if !net_new_shares.is_positive() {
        return None;
    }

    let net_asset = holder.asset_in - holder.asset_out - holder.asset_offset;
    let net_value = holder.value_in - holder.value_out - holder.value_offset;

    holder.staked_asset += net_asset;
    holder.staked_asset_value += net_value;

    holder.shares_offset += net_new_shares;
    holder.asset_offset += net_asset;
    holder.value_offset += net_value;

    Some(Recognized {
        shares: net_new_shares,
        asset: net_asset,
        value: net_value,
    })
}
