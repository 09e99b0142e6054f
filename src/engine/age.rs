//! The share-age integral: share-quantity x days held.
//!
//! Age is treated as homogeneous across a balance: removal takes the
//! average age per share times the removed quantity, with no FIFO/LIFO
//! distinction between shares of different mint times.

use crate::domain::{Decimal, Timestamp};

/// Age accrued on `balance` between `last_updated` and `now`, in
/// share-days. Callers must add this before applying the event's balance
/// change: age accrues on the balance held *before* the change.
pub fn accrued_age(balance: Decimal, last_updated: Timestamp, now: Timestamp) -> Decimal {
    now.days_since(last_updated) * balance
}

/// The age slice attributable to removing `quantity` shares from a balance
/// of `balance` carrying `share_age`: average age per share x quantity.
///
/// A zero balance has no age to remove; returns zero rather than dividing.
pub fn removable_age(share_age: Decimal, balance: Decimal, quantity: Decimal) -> Decimal {
    if balance.is_zero() {
        return Decimal::zero();
    }
    share_age / balance * quantity
}
