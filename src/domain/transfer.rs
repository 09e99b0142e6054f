//! Share-token transfer events and their mint/burn/peer classification.

use crate::domain::{Address, Decimal, Timestamp, TxHash};
use serde::{Deserialize, Serialize};

/// A single share-token transfer notification.
///
/// `value` is already converted to share units (raw amount divided by the
/// token's decimals); the engine never sees unscaled chain integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// Sender; the zero address signals a mint.
    pub from: Address,
    /// Receiver; the zero address signals a burn.
    pub to: Address,
    /// Transferred share quantity in token units.
    pub value: Decimal,
    /// Block the event was emitted in.
    pub block_number: u64,
    /// Block timestamp.
    pub timestamp: Timestamp,
    /// Transaction hash.
    pub tx_hash: TxHash,
    /// Position of the log within the block; with `tx_hash` this is the
    /// event's stable identity.
    pub log_index: u64,
}

/// The three handler paths of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Shares created (`from` is the zero address).
    Mint,
    /// Shares destroyed (`to` is the zero address).
    Burn,
    /// Shares moved between two holders.
    Peer,
}

impl TransferEvent {
    /// Classify this event by its zero-address sides.
    pub fn kind(&self) -> TransferKind {
        if self.from.is_zero() {
            TransferKind::Mint
        } else if self.to.is_zero() {
            TransferKind::Burn
        } else {
            TransferKind::Peer
        }
    }

    /// Stable event identity for dedup and logging.
    pub fn event_key(&self) -> String {
        format!("{}:{}", self.tx_hash, self.log_index)
    }
}
