//! Domain primitives: Address, Timestamp, TxHash.

use crate::domain::Decimal;
use serde::{Deserialize, Serialize};

/// Seconds in one history-bucket window.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// An EVM account address as a lowercase 0x-prefixed hex string.
///
/// Addresses are normalized on construction so that string equality and
/// storage keys are stable regardless of the source's checksum casing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create an Address, normalizing to lowercase.
    pub fn new(addr: impl Into<String>) -> Self {
        Address(addr.into().to_lowercase())
    }

    /// The zero address, used by the share token to signal mint/burn.
    pub fn zero() -> Self {
        Address("0x0000000000000000000000000000000000000000".to_string())
    }

    /// Returns true if this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0
            .strip_prefix("0x")
            .map(|rest| rest.bytes().all(|b| b == b'0'))
            .unwrap_or(false)
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Block timestamp in seconds since Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Create a Timestamp from seconds.
    pub fn new(secs: i64) -> Self {
        Timestamp(secs)
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Day index of this timestamp (UTC day alignment).
    pub fn day_index(&self) -> i64 {
        self.0 / SECONDS_PER_DAY
    }

    /// Elapsed time since `earlier`, in real-valued days.
    ///
    /// Events arrive in monotonic block order, so `earlier <= self` holds
    /// for every stored `updated_at`.
    pub fn days_since(&self, earlier: Timestamp) -> Decimal {
        Decimal::from(self.0 - earlier.0) / Decimal::from(SECONDS_PER_DAY)
    }
}

/// Transaction hash as a 0x-prefixed hex string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        TxHash(hash.into().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
