//! Pure computation engine for deterministic share-ledger accounting.
//!
//! Every function here takes explicit state records and mutates them in a
//! single synchronous pass; persistence and chain I/O live elsewhere.

pub mod age;
pub mod buyback;
pub mod cost_basis;
pub mod history;
pub mod ledger;

pub use buyback::{Buyback, BuybackCaller, BuybackTotals};
pub use cost_basis::Recognized;
pub use ledger::{
    apply_burn, apply_mint, apply_peer, apply_peer_checkpoint, apply_peer_in, apply_peer_out,
    refresh_pool, Applied, ChainReadings,
};
