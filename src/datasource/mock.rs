//! Mock chain source for testing without a node.

use super::{ChainSource, ChainSourceError};
use crate::domain::{Decimal, SwapEvent, TransferEvent};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock chain source returning predefined events and readings.
///
/// Readings are queued per event with [`with_readings`]; each of the three
/// read methods consumes its own queue in lockstep, and the last queued
/// value repeats once the queue is exhausted. This lets a test script the
/// point-in-time chain state seen while each successive event is processed.
///
/// [`with_readings`]: MockChainSource::with_readings
#[derive(Debug, Default)]
pub struct MockChainSource {
    transfers: Vec<TransferEvent>,
    swaps: Vec<SwapEvent>,
    latest_block: Option<u64>,
    supplies: Mutex<VecDeque<Decimal>>,
    balances: Mutex<VecDeque<Decimal>>,
    prices: Mutex<VecDeque<Decimal>>,
}

impl MockChainSource {
    /// Create a new mock with no events and zero readings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a transfer event.
    pub fn with_transfer(mut self, event: TransferEvent) -> Self {
        self.transfers.push(event);
        self
    }

    /// Add multiple transfer events.
    pub fn with_transfers(mut self, events: Vec<TransferEvent>) -> Self {
        self.transfers.extend(events);
        self
    }

    /// Add a swap event.
    pub fn with_swap(mut self, event: SwapEvent) -> Self {
        self.swaps.push(event);
        self
    }

    /// Queue the readings observed while the next unprocessed event is
    /// handled. The last queued triple repeats indefinitely.
    pub fn with_readings(self, supply: Decimal, staked: Decimal, price: Decimal) -> Self {
        self.supplies.lock().unwrap().push_back(supply);
        self.balances.lock().unwrap().push_back(staked);
        self.prices.lock().unwrap().push_back(price);
        self
    }

    /// Override the reported chain head (defaults to the highest event
    /// block).
    pub fn with_latest_block(mut self, block: u64) -> Self {
        self.latest_block = Some(block);
        self
    }

    fn next_reading(queue: &Mutex<VecDeque<Decimal>>) -> Decimal {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_default()
        } else {
            queue.front().copied().unwrap_or_default()
        }
    }
}

#[async_trait]
impl ChainSource for MockChainSource {
    async fn latest_block(&self) -> Result<u64, ChainSourceError> {
        if let Some(block) = self.latest_block {
            return Ok(block);
        }
        Ok(self
            .transfers
            .iter()
            .map(|e| e.block_number)
            .chain(self.swaps.iter().map(|e| e.block_number))
            .max()
            .unwrap_or(0))
    }

    async fn fetch_transfers(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, ChainSourceError> {
        let mut events: Vec<TransferEvent> = self
            .transfers
            .iter()
            .filter(|e| e.block_number >= from_block && e.block_number <= to_block)
            .cloned()
            .collect();
        events.sort_by_key(|e| (e.block_number, e.log_index));
        Ok(events)
    }

    async fn fetch_swaps(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<SwapEvent>, ChainSourceError> {
        let mut events: Vec<SwapEvent> = self
            .swaps
            .iter()
            .filter(|e| e.block_number >= from_block && e.block_number <= to_block)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.block_number);
        Ok(events)
    }

    async fn share_supply(&self) -> Result<Decimal, ChainSourceError> {
        Ok(Self::next_reading(&self.supplies))
    }

    async fn staked_balance(&self) -> Result<Decimal, ChainSourceError> {
        Ok(Self::next_reading(&self.balances))
    }

    async fn reference_price(&self) -> Result<Decimal, ChainSourceError> {
        Ok(Self::next_reading(&self.prices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, Timestamp, TxHash};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn transfer_at(block: u64) -> TransferEvent {
        TransferEvent {
            from: Address::zero(),
            to: Address::new("0x01"),
            value: d("1"),
            block_number: block,
            timestamp: Timestamp::new(block as i64 * 12),
            tx_hash: TxHash::new(format!("0x{:x}", block)),
            log_index: 0,
        }
    }

    #[tokio::test]
    async fn test_fetch_transfers_filters_by_block_range() {
        let mock = MockChainSource::new()
            .with_transfer(transfer_at(10))
            .with_transfer(transfer_at(20))
            .with_transfer(transfer_at(30));

        let events = mock.fetch_transfers(15, 25).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].block_number, 20);
    }

    #[tokio::test]
    async fn test_latest_block_defaults_to_highest_event() {
        let mock = MockChainSource::new()
            .with_transfer(transfer_at(10))
            .with_transfer(transfer_at(42));
        assert_eq!(mock.latest_block().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_readings_advance_per_event_and_last_repeats() {
        let mock = MockChainSource::new()
            .with_readings(d("100"), d("100"), d("2"))
            .with_readings(d("200"), d("220"), d("3"));

        assert_eq!(mock.share_supply().await.unwrap(), d("100"));
        assert_eq!(mock.staked_balance().await.unwrap(), d("100"));
        assert_eq!(mock.reference_price().await.unwrap(), d("2"));

        assert_eq!(mock.share_supply().await.unwrap(), d("200"));
        assert_eq!(mock.share_supply().await.unwrap(), d("200"));
        assert_eq!(mock.reference_price().await.unwrap(), d("3"));
    }
}
