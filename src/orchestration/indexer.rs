//! The indexer: advances a persisted block cursor, fetches event chunks,
//! and applies every event's full read-modify-save sequence to completion
//! before the next one.
//!
//! Updates are deltas against mutable shared records, so no two events may
//! ever be in flight at once; everything here runs on a single sequential
//! path.

use crate::config::Config;
use crate::datasource::{ChainSource, ChainSourceError};
use crate::db::Repository;
use crate::domain::{
    Address, HistoryBucket, Holder, Pool, SwapEvent, Timestamp, TransferEvent, TransferKind,
};
use crate::engine::{
    self, buyback, Applied, BuybackCaller, BuybackTotals, ChainReadings,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub struct Indexer {
    source: Arc<dyn ChainSource>,
    repo: Arc<Repository>,
    config: Config,
}

/// Result of one sync pass over a block chunk.
#[derive(Debug)]
pub struct SyncStats {
    pub from_block: u64,
    pub to_block: u64,
    pub events_applied: usize,
    pub events_skipped: usize,
    pub buybacks_recorded: usize,
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Chain(#[from] ChainSourceError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl Indexer {
    pub fn new(source: Arc<dyn ChainSource>, repo: Arc<Repository>, config: Config) -> Self {
        Self {
            source,
            repo,
            config,
        }
    }

    /// Poll loop: sync chunks until caught up, then sleep and repeat.
    /// Any error is fatal; a partially-applied event would leave the
    /// running aggregates corrupted, so there is nothing to recover to.
    pub async fn run(&self) -> Result<(), IndexError> {
        info!(
            "Indexer starting for pool {} (start block {})",
            self.config.pool_address, self.config.start_block
        );

        loop {
            match self.sync_once().await? {
                Some(stats) => {
                    info!(
                        "Synced blocks [{}, {}]: {} applied, {} skipped, {} buybacks",
                        stats.from_block,
                        stats.to_block,
                        stats.events_applied,
                        stats.events_skipped,
                        stats.buybacks_recorded
                    );
                }
                None => {
                    tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
                }
            }
        }
    }

    /// Process the next block chunk. Returns None when already at head.
    pub async fn sync_once(&self) -> Result<Option<SyncStats>, IndexError> {
        let head = self.source.latest_block().await?;
        let from = match self.repo.last_synced_block().await? {
            Some(last) => last + 1,
            None => self.config.start_block,
        };
        if from > head {
            return Ok(None);
        }
        let to = (from + self.config.chunk_size - 1).min(head);

        let transfers = self.source.fetch_transfers(from, to).await?;
        let mut events_applied = 0;
        let mut events_skipped = 0;
        for event in &transfers {
            match self.process_transfer(event).await? {
                Some(_) => events_applied += 1,
                None => events_skipped += 1,
            }
        }

        let mut buybacks_recorded = 0;
        if let Some(converter) = self.config.converter_address.clone() {
            let swaps = self.source.fetch_swaps(from, to).await?;
            for swap in &swaps {
                if self.process_swap(swap, &converter).await? {
                    buybacks_recorded += 1;
                }
            }
        }

        self.repo.set_last_synced_block(to).await?;

        Ok(Some(SyncStats {
            from_block: from,
            to_block: to,
            events_applied,
            events_skipped,
            buybacks_recorded,
        }))
    }

    /// Apply one transfer event: zero-value guard, the three point-in-time
    /// reads, lazy record loads, the engine handler, then persistence of
    /// every mutated record. Returns None for the zero-value no-op.
    pub async fn process_transfer(
        &self,
        event: &TransferEvent,
    ) -> Result<Option<Applied>, IndexError> {
        if event.value.is_zero() {
            warn!("Transfer zero value! Tx: {}", event.event_key());
            return Ok(None);
        }

        // The update cannot proceed without a conversion rate; a failed
        // read fails the event.
        let (share_supply, staked_balance, asset_price) = tokio::try_join!(
            self.source.share_supply(),
            self.source.staked_balance(),
            self.source.reference_price(),
        )?;
        let readings = ChainReadings {
            share_supply,
            staked_balance,
            asset_price,
        };

        let t = event.timestamp;
        let mut pool = self.load_or_new_pool(t).await?;
        engine::refresh_pool(&mut pool, &readings);

        let mut bucket = self.load_or_new_bucket(HistoryBucket::day_of(t)).await?;

        let applied = match event.kind() {
            TransferKind::Mint => {
                let mut holder = self.load_or_new_holder(&event.to, t).await?;
                let applied =
                    engine::apply_mint(&mut pool, &mut holder, &mut bucket, event, asset_price);
                self.repo.save_holder(&holder).await?;
                applied
            }
            TransferKind::Burn => {
                let mut holder = self.load_or_new_holder(&event.from, t).await?;
                let applied =
                    engine::apply_burn(&mut pool, &mut holder, &mut bucket, event, asset_price);
                self.repo.save_holder(&holder).await?;
                applied
            }
            TransferKind::Peer if event.from == event.to => {
                // Self-transfer: both sides run against the one record.
                let mut holder = self.load_or_new_holder(&event.from, t).await?;
                let shares = event.value;
                let asset = shares * pool.ratio;
                let value = asset * asset_price;
                let age_transferred =
                    engine::apply_peer_out(&mut holder, shares, asset, value, t);
                let recognized = engine::apply_peer_in(
                    &pool.id,
                    &mut holder,
                    age_transferred,
                    shares,
                    asset,
                    value,
                    t,
                );
                engine::apply_peer_checkpoint(&mut pool, &mut bucket, t);
                self.repo.save_holder(&holder).await?;
                Applied::Transferred {
                    shares,
                    asset,
                    value,
                    recognized,
                }
            }
            TransferKind::Peer => {
                let mut sender = self.load_or_new_holder(&event.from, t).await?;
                let mut receiver = self.load_or_new_holder(&event.to, t).await?;
                let applied = engine::apply_peer(
                    &mut pool,
                    &mut sender,
                    &mut receiver,
                    &mut bucket,
                    event,
                    asset_price,
                );
                self.repo.save_holder(&sender).await?;
                self.repo.save_holder(&receiver).await?;
                applied
            }
        };

        self.repo.save_pool(&pool).await?;
        self.repo.save_bucket(&bucket).await?;

        Ok(Some(applied))
    }

    /// Record a converter swap. Returns false when the swap is not a
    /// conversion run or was already recorded.
    async fn process_swap(
        &self,
        swap: &SwapEvent,
        converter: &Address,
    ) -> Result<bool, IndexError> {
        if !buyback::is_serving(swap, converter, &self.config.pool_address) {
            return Ok(false);
        }

        let mut totals = self
            .repo
            .load_buyback_totals(converter)
            .await?
            .unwrap_or_else(|| BuybackTotals::new(converter.clone()));
        let mut caller = self
            .repo
            .load_buyback_caller(&swap.tx_origin)
            .await?
            .unwrap_or_else(|| BuybackCaller::new(swap.tx_origin.clone(), converter.clone()));

        let record = buyback::apply_swap(&mut totals, &mut caller, swap);

        // Totals only advance when the row is new, keeping replays of an
        // already-recorded swap from double counting.
        let inserted = self.repo.insert_buyback(&record).await?;
        if inserted {
            self.repo.save_buyback_totals(&totals).await?;
            self.repo.save_buyback_caller(&caller).await?;
        }
        Ok(inserted)
    }

    async fn load_or_new_pool(&self, now: Timestamp) -> Result<Pool, IndexError> {
        Ok(self
            .repo
            .load_pool(&self.config.pool_address)
            .await?
            .unwrap_or_else(|| Pool::new(self.config.pool_address.clone(), now)))
    }

    async fn load_or_new_holder(
        &self,
        address: &Address,
        now: Timestamp,
    ) -> Result<Holder, IndexError> {
        Ok(self
            .repo
            .load_holder(address)
            .await?
            .unwrap_or_else(|| Holder::new(address.clone(), now)))
    }

    async fn load_or_new_bucket(&self, day: i64) -> Result<HistoryBucket, IndexError> {
        Ok(self
            .repo
            .load_bucket(day)
            .await?
            .unwrap_or_else(|| HistoryBucket::new(day)))
    }
}
