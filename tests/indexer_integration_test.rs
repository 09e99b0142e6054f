//! End-to-end: mock chain source -> indexer -> repository, over a full
//! mint / transfer / burn lifecycle with evolving chain readings.

use shareledger::domain::SECONDS_PER_DAY;
use shareledger::{
    Address, ChainSource, ChainSourceError, Config, Decimal, Indexer, MockChainSource,
    Repository, SwapEvent, Timestamp, TransferEvent, TxHash,
};
use shareledger::db::init_db;
use std::sync::Arc;
use tempfile::TempDir;

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

async fn setup_repo() -> (Arc<Repository>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    (Arc::new(Repository::new(pool)), temp_dir)
}

fn test_config() -> Config {
    Config {
        database_path: ":memory:".to_string(),
        rpc_url: "http://example.invalid".to_string(),
        pool_address: Address::new("0xp00l"),
        asset_address: Address::new("0xa55e7"),
        price_pair_address: Address::new("0xpricepair"),
        converter_address: None,
        watched_pairs: vec![],
        start_block: 0,
        chunk_size: 2000,
        poll_interval_ms: 0,
    }
}

fn transfer(from: Address, to: Address, value: &str, block: u64, timestamp: i64) -> TransferEvent {
    TransferEvent {
        from,
        to,
        value: d(value),
        block_number: block,
        timestamp: Timestamp::new(timestamp),
        tx_hash: TxHash::new(format!("0x{:x}", block)),
        log_index: 0,
    }
}

const DAY: i64 = 19_700;

#[tokio::test]
async fn test_full_lifecycle_mint_transfer_burn() {
    let (repo, _temp) = setup_repo().await;

    let t_mint = DAY * SECONDS_PER_DAY;
    let t_transfer = t_mint + SECONDS_PER_DAY / 2;
    let t_burn = t_mint + 3 * SECONDS_PER_DAY / 4;

    let a = Address::new("0xa");
    let b = Address::new("0xb");

    let source = Arc::new(
        MockChainSource::new()
            .with_transfer(transfer(Address::zero(), a.clone(), "1000", 10, t_mint))
            .with_transfer(transfer(a.clone(), b.clone(), "400", 20, t_transfer))
            .with_transfer(transfer(b.clone(), Address::zero(), "400", 30, t_burn))
            // Post-mint: 1000 shares backed 1:1.
            .with_readings(d("1000"), d("1000"), d("1"))
            // Rewards accrued before the transfer: ratio 1.1, price 2.
            .with_readings(d("1000"), d("1100"), d("2"))
            // Post-burn supply: 600 shares, still ratio 1.1.
            .with_readings(d("600"), d("660"), d("2")),
    );
    let indexer = Indexer::new(source, repo.clone(), test_config());

    let stats = indexer.sync_once().await.unwrap().expect("should sync");
    assert_eq!(stats.events_applied, 3);
    assert_eq!(stats.events_skipped, 0);
    assert_eq!(repo.last_synced_block().await.unwrap(), Some(30));
    assert!(indexer.sync_once().await.unwrap().is_none());

    let pool = repo
        .load_pool(&Address::new("0xp00l"))
        .await
        .unwrap()
        .expect("pool missing");
    assert_eq!(pool.total_shares, d("600"));
    assert_eq!(pool.ratio, d("1.1"));
    assert_eq!(pool.shares_minted, d("1000"));
    assert_eq!(pool.shares_burned, d("400"));
    assert_eq!(pool.net_shares(), pool.total_shares);
    assert_eq!(pool.staked_asset, d("1000"));
    assert_eq!(pool.staked_asset_value, d("1000"));
    assert_eq!(pool.harvested_asset, d("440"));
    assert_eq!(pool.harvested_asset_value, d("880"));
    // Accrued 500 + 250 share-days across the sequence, minus the 300
    // destroyed by the burn.
    assert_eq!(pool.share_age, d("450"));
    assert_eq!(pool.share_age_destroyed, d("300"));
    assert_eq!(pool.updated_at, Timestamp::new(t_burn));

    let holder_a = repo.load_holder(&a).await.unwrap().expect("holder a missing");
    assert_eq!(holder_a.share_balance, d("600"));
    assert_eq!(holder_a.staked_asset, d("1000"));
    assert_eq!(holder_a.shares_out, d("400"));
    assert_eq!(holder_a.asset_out, d("440"));
    assert_eq!(holder_a.value_out, d("880"));
    // 500 share-days accrued, 200 travelled to b with the shares.
    assert_eq!(holder_a.share_age, d("300"));
    assert!(holder_a.share_age_destroyed.is_zero());
    assert!(holder_a.is_member());

    let holder_b = repo.load_holder(&b).await.unwrap().expect("holder b missing");
    assert!(holder_b.share_balance.is_zero());
    assert!(!holder_b.is_member());
    assert_eq!(holder_b.shares_in, d("400"));
    assert_eq!(holder_b.asset_in, d("440"));
    assert_eq!(holder_b.value_in, d("880"));
    assert_eq!(holder_b.shares_offset, d("400"));
    assert_eq!(holder_b.asset_offset, d("440"));
    assert_eq!(holder_b.value_offset, d("880"));
    assert_eq!(holder_b.staked_asset, d("440"));
    assert_eq!(holder_b.staked_asset_value, d("880"));
    assert_eq!(holder_b.harvested_asset, d("440"));
    assert_eq!(holder_b.harvested_asset_value, d("880"));
    assert!(holder_b.share_age.is_zero());
    assert_eq!(holder_b.share_age_destroyed, d("300"));

    let bucket = repo.load_bucket(DAY).await.unwrap().expect("bucket missing");
    assert_eq!(bucket.shares_minted, d("1000"));
    assert_eq!(bucket.shares_burned, d("400"));
    assert_eq!(bucket.staked_asset, d("1000"));
    assert_eq!(bucket.harvested_asset, d("440"));
    assert_eq!(bucket.share_age, d("450"));
    assert_eq!(bucket.share_age_destroyed, d("300"));
    assert_eq!(bucket.share_supply, d("600"));
    assert_eq!(bucket.ratio, d("1.1"));
}

#[tokio::test]
async fn test_zero_value_event_leaves_all_state_unchanged() {
    let (repo, _temp) = setup_repo().await;

    let t0 = DAY * SECONDS_PER_DAY;
    let a = Address::new("0xa");

    let source = Arc::new(
        MockChainSource::new().with_readings(d("100"), d("100"), d("1")),
    );
    let indexer = Indexer::new(source, repo.clone(), test_config());

    indexer
        .process_transfer(&transfer(Address::zero(), a.clone(), "100", 10, t0))
        .await
        .unwrap();

    let pool_before = repo.load_pool(&Address::new("0xp00l")).await.unwrap();
    let holder_before = repo.load_holder(&a).await.unwrap();
    let bucket_before = repo.load_bucket(DAY).await.unwrap();

    let applied = indexer
        .process_transfer(&transfer(a.clone(), Address::zero(), "0", 11, t0 + 600))
        .await
        .unwrap();
    assert!(applied.is_none());

    assert_eq!(repo.load_pool(&Address::new("0xp00l")).await.unwrap(), pool_before);
    assert_eq!(repo.load_holder(&a).await.unwrap(), holder_before);
    assert_eq!(repo.load_bucket(DAY).await.unwrap(), bucket_before);
}

/// Delegates everything to a mock but fails the price read, as a node
/// outage would.
#[derive(Debug)]
struct FailingPriceSource {
    inner: MockChainSource,
}

#[async_trait::async_trait]
impl ChainSource for FailingPriceSource {
    async fn latest_block(&self) -> Result<u64, ChainSourceError> {
        self.inner.latest_block().await
    }

    async fn fetch_transfers(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, ChainSourceError> {
        self.inner.fetch_transfers(from_block, to_block).await
    }

    async fn fetch_swaps(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<SwapEvent>, ChainSourceError> {
        self.inner.fetch_swaps(from_block, to_block).await
    }

    async fn share_supply(&self) -> Result<Decimal, ChainSourceError> {
        self.inner.share_supply().await
    }

    async fn staked_balance(&self) -> Result<Decimal, ChainSourceError> {
        self.inner.staked_balance().await
    }

    async fn reference_price(&self) -> Result<Decimal, ChainSourceError> {
        Err(ChainSourceError::NetworkError(
            "reserve query unreachable".to_string(),
        ))
    }
}

#[tokio::test]
async fn test_failed_price_read_fails_the_event_and_persists_nothing() {
    let (repo, _temp) = setup_repo().await;

    let source = Arc::new(FailingPriceSource {
        inner: MockChainSource::new().with_readings(d("100"), d("100"), d("1")),
    });
    let indexer = Indexer::new(source, repo.clone(), test_config());

    let event = transfer(
        Address::zero(),
        Address::new("0xa"),
        "100",
        10,
        DAY * SECONDS_PER_DAY,
    );
    let result = indexer.process_transfer(&event).await;
    assert!(result.is_err());

    assert!(repo.load_pool(&Address::new("0xp00l")).await.unwrap().is_none());
    assert!(repo.load_holder(&Address::new("0xa")).await.unwrap().is_none());
}
