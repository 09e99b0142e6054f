use shareledger::{
    Address, Config, Decimal, Indexer, MockChainSource, Repository, SwapEvent, Timestamp, TxHash,
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

fn converter_config() -> Config {
    Config {
        database_path: ":memory:".to_string(),
        rpc_url: "http://example.invalid".to_string(),
        pool_address: Address::new("0xp00l"),
        asset_address: Address::new("0xa55e7"),
        price_pair_address: Address::new("0xpricepair"),
        converter_address: Some(Address::new("0xc0nv")),
        watched_pairs: vec![Address::new("0xpa1r")],
        start_block: 0,
        chunk_size: 2000,
        poll_interval_ms: 0,
    }
}

fn swap(sender: &str, to: &str, amount0_out: &str, origin: &str, block: u64) -> SwapEvent {
    SwapEvent {
        pair: Address::new("0xpa1r"),
        sender: Address::new(sender),
        to: Address::new(to),
        amount0_out: d(amount0_out),
        tx_origin: Address::new(origin),
        token0: Address::new("0xa55e7"),
        token1: Address::new("0x07her"),
        block_number: block,
        timestamp: Timestamp::new(1_700_000_000 + block as i64 * 12),
        tx_hash: TxHash::new(format!("0x{:x}", block)),
    }
}

#[tokio::test]
async fn test_converter_swaps_are_tallied() {
    let (repo, _temp) = setup_repo().await;

    let source = Arc::new(
        MockChainSource::new()
            // Conversion initiated by the converter itself.
            .with_swap(swap("0xc0nv", "0xelsewhere", "10", "0xca11er", 5))
            // Unrelated swap on the same pair: ignored.
            .with_swap(swap("0xrouter", "0xelsewhere", "99", "0xother", 6))
            // Output delivered straight to the pool.
            .with_swap(swap("0xrouter", "0xp00l", "2.5", "0xca11er2", 7)),
    );
    let indexer = Indexer::new(source, repo.clone(), converter_config());

    let stats = indexer.sync_once().await.unwrap().expect("should sync");
    assert_eq!(stats.buybacks_recorded, 2);
    assert_eq!(stats.events_applied, 0);

    let totals = repo
        .load_buyback_totals(&Address::new("0xc0nv"))
        .await
        .unwrap()
        .expect("totals missing");
    assert_eq!(totals.asset_served, d("12.5"));

    let caller = repo
        .load_buyback_caller(&Address::new("0xca11er"))
        .await
        .unwrap()
        .expect("caller missing");
    assert_eq!(caller.asset_served, d("10"));
    assert_eq!(caller.converter.as_str(), "0xc0nv");

    let caller2 = repo
        .load_buyback_caller(&Address::new("0xca11er2"))
        .await
        .unwrap()
        .expect("second caller missing");
    assert_eq!(caller2.asset_served, d("2.5"));

    let record = repo
        .load_buyback("0xpa1r-5")
        .await
        .unwrap()
        .expect("buyback row missing");
    assert_eq!(record.asset_served, d("10"));
    assert_eq!(record.pair.as_str(), "0xpa1r");

    // The ignored swap left no row behind.
    assert!(repo.load_buyback("0xpa1r-6").await.unwrap().is_none());
}

#[tokio::test]
async fn test_tallying_is_off_without_a_converter() {
    let (repo, _temp) = setup_repo().await;

    let source = Arc::new(
        MockChainSource::new().with_swap(swap("0xc0nv", "0xp00l", "10", "0xca11er", 5)),
    );
    let mut config = converter_config();
    config.converter_address = None;
    let indexer = Indexer::new(source, repo.clone(), config);

    let stats = indexer.sync_once().await.unwrap().expect("should sync");
    assert_eq!(stats.buybacks_recorded, 0);
    assert!(repo
        .load_buyback_totals(&Address::new("0xc0nv"))
        .await
        .unwrap()
        .is_none());
}
