//! Repository facade: load-by-key and upsert saves for every record type.
//!
//! Decimal fields are stored as canonical strings and re-parsed on load;
//! the repository only ever reads strings it wrote itself.

use crate::domain::{Address, Decimal, HistoryBucket, Holder, Pool, Timestamp, TxHash};
use crate::engine::{Buyback, BuybackCaller, BuybackTotals};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

/// Repository for all persisted ledger state.
pub struct Repository {
    pool: SqlitePool,
}

fn dec(row: &SqliteRow, col: &str) -> Decimal {
    let s: String = row.get(col);
    Decimal::from_str_canonical(&s).unwrap_or_default()
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Load a pool record by address.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn load_pool(&self, id: &Address) -> Result<Option<Pool>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM pools WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Pool {
            id: Address::new(r.get::<String, _>("id")),
            total_shares: dec(&r, "total_shares"),
            total_staked: dec(&r, "total_staked"),
            ratio: dec(&r, "ratio"),
            shares_minted: dec(&r, "shares_minted"),
            shares_burned: dec(&r, "shares_burned"),
            share_age: dec(&r, "share_age"),
            share_age_destroyed: dec(&r, "share_age_destroyed"),
            staked_asset: dec(&r, "staked_asset"),
            staked_asset_value: dec(&r, "staked_asset_value"),
            harvested_asset: dec(&r, "harvested_asset"),
            harvested_asset_value: dec(&r, "harvested_asset_value"),
            updated_at: Timestamp::new(r.get("updated_at")),
        }))
    }

    /// Upsert a pool record.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn save_pool(&self, pool: &Pool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO pools (
                id, total_shares, total_staked, ratio, shares_minted, shares_burned,
                share_age, share_age_destroyed, staked_asset, staked_asset_value,
                harvested_asset, harvested_asset_value, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                total_shares = excluded.total_shares,
                total_staked = excluded.total_staked,
                ratio = excluded.ratio,
                shares_minted = excluded.shares_minted,
                shares_burned = excluded.shares_burned,
                share_age = excluded.share_age,
                share_age_destroyed = excluded.share_age_destroyed,
                staked_asset = excluded.staked_asset,
                staked_asset_value = excluded.staked_asset_value,
                harvested_asset = excluded.harvested_asset,
                harvested_asset_value = excluded.harvested_asset_value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(pool.id.as_str())
        .bind(pool.total_shares.to_canonical_string())
        .bind(pool.total_staked.to_canonical_string())
        .bind(pool.ratio.to_canonical_string())
        .bind(pool.shares_minted.to_canonical_string())
        .bind(pool.shares_burned.to_canonical_string())
        .bind(pool.share_age.to_canonical_string())
        .bind(pool.share_age_destroyed.to_canonical_string())
        .bind(pool.staked_asset.to_canonical_string())
        .bind(pool.staked_asset_value.to_canonical_string())
        .bind(pool.harvested_asset.to_canonical_string())
        .bind(pool.harvested_asset_value.to_canonical_string())
        .bind(pool.updated_at.as_secs())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a holder record by address.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn load_holder(&self, id: &Address) -> Result<Option<Holder>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM holders WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Holder {
            id: Address::new(r.get::<String, _>("id")),
            pool: r.get::<Option<String>, _>("pool").map(Address::new),
            share_balance: dec(&r, "share_balance"),
            shares_minted: dec(&r, "shares_minted"),
            shares_burned: dec(&r, "shares_burned"),
            staked_asset: dec(&r, "staked_asset"),
            staked_asset_value: dec(&r, "staked_asset_value"),
            harvested_asset: dec(&r, "harvested_asset"),
            harvested_asset_value: dec(&r, "harvested_asset_value"),
            share_age: dec(&r, "share_age"),
            share_age_destroyed: dec(&r, "share_age_destroyed"),
            shares_out: dec(&r, "shares_out"),
            asset_out: dec(&r, "asset_out"),
            value_out: dec(&r, "value_out"),
            shares_in: dec(&r, "shares_in"),
            asset_in: dec(&r, "asset_in"),
            value_in: dec(&r, "value_in"),
            shares_offset: dec(&r, "shares_offset"),
            asset_offset: dec(&r, "asset_offset"),
            value_offset: dec(&r, "value_offset"),
            updated_at: Timestamp::new(r.get("updated_at")),
        }))
    }

    /// Upsert a holder record.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn save_holder(&self, holder: &Holder) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO holders (
                id, pool, share_balance, shares_minted, shares_burned,
                staked_asset, staked_asset_value, harvested_asset, harvested_asset_value,
                share_age, share_age_destroyed,
                shares_out, asset_out, value_out, shares_in, asset_in, value_in,
                shares_offset, asset_offset, value_offset, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                pool = excluded.pool,
                share_balance = excluded.share_balance,
                shares_minted = excluded.shares_minted,
                shares_burned = excluded.shares_burned,
                staked_asset = excluded.staked_asset,
                staked_asset_value = excluded.staked_asset_value,
                harvested_asset = excluded.harvested_asset,
                harvested_asset_value = excluded.harvested_asset_value,
                share_age = excluded.share_age,
                share_age_destroyed = excluded.share_age_destroyed,
                shares_out = excluded.shares_out,
                asset_out = excluded.asset_out,
                value_out = excluded.value_out,
                shares_in = excluded.shares_in,
                asset_in = excluded.asset_in,
                value_in = excluded.value_in,
                shares_offset = excluded.shares_offset,
                asset_offset = excluded.asset_offset,
                value_offset = excluded.value_offset,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(holder.id.as_str())
        .bind(holder.pool.as_ref().map(|p| p.as_str().to_string()))
        .bind(holder.share_balance.to_canonical_string())
        .bind(holder.shares_minted.to_canonical_string())
        .bind(holder.shares_burned.to_canonical_string())
        .bind(holder.staked_asset.to_canonical_string())
        .bind(holder.staked_asset_value.to_canonical_string())
        .bind(holder.harvested_asset.to_canonical_string())
        .bind(holder.harvested_asset_value.to_canonical_string())
        .bind(holder.share_age.to_canonical_string())
        .bind(holder.share_age_destroyed.to_canonical_string())
        .bind(holder.shares_out.to_canonical_string())
        .bind(holder.asset_out.to_canonical_string())
        .bind(holder.value_out.to_canonical_string())
        .bind(holder.shares_in.to_canonical_string())
        .bind(holder.asset_in.to_canonical_string())
        .bind(holder.value_in.to_canonical_string())
        .bind(holder.shares_offset.to_canonical_string())
        .bind(holder.asset_offset.to_canonical_string())
        .bind(holder.value_offset.to_canonical_string())
        .bind(holder.updated_at.as_secs())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a history bucket by day index.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn load_bucket(&self, day: i64) -> Result<Option<HistoryBucket>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM history WHERE day = ?")
            .bind(day)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| HistoryBucket {
            day: r.get("day"),
            date: Timestamp::new(r.get("date")),
            shares_minted: dec(&r, "shares_minted"),
            shares_burned: dec(&r, "shares_burned"),
            staked_asset: dec(&r, "staked_asset"),
            staked_asset_value: dec(&r, "staked_asset_value"),
            harvested_asset: dec(&r, "harvested_asset"),
            harvested_asset_value: dec(&r, "harvested_asset_value"),
            share_age: dec(&r, "share_age"),
            share_age_destroyed: dec(&r, "share_age_destroyed"),
            share_supply: dec(&r, "share_supply"),
            ratio: dec(&r, "ratio"),
        }))
    }

    /// Upsert a history bucket.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn save_bucket(&self, bucket: &HistoryBucket) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO history (
                day, date, shares_minted, shares_burned,
                staked_asset, staked_asset_value, harvested_asset, harvested_asset_value,
                share_age, share_age_destroyed, share_supply, ratio
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(day) DO UPDATE SET
                date = excluded.date,
                shares_minted = excluded.shares_minted,
                shares_burned = excluded.shares_burned,
                staked_asset = excluded.staked_asset,
                staked_asset_value = excluded.staked_asset_value,
                harvested_asset = excluded.harvested_asset,
                harvested_asset_value = excluded.harvested_asset_value,
                share_age = excluded.share_age,
                share_age_destroyed = excluded.share_age_destroyed,
                share_supply = excluded.share_supply,
                ratio = excluded.ratio
            "#,
        )
        .bind(bucket.day)
        .bind(bucket.date.as_secs())
        .bind(bucket.shares_minted.to_canonical_string())
        .bind(bucket.shares_burned.to_canonical_string())
        .bind(bucket.staked_asset.to_canonical_string())
        .bind(bucket.staked_asset_value.to_canonical_string())
        .bind(bucket.harvested_asset.to_canonical_string())
        .bind(bucket.harvested_asset_value.to_canonical_string())
        .bind(bucket.share_age.to_canonical_string())
        .bind(bucket.share_age_destroyed.to_canonical_string())
        .bind(bucket.share_supply.to_canonical_string())
        .bind(bucket.ratio.to_canonical_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the converter-wide buyback totals.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn load_buyback_totals(
        &self,
        id: &Address,
    ) -> Result<Option<BuybackTotals>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM buyback_totals WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| BuybackTotals {
            id: Address::new(r.get::<String, _>("id")),
            asset_served: dec(&r, "asset_served"),
        }))
    }

    /// Upsert the converter-wide buyback totals.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn save_buyback_totals(&self, totals: &BuybackTotals) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO buyback_totals (id, asset_served) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET asset_served = excluded.asset_served
            "#,
        )
        .bind(totals.id.as_str())
        .bind(totals.asset_served.to_canonical_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load a per-caller buyback record.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn load_buyback_caller(
        &self,
        id: &Address,
    ) -> Result<Option<BuybackCaller>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM buyback_callers WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| BuybackCaller {
            id: Address::new(r.get::<String, _>("id")),
            converter: Address::new(r.get::<String, _>("converter")),
            asset_served: dec(&r, "asset_served"),
        }))
    }

    /// Upsert a per-caller buyback record.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn save_buyback_caller(&self, caller: &BuybackCaller) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO buyback_callers (id, converter, asset_served) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                converter = excluded.converter,
                asset_served = excluded.asset_served
            "#,
        )
        .bind(caller.id.as_str())
        .bind(caller.converter.as_str())
        .bind(caller.asset_served.to_canonical_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a buyback row idempotently. Returns false if the row already
    /// existed.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_buyback(&self, buyback: &Buyback) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO buybacks (
                id, converter, caller, pair, token0, token1,
                tx_hash, block_number, timestamp, asset_served, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&buyback.id)
        .bind(buyback.converter.as_str())
        .bind(buyback.caller.as_str())
        .bind(buyback.pair.as_str())
        .bind(buyback.token0.as_str())
        .bind(buyback.token1.as_str())
        .bind(buyback.tx_hash.as_str())
        .bind(buyback.block_number as i64)
        .bind(buyback.timestamp.as_secs())
        .bind(buyback.asset_served.to_canonical_string())
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Load a buyback row by its `<pair>-<block>` key.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn load_buyback(&self, id: &str) -> Result<Option<Buyback>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM buybacks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Buyback {
            id: r.get("id"),
            converter: Address::new(r.get::<String, _>("converter")),
            caller: Address::new(r.get::<String, _>("caller")),
            pair: Address::new(r.get::<String, _>("pair")),
            token0: Address::new(r.get::<String, _>("token0")),
            token1: Address::new(r.get::<String, _>("token1")),
            tx_hash: TxHash::new(r.get::<String, _>("tx_hash")),
            block_number: r.get::<i64, _>("block_number") as u64,
            timestamp: Timestamp::new(r.get("timestamp")),
            asset_served: dec(&r, "asset_served"),
        }))
    }

    /// Last block the indexer fully processed, if any.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn last_synced_block(&self) -> Result<Option<u64>, sqlx::Error> {
        let row = sqlx::query("SELECT last_block FROM sync_state WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<i64, _>("last_block") as u64))
    }

    /// Persist the block cursor after a fully-applied chunk.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub async fn set_last_synced_block(&self, block: u64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sync_state (id, last_block) VALUES (1, ?)
            ON CONFLICT(id) DO UPDATE SET last_block = excluded.last_block
            "#,
        )
        .bind(block as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use tempfile::TempDir;

    async fn setup() -> (Repository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        (Repository::new(pool), temp_dir)
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[tokio::test]
    async fn test_pool_roundtrip() {
        let (repo, _temp) = setup().await;
        let id = Address::new("0xp00l");

        assert!(repo.load_pool(&id).await.unwrap().is_none());

        let mut pool = Pool::new(id.clone(), Timestamp::new(1_700_000_000));
        pool.total_shares = d("1000");
        pool.ratio = d("1.05");
        pool.share_age = d("123.456");
        repo.save_pool(&pool).await.unwrap();

        let loaded = repo.load_pool(&id).await.unwrap().expect("pool missing");
        assert_eq!(loaded, pool);

        pool.shares_minted = d("1500");
        repo.save_pool(&pool).await.unwrap();
        let reloaded = repo.load_pool(&id).await.unwrap().unwrap();
        assert_eq!(reloaded.shares_minted, d("1500"));
    }

    #[tokio::test]
    async fn test_holder_roundtrip_with_membership() {
        let (repo, _temp) = setup().await;
        let id = Address::new("0xh01der");

        let mut holder = Holder::new(id.clone(), Timestamp::new(100));
        holder.pool = Some(Address::new("0xp00l"));
        holder.share_balance = d("42");
        holder.shares_offset = d("7.5");
        repo.save_holder(&holder).await.unwrap();

        let loaded = repo.load_holder(&id).await.unwrap().expect("holder missing");
        assert_eq!(loaded, holder);

        holder.pool = None;
        repo.save_holder(&holder).await.unwrap();
        let reloaded = repo.load_holder(&id).await.unwrap().unwrap();
        assert!(reloaded.pool.is_none());
    }

    #[tokio::test]
    async fn test_bucket_roundtrip() {
        let (repo, _temp) = setup().await;

        assert!(repo.load_bucket(19700).await.unwrap().is_none());

        let mut bucket = HistoryBucket::new(19700);
        bucket.shares_minted = d("10");
        bucket.ratio = d("1.1");
        repo.save_bucket(&bucket).await.unwrap();

        let loaded = repo.load_bucket(19700).await.unwrap().expect("bucket missing");
        assert_eq!(loaded, bucket);
    }

    #[tokio::test]
    async fn test_buyback_insert_is_idempotent() {
        let (repo, _temp) = setup().await;

        let buyback = Buyback {
            id: "0xpa1r-55".to_string(),
            converter: Address::new("0xc0nv"),
            caller: Address::new("0xca11er"),
            pair: Address::new("0xpa1r"),
            token0: Address::new("0xa"),
            token1: Address::new("0xb"),
            tx_hash: TxHash::new("0xdead"),
            block_number: 55,
            timestamp: Timestamp::new(1_700_000_000),
            asset_served: d("3.25"),
        };

        assert!(repo.insert_buyback(&buyback).await.unwrap());
        assert!(!repo.insert_buyback(&buyback).await.unwrap());

        let loaded = repo.load_buyback("0xpa1r-55").await.unwrap().unwrap();
        assert_eq!(loaded, buyback);
    }

    #[tokio::test]
    async fn test_sync_cursor_roundtrip() {
        let (repo, _temp) = setup().await;

        assert!(repo.last_synced_block().await.unwrap().is_none());
        repo.set_last_synced_block(12345).await.unwrap();
        assert_eq!(repo.last_synced_block().await.unwrap(), Some(12345));
        repo.set_last_synced_block(12400).await.unwrap();
        assert_eq!(repo.last_synced_block().await.unwrap(), Some(12400));
    }
}
