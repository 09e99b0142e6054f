use crate::domain::Address;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub rpc_url: String,
    /// Share-token (pool) contract address.
    pub pool_address: Address,
    /// Underlying staked-asset token address.
    pub asset_address: Address,
    /// Liquidity pair used to derive the reference price.
    pub price_pair_address: Address,
    /// Fee-converter address; buyback tallying is off when absent.
    pub converter_address: Option<Address>,
    /// Pairs watched for converter swaps.
    pub watched_pairs: Vec<Address>,
    /// First block to index when no cursor is stored yet.
    pub start_block: u64,
    /// Blocks fetched per sync pass.
    pub chunk_size: u64,
    /// Idle sleep between polls once caught up to the chain head.
    pub poll_interval_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = require(&env_map, "DATABASE_PATH")?;
        let rpc_url = require(&env_map, "RPC_URL")?;
        let pool_address = Address::new(require(&env_map, "POOL_ADDRESS")?);
        let asset_address = Address::new(require(&env_map, "ASSET_ADDRESS")?);
        let price_pair_address = Address::new(require(&env_map, "PRICE_PAIR_ADDRESS")?);

        let converter_address = env_map
            .get("CONVERTER_ADDRESS")
            .filter(|s| !s.trim().is_empty())
            .map(|s| Address::new(s.trim()));

        let watched_pairs = env_map
            .get("WATCHED_PAIRS")
            .map(|s| {
                s.split(',')
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .map(Address::new)
                    .collect()
            })
            .unwrap_or_default();

        let start_block = parse_u64(&env_map, "START_BLOCK", 0)?;
        let chunk_size = parse_u64(&env_map, "CHUNK_SIZE", 2000)?;
        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "CHUNK_SIZE".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let poll_interval_ms = parse_u64(&env_map, "POLL_INTERVAL_MS", 12_000)?;

        Ok(Config {
            database_path,
            rpc_url,
            pool_address,
            asset_address,
            price_pair_address,
            converter_address,
            watched_pairs,
            start_block,
            chunk_size,
            poll_interval_ms,
        })
    }
}

fn require(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn parse_u64(
    env_map: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(s) => s.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a valid u64".to_string())
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert(
            "RPC_URL".to_string(),
            "http://localhost:8545".to_string(),
        );
        map.insert(
            "POOL_ADDRESS".to_string(),
            "0x8798249c2e607446efb7ad49ec89dd1865ff4272".to_string(),
        );
        map.insert(
            "ASSET_ADDRESS".to_string(),
            "0x4499eb0bb67f6e3ae8441fcba12765a08794d2cc".to_string(),
        );
        map.insert(
            "PRICE_PAIR_ADDRESS".to_string(),
            "0x680a025da7b1be2c204d7745e809919bce074026".to_string(),
        );
        map
    }

    #[test]
    fn test_minimal_config() {
        let config = Config::from_env_map(setup_required_env()).expect("config should parse");
        assert_eq!(config.start_block, 0);
        assert_eq!(config.chunk_size, 2000);
        assert_eq!(config.poll_interval_ms, 12_000);
        assert!(config.converter_address.is_none());
        assert!(config.watched_pairs.is_empty());
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_pool_address() {
        let mut env_map = setup_required_env();
        env_map.remove("POOL_ADDRESS");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "POOL_ADDRESS"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_start_block() {
        let mut env_map = setup_required_env();
        env_map.insert("START_BLOCK".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "START_BLOCK"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("CHUNK_SIZE".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CHUNK_SIZE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_watched_pairs_parsed_and_normalized() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "WATCHED_PAIRS".to_string(),
            "0xAAA , 0xbbb,".to_string(),
        );
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.watched_pairs.len(), 2);
        assert_eq!(config.watched_pairs[0].as_str(), "0xaaa");
        assert_eq!(config.watched_pairs[1].as_str(), "0xbbb");
    }

    #[test]
    fn test_converter_address_optional() {
        let mut env_map = setup_required_env();
        env_map.insert("CONVERTER_ADDRESS".to_string(), "0xC0NV".to_string());
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(
            config.converter_address.as_ref().map(|a| a.as_str()),
            Some("0xc0nv")
        );
    }
}
