//! Ethereum JSON-RPC chain source.
//!
//! Fetches Transfer/Swap logs, resolves block timestamps, and performs the
//! live contract reads via `eth_call`. All requests go through one retry
//! wrapper with exponential backoff; 429 and 5xx responses are transient,
//! other client errors are permanent.

use super::{ChainSource, ChainSourceError};
use crate::domain::{Address, Decimal, SwapEvent, Timestamp, TransferEvent, TxHash};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use futures::future::try_join_all;
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, warn};

/// keccak256("Transfer(address,address,uint256)")
const TRANSFER_TOPIC: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
/// keccak256("Swap(address,uint256,uint256,uint256,uint256,address)")
const SWAP_TOPIC: &str = "0xd78ad95fa46c994b6551d0da85fc275fe613ce37657fb8d5e3d130840159d822";

const SELECTOR_TOTAL_SUPPLY: &str = "0x18160ddd";
const SELECTOR_BALANCE_OF: &str = "0x70a08231";
const SELECTOR_GET_RESERVES: &str = "0x0902f1ac";
const SELECTOR_TOKEN0: &str = "0x0dfe1681";
const SELECTOR_TOKEN1: &str = "0xd21220a7";

const SHARE_TOKEN_DECIMALS: u32 = 18;
const ASSET_TOKEN_DECIMALS: u32 = 18;
const REFERENCE_TOKEN_DECIMALS: u32 = 6;

/// JSON-RPC chain source for the pool's share token and its price pair.
#[derive(Debug, Clone)]
pub struct RpcChainSource {
    client: Client,
    rpc_url: String,
    pool_address: Address,
    asset_address: Address,
    price_pair_address: Address,
    watched_pairs: Vec<Address>,
}

impl RpcChainSource {
    /// Create a new RPC chain source.
    pub fn new(
        rpc_url: String,
        pool_address: Address,
        asset_address: Address,
        price_pair_address: Address,
        watched_pairs: Vec<Address>,
    ) -> Self {
        Self {
            client: Client::new(),
            rpc_url,
            pool_address,
            asset_address,
            price_pair_address,
            watched_pairs,
        }
    }

    async fn post_rpc(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ChainSourceError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        retry(backoff, || async {
            let payload = serde_json::json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params.clone(),
            });

            let response = self
                .client
                .post(&self.rpc_url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(ChainSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(ChainSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(ChainSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(ChainSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            let body: serde_json::Value = response.json().await.map_err(|e| {
                backoff::Error::permanent(ChainSourceError::ParseError(e.to_string()))
            })?;

            if let Some(err) = body.get("error") {
                return Err(backoff::Error::permanent(ChainSourceError::RpcError(
                    err.to_string(),
                )));
            }

            body.get("result").cloned().ok_or_else(|| {
                backoff::Error::permanent(ChainSourceError::ParseError(
                    "Missing result field".to_string(),
                ))
            })
        })
        .await
    }

    async fn eth_call(
        &self,
        to: &Address,
        data: String,
    ) -> Result<Vec<[u8; 32]>, ChainSourceError> {
        let result = self
            .post_rpc(
                "eth_call",
                serde_json::json!([{"to": to.as_str(), "data": data}, "latest"]),
            )
            .await?;

        let hex_str = result
            .as_str()
            .ok_or_else(|| ChainSourceError::ParseError("Expected hex string".to_string()))?;
        decode_words(hex_str)
    }

    async fn block_timestamp(&self, block: u64) -> Result<(u64, Timestamp), ChainSourceError> {
        let result = self
            .post_rpc(
                "eth_getBlockByNumber",
                serde_json::json!([format!("0x{:x}", block), false]),
            )
            .await?;

        let ts_hex = result
            .get("timestamp")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ChainSourceError::ParseError(format!("Block {} missing timestamp", block))
            })?;

        Ok((block, Timestamp::new(parse_hex_u64(ts_hex)? as i64)))
    }

    async fn timestamps_for(
        &self,
        logs: &[serde_json::Value],
    ) -> Result<HashMap<u64, Timestamp>, ChainSourceError> {
        let blocks: HashSet<u64> = logs
            .iter()
            .filter_map(|log| log.get("blockNumber").and_then(|v| v.as_str()))
            .filter_map(|s| parse_hex_u64(s).ok())
            .collect();

        let resolved =
            try_join_all(blocks.into_iter().map(|b| self.block_timestamp(b))).await?;
        Ok(resolved.into_iter().collect())
    }

    async fn transaction_origin(&self, tx_hash: &str) -> Result<Address, ChainSourceError> {
        let result = self
            .post_rpc("eth_getTransactionByHash", serde_json::json!([tx_hash]))
            .await?;

        result
            .get("from")
            .and_then(|v| v.as_str())
            .map(Address::new)
            .ok_or_else(|| {
                ChainSourceError::ParseError(format!("Transaction {} missing sender", tx_hash))
            })
    }

    async fn pair_tokens(&self, pair: &Address) -> Result<(Address, Address), ChainSourceError> {
        let token0 = self
            .eth_call(pair, SELECTOR_TOKEN0.to_string())
            .await?
            .first()
            .map(word_to_address)
            .ok_or_else(|| ChainSourceError::ParseError("Empty token0 response".to_string()))?;
        let token1 = self
            .eth_call(pair, SELECTOR_TOKEN1.to_string())
            .await?
            .first()
            .map(word_to_address)
            .ok_or_else(|| ChainSourceError::ParseError("Empty token1 response".to_string()))?;
        Ok((token0, token1))
    }
}

#[async_trait]
impl ChainSource for RpcChainSource {
    async fn latest_block(&self) -> Result<u64, ChainSourceError> {
        let result = self.post_rpc("eth_blockNumber", serde_json::json!([])).await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| ChainSourceError::ParseError("Expected hex string".to_string()))?;
        parse_hex_u64(hex_str)
    }

    async fn fetch_transfers(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferEvent>, ChainSourceError> {
        debug!(
            "Fetching transfers for {} in blocks [{}, {}]",
            self.pool_address, from_block, to_block
        );

        let result = self
            .post_rpc(
                "eth_getLogs",
                serde_json::json!([{
                    "address": self.pool_address.as_str(),
                    "topics": [TRANSFER_TOPIC],
                    "fromBlock": format!("0x{:x}", from_block),
                    "toBlock": format!("0x{:x}", to_block),
                }]),
            )
            .await?;

        let logs = result
            .as_array()
            .ok_or_else(|| ChainSourceError::ParseError("Expected log array".to_string()))?;

        let timestamps = self.timestamps_for(logs).await?;

        let mut events = Vec::new();
        for log in logs {
            match parse_transfer_log(log, &timestamps) {
                Ok(event) => events.push(event),
                Err(e) => warn!("Failed to parse transfer log: {}", e),
            }
        }

        events.sort_by_key(|e| (e.block_number, e.log_index));
        Ok(events)
    }

    async fn fetch_swaps(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<SwapEvent>, ChainSourceError> {
        if self.watched_pairs.is_empty() {
            return Ok(Vec::new());
        }

        let addresses: Vec<&str> = self.watched_pairs.iter().map(|a| a.as_str()).collect();
        let result = self
            .post_rpc(
                "eth_getLogs",
                serde_json::json!([{
                    "address": addresses,
                    "topics": [SWAP_TOPIC],
                    "fromBlock": format!("0x{:x}", from_block),
                    "toBlock": format!("0x{:x}", to_block),
                }]),
            )
            .await?;

        let logs = result
            .as_array()
            .ok_or_else(|| ChainSourceError::ParseError("Expected log array".to_string()))?;

        let timestamps = self.timestamps_for(logs).await?;

        let mut events = Vec::new();
        for log in logs {
            let parsed = match parse_swap_log(log, &timestamps) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Failed to parse swap log: {}", e);
                    continue;
                }
            };

            let tx_origin = self.transaction_origin(parsed.tx_hash.as_str()).await?;
            let (token0, token1) = self.pair_tokens(&parsed.pair).await?;

            events.push(SwapEvent {
                pair: parsed.pair,
                sender: parsed.sender,
                to: parsed.to,
                amount0_out: parsed.amount0_out,
                tx_origin,
                token0,
                token1,
                block_number: parsed.block_number,
                timestamp: parsed.timestamp,
                tx_hash: parsed.tx_hash,
            });
        }

        events.sort_by_key(|e| e.block_number);
        Ok(events)
    }

    async fn share_supply(&self) -> Result<Decimal, ChainSourceError> {
        let words = self
            .eth_call(&self.pool_address, SELECTOR_TOTAL_SUPPLY.to_string())
            .await?;
        let word = words
            .first()
            .ok_or_else(|| ChainSourceError::ParseError("Empty totalSupply response".to_string()))?;
        Decimal::from_atoms(word_to_i128(word)?, SHARE_TOKEN_DECIMALS)
            .map_err(|e| ChainSourceError::ParseError(format!("Invalid supply: {}", e)))
    }

    async fn staked_balance(&self) -> Result<Decimal, ChainSourceError> {
        let data = balance_of_calldata(&self.pool_address);
        let words = self.eth_call(&self.asset_address, data).await?;
        let word = words
            .first()
            .ok_or_else(|| ChainSourceError::ParseError("Empty balanceOf response".to_string()))?;
        Decimal::from_atoms(word_to_i128(word)?, ASSET_TOKEN_DECIMALS)
            .map_err(|e| ChainSourceError::ParseError(format!("Invalid balance: {}", e)))
    }

    async fn reference_price(&self) -> Result<Decimal, ChainSourceError> {
        let words = self
            .eth_call(&self.price_pair_address, SELECTOR_GET_RESERVES.to_string())
            .await?;
        if words.len() < 2 {
            return Err(ChainSourceError::ParseError(
                "getReserves returned fewer than two words".to_string(),
            ));
        }

        let reserve0 = Decimal::from_atoms(word_to_i128(&words[0])?, ASSET_TOKEN_DECIMALS)
            .map_err(|e| ChainSourceError::ParseError(format!("Invalid reserve0: {}", e)))?;
        let reserve1 = Decimal::from_atoms(word_to_i128(&words[1])?, REFERENCE_TOKEN_DECIMALS)
            .map_err(|e| ChainSourceError::ParseError(format!("Invalid reserve1: {}", e)))?;

        if reserve0.is_zero() {
            return Err(ChainSourceError::ParseError(
                "Price pair has empty reserves".to_string(),
            ));
        }

        Ok(reserve1 / reserve0)
    }
}

struct ParsedSwapLog {
    pair: Address,
    sender: Address,
    to: Address,
    amount0_out: Decimal,
    block_number: u64,
    timestamp: Timestamp,
    tx_hash: TxHash,
}

fn parse_transfer_log(
    log: &serde_json::Value,
    timestamps: &HashMap<u64, Timestamp>,
) -> Result<TransferEvent, ChainSourceError> {
    let topics = log
        .get("topics")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ChainSourceError::ParseError("Log missing topics".to_string()))?;
    if topics.len() < 3 {
        return Err(ChainSourceError::ParseError(
            "Transfer log has fewer than three topics".to_string(),
        ));
    }

    let from = topic_to_address(&topics[1])?;
    let to = topic_to_address(&topics[2])?;

    let data = log
        .get("data")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ChainSourceError::ParseError("Log missing data".to_string()))?;
    let words = decode_words(data)?;
    let word = words
        .first()
        .ok_or_else(|| ChainSourceError::ParseError("Transfer log has empty data".to_string()))?;
    let value = Decimal::from_atoms(word_to_i128(word)?, SHARE_TOKEN_DECIMALS)
        .map_err(|e| ChainSourceError::ParseError(format!("Invalid amount: {}", e)))?;

    let block_number = hex_field(log, "blockNumber")?;
    let log_index = hex_field(log, "logIndex")?;
    let tx_hash = log
        .get("transactionHash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ChainSourceError::ParseError("Log missing transactionHash".to_string()))?;

    let timestamp = timestamps.get(&block_number).copied().ok_or_else(|| {
        ChainSourceError::ParseError(format!("No timestamp for block {}", block_number))
    })?;

    Ok(TransferEvent {
        from,
        to,
        value,
        block_number,
        timestamp,
        tx_hash: TxHash::new(tx_hash),
        log_index,
    })
}

fn parse_swap_log(
    log: &serde_json::Value,
    timestamps: &HashMap<u64, Timestamp>,
) -> Result<ParsedSwapLog, ChainSourceError> {
    let topics = log
        .get("topics")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ChainSourceError::ParseError("Log missing topics".to_string()))?;
    if topics.len() < 3 {
        return Err(ChainSourceError::ParseError(
            "Swap log has fewer than three topics".to_string(),
        ));
    }

    let pair = log
        .get("address")
        .and_then(|v| v.as_str())
        .map(Address::new)
        .ok_or_else(|| ChainSourceError::ParseError("Log missing address".to_string()))?;

    let data = log
        .get("data")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ChainSourceError::ParseError("Log missing data".to_string()))?;
    let words = decode_words(data)?;
    if words.len() < 4 {
        return Err(ChainSourceError::ParseError(
            "Swap log has fewer than four data words".to_string(),
        ));
    }
    // amount0In, amount1In, amount0Out, amount1Out
    let amount0_out = Decimal::from_atoms(word_to_i128(&words[2])?, ASSET_TOKEN_DECIMALS)
        .map_err(|e| ChainSourceError::ParseError(format!("Invalid amount0Out: {}", e)))?;

    let block_number = hex_field(log, "blockNumber")?;
    let tx_hash = log
        .get("transactionHash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ChainSourceError::ParseError("Log missing transactionHash".to_string()))?;

    let timestamp = timestamps.get(&block_number).copied().ok_or_else(|| {
        ChainSourceError::ParseError(format!("No timestamp for block {}", block_number))
    })?;

    Ok(ParsedSwapLog {
        pair,
        sender: topic_to_address(&topics[1])?,
        to: topic_to_address(&topics[2])?,
        amount0_out,
        block_number,
        timestamp,
        tx_hash: TxHash::new(tx_hash),
    })
}

fn hex_field(log: &serde_json::Value, field: &str) -> Result<u64, ChainSourceError> {
    log.get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ChainSourceError::ParseError(format!("Log missing {}", field)))
        .and_then(parse_hex_u64)
}

fn parse_hex_u64(s: &str) -> Result<u64, ChainSourceError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ChainSourceError::ParseError(format!("Invalid hex quantity {}: {}", s, e)))
}

fn decode_words(data: &str) -> Result<Vec<[u8; 32]>, ChainSourceError> {
    let bytes = hex::decode(data.trim_start_matches("0x"))
        .map_err(|e| ChainSourceError::ParseError(format!("Invalid hex data: {}", e)))?;
    if bytes.len() % 32 != 0 {
        return Err(ChainSourceError::ParseError(format!(
            "Data length {} is not word-aligned",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks(32)
        .map(|chunk| {
            let mut word = [0u8; 32];
            word.copy_from_slice(chunk);
            word
        })
        .collect())
}

fn word_to_i128(word: &[u8; 32]) -> Result<i128, ChainSourceError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(ChainSourceError::ParseError(
            "Amount exceeds 128 bits".to_string(),
        ));
    }
    let mut lower = [0u8; 16];
    lower.copy_from_slice(&word[16..]);
    let value = u128::from_be_bytes(lower);
    i128::try_from(value)
        .map_err(|_| ChainSourceError::ParseError("Amount exceeds i128".to_string()))
}

fn word_to_address(word: &[u8; 32]) -> Address {
    Address::new(format!("0x{}", hex::encode(&word[12..])))
}

fn topic_to_address(topic: &serde_json::Value) -> Result<Address, ChainSourceError> {
    let s = topic
        .as_str()
        .ok_or_else(|| ChainSourceError::ParseError("Topic is not a string".to_string()))?;
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| ChainSourceError::ParseError(format!("Invalid topic hex: {}", e)))?;
    if bytes.len() != 32 {
        return Err(ChainSourceError::ParseError(format!(
            "Topic length {} is not 32 bytes",
            bytes.len()
        )));
    }
    Ok(Address::new(format!("0x{}", hex::encode(&bytes[12..]))))
}

fn balance_of_calldata(account: &Address) -> String {
    format!(
        "{}000000000000000000000000{}",
        SELECTOR_BALANCE_OF,
        account.as_str().trim_start_matches("0x")
    )
}
