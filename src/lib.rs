pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use datasource::{ChainSource, ChainSourceError, MockChainSource, RpcChainSource};
pub use db::{init_db, Repository};
pub use domain::{
    Address, Decimal, HistoryBucket, Holder, Pool, SwapEvent, Timestamp, TransferEvent,
    TransferKind, TxHash,
};
pub use error::AppError;
pub use orchestration::{IndexError, Indexer};
