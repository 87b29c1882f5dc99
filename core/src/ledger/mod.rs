//! Access to the external ledger service that owns the canonical chain.

pub mod http;
pub mod memory;

pub use http::HttpLedger;
pub use memory::MemoryLedger;

use crate::block::Block;
use crate::transaction::{Amount, WalletId};
use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{operation} rejected with status {status}: {body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("ledger unavailable")]
    Unavailable,
    #[error("block rejected: {0}")]
    InvalidBlock(String),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// The four ledger operations the miner depends on. Calls are independent:
/// nothing here is transactional across two calls.
pub trait LedgerClient: Send + Sync + 'static {
    /// Bootstraps the reserved account and its genesis block.
    fn create_reserved_account(&self) -> impl Future<Output = LedgerResult<()>> + Send;

    /// Appends a solved block.
    fn submit_block(&self, block: &Block) -> impl Future<Output = LedgerResult<()>> + Send;

    /// Point-in-time balance, 0 for accounts with no activity.
    fn get_balance(&self, account: WalletId) -> impl Future<Output = LedgerResult<Amount>> + Send;

    /// Full chain, oldest block first.
    fn get_chain(&self) -> impl Future<Output = LedgerResult<Vec<Block>>> + Send;
}
