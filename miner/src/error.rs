use blockmint_core::consensus::PowError;
use blockmint_core::{Amount, LedgerError, TransactionError, WalletId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MinerError>;

/// Why a transaction left the queue without producing a block.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DropReason {
    #[error("invalid transaction: {0}")]
    Invalid(#[from] TransactionError),
    #[error("account {account} has {balance}, needs {amount}")]
    InsufficientBalance {
        account: WalletId,
        balance: Amount,
        amount: Amount,
    },
}

/// Failures that abandon one worker iteration.
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("ledger returned an empty chain")]
    EmptyChain,
    #[error("proof-of-work failed: {0}")]
    Pow(#[from] PowError),
    #[error("proof-of-work task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
