use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Account identifier. Any unused id is a valid account with a zero balance.
pub type WalletId = u32;

/// Coin amount. Single precision because its decimal text is part of the
/// block hash input and must render the same way for every verifier.
pub type Amount = f32;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransactionError {
    #[error("amount must be a positive number, got {0}")]
    NonPositiveAmount(Amount),
    #[error("amount is not a finite number")]
    NonFiniteAmount,
    #[error("sender and receiver are the same account ({0})")]
    SelfTransfer(WalletId),
}

/// A pending transfer, consumed exactly once by the mining worker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    pub sender: WalletId,
    pub receiver: WalletId,
    pub amount: Amount,
}

impl Transaction {
    pub fn new(sender: WalletId, receiver: WalletId, amount: Amount) -> Self {
        Transaction {
            sender,
            receiver,
            amount,
        }
    }

    /// Checks the worker applies before touching the ledger.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if !self.amount.is_finite() {
            return Err(TransactionError::NonFiniteAmount);
        }
        if self.amount <= 0.0 {
            return Err(TransactionError::NonPositiveAmount(self.amount));
        }
        Ok(())
    }

    /// Producer-side invariant, checked where transactions are created.
    pub fn check_distinct_accounts(&self) -> Result<(), TransactionError> {
        if self.sender == self.receiver {
            return Err(TransactionError::SelfTransfer(self.sender));
        }
        Ok(())
    }
}
