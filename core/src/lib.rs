pub mod block;
pub mod consensus;
pub mod ledger;
pub mod transaction;

pub use block::{Block, BlockDraft};
pub use ledger::{HttpLedger, LedgerClient, LedgerError, MemoryLedger};
pub use transaction::{Amount, Transaction, TransactionError, WalletId};
