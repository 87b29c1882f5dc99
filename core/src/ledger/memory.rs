use super::{LedgerClient, LedgerError, LedgerResult};
use crate::block::{Block, BlockDraft};
use crate::consensus::{block_digest, meets_difficulty, mine_block, verify_block, verify_link};
use crate::transaction::{Amount, WalletId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Account credited by the genesis block.
pub const RESERVED_ACCOUNT: WalletId = 0;
/// Amount the genesis block mints into the reserved account.
pub const DEFAULT_RESERVE: Amount = 1_000_000.0;

/// Proof-of-work offset of the genesis block for `DEFAULT_RESERVE`.
const DEFAULT_GENESIS_OFFSET: u32 = 257_040;

/// Builds block 0. The default reserve uses its known offset; any other
/// reserve is mined on the calling thread, which blocks for the whole search.
fn genesis_block(reserve: Amount) -> LedgerResult<Block> {
    let draft = BlockDraft::genesis(RESERVED_ACCOUNT, reserve);
    if reserve == DEFAULT_RESERVE {
        let hash = block_digest(&draft, DEFAULT_GENESIS_OFFSET);
        if meets_difficulty(&hash) {
            return Ok(draft.seal(DEFAULT_GENESIS_OFFSET, hash));
        }
    }
    mine_block(draft, None).map_err(|e| LedgerError::InvalidBlock(e.to_string()))
}

#[derive(Debug)]
struct Data {
    blocks: Vec<Block>,
    opening: HashMap<WalletId, Amount>,
    reserve: Amount,
    available: bool,
}

/// In-process ledger with the same contract as the remote service.
#[derive(Clone, Debug)]
pub struct MemoryLedger {
    data: Arc<Mutex<Data>>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(DEFAULT_RESERVE)
    }
}

impl MemoryLedger {
    pub fn new(reserve: Amount) -> Self {
        MemoryLedger {
            data: Arc::new(Mutex::new(Data {
                blocks: Vec::new(),
                opening: HashMap::new(),
                reserve,
                available: true,
            })),
        }
    }

    /// Seeds a balance that exists outside the chain.
    pub fn with_opening_balance(self, account: WalletId, amount: Amount) -> Self {
        self.data.lock().opening.insert(account, amount);
        self
    }

    /// While unavailable every call fails with `LedgerError::Unavailable`.
    pub fn set_available(&self, available: bool) {
        self.data.lock().available = available;
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.data.lock().blocks.clone()
    }

    pub fn len(&self) -> usize {
        self.data.lock().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().blocks.is_empty()
    }

    fn ensure_available(data: &Data) -> LedgerResult<()> {
        if data.available {
            Ok(())
        } else {
            Err(LedgerError::Unavailable)
        }
    }

    fn balance_of(data: &Data, account: WalletId) -> Amount {
        let mut balance = data.opening.get(&account).copied().unwrap_or(0.0);
        for block in &data.blocks {
            if block.is_genesis() {
                if block.wallet_id_to == account {
                    balance += block.amount;
                }
                continue;
            }
            if block.wallet_id_to == account {
                balance += block.amount;
            }
            if block.wallet_id_from == account {
                balance -= block.amount;
            }
        }
        balance
    }
}

impl LedgerClient for MemoryLedger {
    async fn create_reserved_account(&self) -> LedgerResult<()> {
        let reserve = {
            let data = self.data.lock();
            Self::ensure_available(&data)?;
            if !data.blocks.is_empty() {
                log::debug!("Reserved account already exists");
                return Ok(());
            }
            data.reserve
        };

        let genesis = genesis_block(reserve)?;

        let mut data = self.data.lock();
        if data.blocks.is_empty() {
            log::info!("Genesis block created with hash {}", genesis.curr_block_hash);
            data.blocks.push(genesis);
        }
        Ok(())
    }

    async fn submit_block(&self, block: &Block) -> LedgerResult<()> {
        let mut data = self.data.lock();
        Self::ensure_available(&data)?;

        let tip = data
            .blocks
            .last()
            .ok_or_else(|| LedgerError::InvalidBlock("chain has no genesis block".to_string()))?;
        if !verify_link(tip, block) {
            return Err(LedgerError::InvalidBlock(format!(
                "block {} does not extend tip {}",
                block.block_id, tip.block_id
            )));
        }
        if !verify_block(block) {
            return Err(LedgerError::InvalidBlock(format!(
                "block {} has an invalid hash",
                block.block_id
            )));
        }
        if Self::balance_of(&data, block.wallet_id_from) < block.amount {
            return Err(LedgerError::InvalidBlock(format!(
                "account {} cannot cover {}",
                block.wallet_id_from, block.amount
            )));
        }

        data.blocks.push(block.clone());
        Ok(())
    }

    async fn get_balance(&self, account: WalletId) -> LedgerResult<Amount> {
        let data = self.data.lock();
        Self::ensure_available(&data)?;
        Ok(Self::balance_of(&data, account))
    }

    async fn get_chain(&self) -> LedgerResult<Vec<Block>> {
        let data = self.data.lock();
        Self::ensure_available(&data)?;
        Ok(data.blocks.clone())
    }
}
