use crate::transaction::{Amount, Transaction, WalletId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Candidate block, everything except the proof-of-work result.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDraft {
    pub block_id: u32,
    pub prev_block_hash: String,
    pub wallet_id_from: WalletId,
    pub wallet_id_to: WalletId,
    pub amount: Amount,
}

/// A mined block. Field names on the wire match the ledger service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub block_id: u32,
    #[serde(alias = "prevBlockHashStr")]
    pub prev_block_hash: String,
    pub wallet_id_from: WalletId,
    pub wallet_id_to: WalletId,
    pub amount: Amount,
    pub block_offset: u32,
    #[serde(alias = "currBlockHashStr")]
    pub curr_block_hash: String,
}

impl BlockDraft {
    /// Draft that commits `tx` on top of `tip`.
    pub fn next(tip: &Block, tx: &Transaction) -> Self {
        BlockDraft {
            block_id: tip.block_id + 1,
            prev_block_hash: tip.curr_block_hash.clone(),
            wallet_id_from: tx.sender,
            wallet_id_to: tx.receiver,
            amount: tx.amount,
        }
    }

    /// Block 0: mints `reserve` into `account`, no predecessor.
    pub fn genesis(account: WalletId, reserve: Amount) -> Self {
        BlockDraft {
            block_id: 0,
            prev_block_hash: String::new(),
            wallet_id_from: account,
            wallet_id_to: account,
            amount: reserve,
        }
    }

    /// Canonical hash input: fields as decimal text, no separators.
    pub fn hash_input(&self, offset: u32) -> String {
        format!(
            "{}{}{}{}{}{}",
            self.block_id,
            self.wallet_id_from,
            self.wallet_id_to,
            self.amount,
            offset,
            self.prev_block_hash
        )
    }

    pub fn seal(self, block_offset: u32, curr_block_hash: String) -> Block {
        Block {
            block_id: self.block_id,
            prev_block_hash: self.prev_block_hash,
            wallet_id_from: self.wallet_id_from,
            wallet_id_to: self.wallet_id_to,
            amount: self.amount,
            block_offset,
            curr_block_hash,
        }
    }
}

impl Block {
    pub fn draft(&self) -> BlockDraft {
        BlockDraft {
            block_id: self.block_id,
            prev_block_hash: self.prev_block_hash.clone(),
            wallet_id_from: self.wallet_id_from,
            wallet_id_to: self.wallet_id_to,
            amount: self.amount,
        }
    }

    pub fn is_genesis(&self) -> bool {
        self.block_id == 0
    }
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(data));
    out
}

/// First 8 bytes of the SHA-256 digest as a little-endian u64, in base 10.
pub fn digest_decimal(input: &str) -> String {
    let hash = sha256(input.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(head).to_string()
}
