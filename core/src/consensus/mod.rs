// core/consensus.rs
use crate::block::{Block, BlockDraft, digest_decimal};
use thiserror::Error;

/// A block hash is valid when its decimal form starts with this.
pub const DIFFICULTY_PREFIX: &str = "12345";
/// Offsets are searched in multiples of this step.
pub const OFFSET_STEP: u32 = 5;

const PROGRESS_INTERVAL: u64 = 100_000;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PowError {
    #[error("no valid offset within {0} attempts")]
    AttemptsExhausted(u64),
    #[error("offset space exhausted for block {0}")]
    OffsetOverflow(u32),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,
    #[error("first block has id {0}, expected 0")]
    MissingGenesis(u32),
    #[error("block {0} has an invalid proof-of-work")]
    InvalidProof(u32),
    #[error("block {0} does not link to its predecessor")]
    BrokenLink(u32),
}

pub fn block_digest(draft: &BlockDraft, offset: u32) -> String {
    digest_decimal(&draft.hash_input(offset))
}

pub fn meets_difficulty(hash: &str) -> bool {
    hash.starts_with(DIFFICULTY_PREFIX)
}

/// Linear search for the smallest positive multiple of `OFFSET_STEP` whose
/// digest meets the difficulty. CPU bound; async callers should run it in
/// `spawn_blocking`.
///
/// `max_attempts` bounds the search. `None` searches until the `u32` offset
/// space runs out.
pub fn find_valid_offset(
    draft: &BlockDraft,
    max_attempts: Option<u64>,
) -> Result<(u32, String), PowError> {
    let started = std::time::Instant::now();
    let mut offset: u32 = 0;
    let mut attempts: u64 = 0;

    loop {
        if let Some(limit) = max_attempts {
            if attempts >= limit {
                return Err(PowError::AttemptsExhausted(limit));
            }
        }

        offset = offset
            .checked_add(OFFSET_STEP)
            .ok_or(PowError::OffsetOverflow(draft.block_id))?;
        attempts += 1;

        let hash = block_digest(draft, offset);
        if meets_difficulty(&hash) {
            log::debug!(
                "Found offset {} for block {} after {} attempts ({:?})",
                offset,
                draft.block_id,
                attempts,
                started.elapsed()
            );
            return Ok((offset, hash));
        }

        if attempts % PROGRESS_INTERVAL == 0 {
            let elapsed = started.elapsed().as_secs_f64();
            let hashrate = if elapsed > 0.0 {
                attempts as f64 / elapsed
            } else {
                0.0
            };
            log::debug!(
                "⛏️  Block {}: {} offsets tried, {:.2} H/s",
                draft.block_id,
                attempts,
                hashrate
            );
        }
    }
}

/// Runs the offset search and seals the draft into a block.
pub fn mine_block(draft: BlockDraft, max_attempts: Option<u64>) -> Result<Block, PowError> {
    let (offset, hash) = find_valid_offset(&draft, max_attempts)?;
    Ok(draft.seal(offset, hash))
}

/// Re-derives the block hash from its stored offset.
pub fn verify_block(block: &Block) -> bool {
    block.block_offset > 0
        && block.block_offset % OFFSET_STEP == 0
        && meets_difficulty(&block.curr_block_hash)
        && block_digest(&block.draft(), block.block_offset) == block.curr_block_hash
}

pub fn verify_link(prev: &Block, next: &Block) -> bool {
    prev.block_id.checked_add(1) == Some(next.block_id)
        && next.prev_block_hash == prev.curr_block_hash
}

/// Checks every proof and every link, oldest block first.
pub fn verify_chain(blocks: &[Block]) -> Result<(), ChainError> {
    let genesis = blocks.first().ok_or(ChainError::Empty)?;
    if !genesis.is_genesis() {
        return Err(ChainError::MissingGenesis(genesis.block_id));
    }

    for (i, block) in blocks.iter().enumerate() {
        if !verify_block(block) {
            return Err(ChainError::InvalidProof(block.block_id));
        }
        if i > 0 && !verify_link(&blocks[i - 1], block) {
            return Err(ChainError::BrokenLink(block.block_id));
        }
    }
    Ok(())
}
