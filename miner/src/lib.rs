pub mod error;
pub mod queue;
pub mod server;
pub mod service;
pub mod worker;

pub use error::{DropReason, MinerError};
pub use server::run_server;
pub use service::MiningService;
pub use worker::{MiningWorker, Outcome};

use blockmint_core::Block;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Where the worker is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MinerPhase {
    Idle,
    Validating,
    Building,
    Solving,
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockSummary {
    pub block_id: u32,
    pub hash: String,
    pub offset: u32,
    pub mined_at: i64,
}

/// Status shared between the worker and the intake server.
pub struct MiningState {
    phase: Mutex<MinerPhase>,
    /// Set once the worker task has been spawned
    pub running: AtomicBool,
    pub blocks_mined: AtomicU64,
    pub dropped: AtomicU64,
    pub abandoned: AtomicU64,
    last_block: Mutex<Option<BlockSummary>>,
    pub node_start_time: std::time::Instant,
}

impl Default for MiningState {
    fn default() -> Self {
        Self {
            phase: Mutex::new(MinerPhase::Idle),
            running: AtomicBool::new(false),
            blocks_mined: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            abandoned: AtomicU64::new(0),
            last_block: Mutex::new(None),
            node_start_time: std::time::Instant::now(),
        }
    }
}

impl MiningState {
    pub fn phase(&self) -> MinerPhase {
        *self.phase.lock()
    }

    pub fn set_phase(&self, phase: MinerPhase) {
        *self.phase.lock() = phase;
    }

    pub fn last_block(&self) -> Option<BlockSummary> {
        self.last_block.lock().clone()
    }

    pub fn record(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Mined(block) => {
                self.blocks_mined.fetch_add(1, Ordering::SeqCst);
                *self.last_block.lock() = Some(BlockSummary {
                    block_id: block.block_id,
                    hash: block.curr_block_hash.clone(),
                    offset: block.block_offset,
                    mined_at: chrono::Utc::now().timestamp(),
                });
            }
            Outcome::Dropped(_) => {
                self.dropped.fetch_add(1, Ordering::SeqCst);
            }
            Outcome::Abandoned(_) => {
                self.abandoned.fetch_add(1, Ordering::SeqCst);
            }
        }
    }
}

pub(crate) fn summarize(block: &Block) -> String {
    format!(
        "id={} from={} to={} amount={} offset={} hash={} prev={}",
        block.block_id,
        block.wallet_id_from,
        block.wallet_id_to,
        block.amount,
        block.block_offset,
        block.curr_block_hash,
        block.prev_block_hash
    )
}
