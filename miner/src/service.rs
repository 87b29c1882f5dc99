use crate::MiningState;
use crate::queue::{QueueSender, transaction_queue};
use crate::worker::MiningWorker;
use blockmint_core::{LedgerClient, Transaction};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::task::JoinHandle;

/// Owns the intake queue and the mining worker for the life of the process.
///
/// The worker is built up front but only spawned by the first submission;
/// the `OnceCell` makes that start happen exactly once no matter how many
/// requests race for it.
pub struct MiningService<L: LedgerClient> {
    queue: QueueSender,
    worker: Mutex<Option<MiningWorker<L>>>,
    started: OnceCell<Option<JoinHandle<()>>>,
    state: Arc<MiningState>,
}

impl<L: LedgerClient> MiningService<L> {
    pub fn new(ledger: L, max_pow_attempts: Option<u64>) -> Self {
        let ledger = Arc::new(ledger);
        let state = Arc::new(MiningState::default());
        let (queue, receiver) = transaction_queue();
        let worker = MiningWorker::new(ledger, receiver, state.clone(), max_pow_attempts);
        MiningService {
            queue,
            worker: Mutex::new(Some(worker)),
            started: OnceCell::new(),
            state,
        }
    }

    pub fn state(&self) -> &Arc<MiningState> {
        &self.state
    }

    pub fn queue_depth(&self) -> usize {
        self.queue.depth()
    }

    pub fn is_started(&self) -> bool {
        self.started.get().is_some()
    }

    /// Spawns the worker on the current runtime the first time it is called.
    pub fn ensure_started(&self) {
        self.started.get_or_init(|| {
            let worker = self.worker.lock().take()?;
            log::info!("🚀 Starting mining worker");
            self.state.running.store(true, Ordering::SeqCst);
            Some(tokio::spawn(worker.run()))
        });
    }

    /// Fire-and-forget intake: the caller never learns what became of `tx`.
    pub fn submit(&self, tx: Transaction) {
        self.ensure_started();
        if !self.queue.enqueue(tx) {
            log::error!("Mining worker is gone, transaction discarded");
        }
    }

    /// Stops the worker task if it is running.
    pub fn abort(&self) {
        if let Some(Some(handle)) = self.started.get() {
            handle.abort();
            self.state.running.store(false, Ordering::SeqCst);
        }
    }
}
