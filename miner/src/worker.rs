use crate::error::{DropReason, MinerError, Result};
use crate::queue::QueueReceiver;
use crate::{MinerPhase, MiningState, summarize};
use blockmint_core::consensus;
use blockmint_core::{Block, BlockDraft, LedgerClient, Transaction};
use std::sync::Arc;

/// Result of one pass through the worker loop.
#[derive(Debug)]
pub enum Outcome {
    Mined(Block),
    Dropped(DropReason),
    Abandoned(MinerError),
}

/// Turns queued transactions into blocks, one at a time.
///
/// Each transaction is validated, checked against the sender's balance,
/// built on top of the current chain tip, solved and submitted. Nothing is
/// retried and nothing is reported back to the submitter; every outcome is
/// logged and the loop moves on.
pub struct MiningWorker<L: LedgerClient> {
    ledger: Arc<L>,
    queue: QueueReceiver,
    state: Arc<MiningState>,
    max_pow_attempts: Option<u64>,
}

impl<L: LedgerClient> MiningWorker<L> {
    pub fn new(
        ledger: Arc<L>,
        queue: QueueReceiver,
        state: Arc<MiningState>,
        max_pow_attempts: Option<u64>,
    ) -> Self {
        MiningWorker {
            ledger,
            queue,
            state,
            max_pow_attempts,
        }
    }

    /// Asks the ledger for its reserved account. A failure is not fatal: the
    /// ledger may already hold a genesis block from an earlier run.
    pub async fn bootstrap(&self) {
        match self.ledger.create_reserved_account().await {
            Ok(()) => log::info!("Reserved account ready"),
            Err(e) => log::error!("Failed to create reserved account: {}", e),
        }
    }

    /// Bootstraps, then mines until the queue closes.
    pub async fn run(mut self) {
        self.bootstrap().await;
        log::info!("⛏️  Mining worker started");
        while self.step().await.is_some() {}
        log::warn!("Transaction queue closed, mining worker stopping");
    }

    /// Waits for one transaction and processes it. `None` when the queue is
    /// closed.
    pub async fn step(&mut self) -> Option<Outcome> {
        self.state.set_phase(MinerPhase::Idle);
        let tx = self.queue.dequeue().await?;
        log::info!(
            "Dequeued a transaction from {} to {} with amount {}",
            tx.sender,
            tx.receiver,
            tx.amount
        );

        let outcome = match self.process(tx).await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Abandoned(e),
        };
        report(&outcome);
        self.state.record(&outcome);
        self.state.set_phase(MinerPhase::Idle);
        Some(outcome)
    }

    /// One transaction through validate, build, solve and submit.
    pub async fn process(&self, tx: Transaction) -> Result<Outcome> {
        self.state.set_phase(MinerPhase::Validating);
        if let Err(e) = tx.validate() {
            return Ok(Outcome::Dropped(e.into()));
        }

        let balance = self.ledger.get_balance(tx.sender).await?;
        log::debug!("Account {} balance is {}", tx.sender, balance);
        if balance < tx.amount {
            return Ok(Outcome::Dropped(DropReason::InsufficientBalance {
                account: tx.sender,
                balance,
                amount: tx.amount,
            }));
        }

        self.state.set_phase(MinerPhase::Building);
        let chain = self.ledger.get_chain().await?;
        let tip = chain.last().ok_or(MinerError::EmptyChain)?;
        let draft = BlockDraft::next(tip, &tx);

        self.state.set_phase(MinerPhase::Solving);
        let max_attempts = self.max_pow_attempts;
        let block =
            tokio::task::spawn_blocking(move || consensus::mine_block(draft, max_attempts))
                .await??;

        self.state.set_phase(MinerPhase::Submitting);
        self.ledger.submit_block(&block).await?;
        Ok(Outcome::Mined(block))
    }
}

fn report(outcome: &Outcome) {
    match outcome {
        Outcome::Mined(block) => log::info!("✅ Mined new block {}", summarize(block)),
        Outcome::Dropped(reason) => log::warn!("Transaction dropped: {}", reason),
        Outcome::Abandoned(e) => log::error!("Mining iteration abandoned: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{QueueSender, transaction_queue};
    use blockmint_core::consensus::{PowError, verify_block};
    use blockmint_core::{LedgerError, MemoryLedger, TransactionError};
    use std::sync::atomic::Ordering;

    fn worker(
        ledger: &MemoryLedger,
        max_pow_attempts: Option<u64>,
    ) -> (QueueSender, MiningWorker<MemoryLedger>, Arc<MiningState>) {
        let (sender, receiver) = transaction_queue();
        let state = Arc::new(MiningState::default());
        let worker = MiningWorker::new(
            Arc::new(ledger.clone()),
            receiver,
            state.clone(),
            max_pow_attempts,
        );
        (sender, worker, state)
    }

    #[tokio::test]
    async fn mines_affordable_transaction() {
        let ledger = MemoryLedger::default().with_opening_balance(1, 50.0);
        let (sender, mut worker, state) = worker(&ledger, None);
        worker.bootstrap().await;
        let genesis = ledger.blocks()[0].clone();

        sender.enqueue(Transaction::new(1, 2, 10.0));
        let block = match worker.step().await {
            Some(Outcome::Mined(block)) => block,
            other => panic!("expected a mined block, got {:?}", other),
        };

        assert_eq!(block.block_id, 1);
        assert_eq!(block.prev_block_hash, genesis.curr_block_hash);
        assert_eq!(block.block_offset, 54890);
        assert_eq!(block.curr_block_hash, "12345703029595385696");
        assert!(verify_block(&block));
        assert_eq!(ledger.blocks().last(), Some(&block));
        assert_eq!(state.blocks_mined.load(Ordering::SeqCst), 1);
        assert_eq!(state.last_block().unwrap().block_id, 1);
        assert_eq!(state.phase(), MinerPhase::Idle);
    }

    #[tokio::test]
    async fn drops_when_balance_is_short() {
        let ledger = MemoryLedger::default();
        let (sender, mut worker, state) = worker(&ledger, None);
        worker.bootstrap().await;

        sender.enqueue(Transaction::new(1, 2, 10.0));
        match worker.step().await {
            Some(Outcome::Dropped(DropReason::InsufficientBalance {
                account,
                balance,
                amount,
            })) => {
                assert_eq!((account, balance, amount), (1, 0.0, 10.0));
            }
            other => panic!("expected a drop, got {:?}", other),
        }
        assert_eq!(ledger.len(), 1);
        assert_eq!(state.dropped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_amounts_never_reach_the_ledger() {
        let ledger = MemoryLedger::default();
        let (sender, mut worker, _state) = worker(&ledger, None);
        ledger.set_available(false);

        sender.enqueue(Transaction::new(1, 2, 0.0));
        sender.enqueue(Transaction::new(1, 2, -4.0));
        for expected in [0.0, -4.0] {
            match worker.step().await {
                Some(Outcome::Dropped(DropReason::Invalid(TransactionError::NonPositiveAmount(
                    amount,
                )))) => assert_eq!(amount, expected),
                other => panic!("expected an invalid drop, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn ledger_failures_abandon_one_iteration_only() {
        let ledger = MemoryLedger::default().with_opening_balance(1, 50.0);
        let (sender, mut worker, state) = worker(&ledger, None);
        worker.bootstrap().await;

        ledger.set_available(false);
        sender.enqueue(Transaction::new(1, 2, 10.0));
        assert!(matches!(
            worker.step().await,
            Some(Outcome::Abandoned(MinerError::Ledger(LedgerError::Unavailable)))
        ));

        ledger.set_available(true);
        sender.enqueue(Transaction::new(1, 2, 10.0));
        assert!(matches!(worker.step().await, Some(Outcome::Mined(_))));
        assert_eq!(state.abandoned.load(Ordering::SeqCst), 1);
        assert_eq!(state.blocks_mined.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_chain_is_abandoned() {
        let ledger = MemoryLedger::default().with_opening_balance(1, 50.0);
        let (sender, mut worker, _state) = worker(&ledger, None);

        sender.enqueue(Transaction::new(1, 2, 10.0));
        assert!(matches!(
            worker.step().await,
            Some(Outcome::Abandoned(MinerError::EmptyChain))
        ));
    }

    #[tokio::test]
    async fn attempt_ceiling_abandons_the_block() {
        let ledger = MemoryLedger::default().with_opening_balance(1, 50.0);
        let (sender, mut worker, _state) = worker(&ledger, Some(1));
        worker.bootstrap().await;

        sender.enqueue(Transaction::new(1, 2, 10.0));
        assert!(matches!(
            worker.step().await,
            Some(Outcome::Abandoned(MinerError::Pow(PowError::AttemptsExhausted(1))))
        ));
        assert_eq!(ledger.len(), 1);
    }

    #[tokio::test]
    async fn failed_bootstrap_does_not_stop_the_worker() {
        let ledger = MemoryLedger::default();
        let (sender, worker, _state) = worker(&ledger, None);
        ledger.set_available(false);
        worker.bootstrap().await;
        assert!(ledger.is_empty());

        drop(sender);
        // closed queue: run returns instead of spinning
        tokio::time::timeout(std::time::Duration::from_secs(5), worker.run())
            .await
            .unwrap();
    }
}
