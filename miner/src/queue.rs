use blockmint_core::Transaction;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Unbounded FIFO between the intake server and the mining worker.
/// Any number of producers may enqueue; the single receiver is owned by the
/// worker.
pub fn transaction_queue() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        QueueSender {
            tx,
            depth: depth.clone(),
        },
        QueueReceiver { rx, depth },
    )
}

#[derive(Clone)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<Transaction>,
    depth: Arc<AtomicUsize>,
}

pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<Transaction>,
    depth: Arc<AtomicUsize>,
}

impl QueueSender {
    /// Never blocks. Returns false only when the receiver is gone.
    pub fn enqueue(&self, tx: Transaction) -> bool {
        self.depth.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(tx).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Transactions enqueued but not yet taken by the worker.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

impl QueueReceiver {
    /// Waits for the next transaction. `None` once every sender is dropped
    /// and the queue is drained.
    pub async fn dequeue(&mut self) -> Option<Transaction> {
        let tx = self.rx.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(tx)
    }

    pub fn try_dequeue(&mut self) -> Option<Transaction> {
        let tx = self.rx.try_recv().ok()?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(tx)
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}
