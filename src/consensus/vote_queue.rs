// Bounded async queue in front of the vote processor
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::blockchain::Vote;
use super::vote_processor::{VoteCode, VoteProcessor};

/// Producer side of the vote queue. Dropping every clone stops the worker
/// once the queued votes are drained.
#[derive(Clone)]
pub struct VoteQueue {
    sender: mpsc::Sender<(Vote, SocketAddr)>,
}

impl VoteQueue {
    /// Spawn the worker on the current runtime
    pub fn spawn(processor: Arc<VoteProcessor>, capacity: usize) -> (Self, JoinHandle<VoteStats>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run(processor, receiver));
        info!(capacity, "📨 Vote queue started");
        (Self { sender }, handle)
    }

    /// Enqueue a vote. Returns false when the queue is full or closed.
    pub fn push(&self, vote: Vote, origin: SocketAddr) -> bool {
        match self.sender.try_send((vote, origin)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(origin = %origin, "Vote queue full, dropping vote");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}

/// Per-code counts of processed votes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteStats {
    pub vote: u64,
    pub replay: u64,
    pub invalid: u64,
    pub errors: u64,
}

async fn run(processor: Arc<VoteProcessor>, mut receiver: mpsc::Receiver<(Vote, SocketAddr)>) -> VoteStats {
    let mut stats = VoteStats::default();
    while let Some((vote, origin)) = receiver.recv().await {
        let processor = processor.clone();
        let outcome = tokio::task::spawn_blocking(move || {
            let store = processor.active().ledger().store().clone();
            let txn = store.tx_begin_read()?;
            processor.vote_blocking(&txn, &vote, origin)
        })
        .await;
        match outcome {
            Ok(Ok(VoteCode::Vote)) => stats.vote += 1,
            Ok(Ok(VoteCode::Replay)) => stats.replay += 1,
            Ok(Ok(VoteCode::Invalid)) => stats.invalid += 1,
            Ok(Err(e)) => {
                stats.errors += 1;
                error!("Vote processing failed: {}", e);
            }
            Err(e) => {
                stats.errors += 1;
                error!("Vote worker task failed: {}", e);
            }
        }
    }
    debug!(?stats, "Vote queue drained");
    stats
}
