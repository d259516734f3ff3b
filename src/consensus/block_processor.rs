// Feeds blocks into the ledger and forks into elections
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::blockchain::Block;
use crate::ledger::{Ledger, ProcessResult, ProcessReturn};
use crate::primitives::{BlockHash, LedgerError, Result};
use crate::storage::WriteTxn;
use super::active::ActiveElections;

pub struct BlockProcessor {
    ledger: Arc<Ledger>,
    active: Arc<ActiveElections>,
}

impl BlockProcessor {
    pub fn new(ledger: Arc<Ledger>, active: Arc<ActiveElections>) -> Self {
        Self { ledger, active }
    }

    /// Process one block. A fork starts an election between the block already
    /// in the ledger and the newcomer.
    pub fn process_one(&self, txn: &WriteTxn<'_>, block: &Block) -> Result<ProcessReturn> {
        let hash = block.hash();
        let result = self.ledger.process(txn, block)?;
        match result.code {
            ProcessResult::Progress => {
                debug!(hash = %hash, account = %result.account, "✅ Block applied");
            }
            ProcessResult::Fork => {
                if let Some(existing) = self.ledger.forked_block(txn, block)? {
                    self.active.start(existing);
                    self.active.publish(block.clone());
                    info!(hash = %hash, root = %block.root(), "🍴 Fork detected, election running");
                }
            }
            ProcessResult::GapPrevious | ProcessResult::GapSource => {
                debug!(hash = %hash, code = %result.code, "Block waiting on a dependency");
            }
            ProcessResult::Old => {}
            code => {
                warn!(hash = %hash, code = %code, "Block rejected");
            }
        }
        Ok(result)
    }

    /// Make `winner` the block at its root, rolling back whatever occupies it.
    /// Returns the hashes rolled back. A winner the ledger rejects is an error
    /// and the transaction must not be committed.
    pub fn apply_winner(&self, txn: &WriteTxn<'_>, winner: &Block) -> Result<Vec<BlockHash>> {
        let hash = winner.hash();
        if self.ledger.block_exists(txn, &hash)? {
            return Ok(Vec::new());
        }
        let mut removed = Vec::new();
        if let Some(existing) = self.ledger.forked_block(txn, winner)? {
            removed = self.ledger.rollback(txn, &existing.hash())?;
        }
        let result = self.ledger.process(txn, winner)?;
        if result.code != ProcessResult::Progress {
            warn!(winner = %hash, code = %result.code, "Election winner could not be applied");
            return Err(LedgerError::InvalidState(format!(
                "election winner {} rejected with {}",
                hash, result.code
            )));
        }
        info!(winner = %hash, rolled_back = removed.len(), "🏆 Election winner applied");
        Ok(removed)
    }

    /// Apply the winners of every confirmed election and retire them
    pub fn process_confirmed(&self, txn: &WriteTxn<'_>) -> Result<usize> {
        let confirmed = self.active.drain_confirmed();
        for (_, winner) in &confirmed {
            self.apply_winner(txn, winner)?;
        }
        Ok(confirmed.len())
    }
}
