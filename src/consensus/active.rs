// Registry of running elections, keyed by contested root
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use libmdbx::TransactionKind;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::blockchain::{Block, Vote};
use crate::config::ElectionConfig;
use crate::ledger::Ledger;
use crate::primitives::{Account, Amount, Result, Root};
use crate::storage::Txn;
use super::election::{Election, ElectionStatus, LastVote, VoteOutcome};

/// Active elections. Every operation is serialized under one lock.
pub struct ActiveElections {
    ledger: Arc<Ledger>,
    config: ElectionConfig,
    roots: Mutex<HashMap<Root, Election>>,
}

impl ActiveElections {
    pub fn new(ledger: Arc<Ledger>, config: ElectionConfig) -> Self {
        Self {
            ledger,
            config,
            roots: Mutex::new(HashMap::new()),
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    /// Begin an election seeded with `block`. Returns false when one already
    /// runs for its root.
    pub fn start(&self, block: Block) -> bool {
        let root = block.root();
        let mut roots = self.roots.lock();
        if roots.contains_key(&root) {
            return false;
        }
        debug!(root = %root, block = %block.hash(), "Election started");
        roots.insert(root, Election::new(block, &self.config));
        true
    }

    /// Record a vote whose signature was already checked
    pub fn vote(&self, vote: &Vote) -> VoteOutcome {
        self.vote_at(vote, Instant::now())
    }

    pub fn vote_at(&self, vote: &Vote, now: Instant) -> VoteOutcome {
        let root = vote.block.root();
        let mut roots = self.roots.lock();
        match roots.get_mut(&root) {
            Some(election) => election.vote(vote.account, vote.sequence, &vote.block, now),
            None => VoteOutcome::NoElection,
        }
    }

    /// Offer `block` to the election for its root. Returns true when it is a
    /// new competing candidate.
    pub fn publish(&self, block: Block) -> bool {
        let root = block.root();
        let mut roots = self.roots.lock();
        match roots.get_mut(&root) {
            Some(election) => election.publish(block),
            None => false,
        }
    }

    /// Weighted candidates for `root`, heaviest first; empty without an election
    pub fn tally<K: TransactionKind>(&self, txn: &Txn<'_, K>, root: &Root) -> Result<Vec<(Amount, Block)>> {
        let roots = self.roots.lock();
        match roots.get(root) {
            Some(election) => election.tally(txn, &self.ledger),
            None => Ok(Vec::new()),
        }
    }

    /// Confirm the election for `root` if its leader holds quorum. Returns the
    /// winner on the call that confirms it.
    pub fn confirm_if_quorum<K: TransactionKind>(&self, txn: &Txn<'_, K>, root: &Root) -> Result<Option<Block>> {
        let delta = self.quorum_delta(txn)?;
        let mut roots = self.roots.lock();
        let Some(election) = roots.get_mut(root) else {
            return Ok(None);
        };
        let winner = election.confirm_if_quorum(txn, &self.ledger, delta)?;
        if let Some(block) = &winner {
            info!(root = %root, winner = %block.hash(), "🗳️ Election confirmed");
        }
        Ok(winner)
    }

    /// Weight margin the leader must exceed over the runner-up
    pub fn quorum_delta<K: TransactionKind>(&self, txn: &Txn<'_, K>) -> Result<Amount> {
        let supply = self.ledger.supply(txn)?;
        Ok(supply / 100 * Amount::from(self.config.quorum_percent.min(100)))
    }

    /// Remove confirmed elections, returning their winners
    pub fn drain_confirmed(&self) -> Vec<(Root, Block)> {
        let mut roots = self.roots.lock();
        let confirmed: Vec<Root> = roots
            .iter()
            .filter(|(_, election)| election.is_confirmed())
            .map(|(root, _)| *root)
            .collect();
        confirmed
            .into_iter()
            .filter_map(|root| {
                let election = roots.remove(&root)?;
                let ElectionStatus::Confirmed { winner } = election.status() else {
                    return None;
                };
                election
                    .candidates()
                    .find(|block| block.hash() == winner)
                    .cloned()
                    .map(|block| (root, block))
            })
            .collect()
    }

    pub fn erase(&self, root: &Root) -> bool {
        self.roots.lock().remove(root).is_some()
    }

    pub fn active(&self, root: &Root) -> bool {
        self.roots.lock().contains_key(root)
    }

    pub fn status(&self, root: &Root) -> Option<ElectionStatus> {
        self.roots.lock().get(root).map(|election| election.status())
    }

    pub fn last_vote(&self, root: &Root, account: &Account) -> Option<LastVote> {
        self.roots
            .lock()
            .get(root)
            .and_then(|election| election.last_vote(account).copied())
    }

    pub fn size(&self) -> usize {
        self.roots.lock().len()
    }
}
