// Election over one contested root
use std::collections::HashMap;
use std::time::{Duration, Instant};

use libmdbx::TransactionKind;

use crate::blockchain::Block;
use crate::config::ElectionConfig;
use crate::ledger::Ledger;
use crate::primitives::{Account, Amount, BlockHash, Result, Root};
use crate::storage::Txn;

/// Lifecycle of an election
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionStatus {
    /// Accepting votes, no block is authoritative yet
    Active,
    /// Terminal: `winner` is final for this root
    Confirmed { winner: BlockHash },
}

/// Most recent accepted vote of one representative in one election
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastVote {
    pub sequence: u64,
    pub hash: BlockHash,
    pub time: Instant,
}

/// What happened to a vote handed to the election layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Recorded as the representative's current choice
    Accepted,
    /// Stale or repeated, ignored
    Replay,
    /// No election exists for the vote's root
    NoElection,
}

impl VoteOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, VoteOutcome::Accepted)
    }
}

/// Candidate blocks competing for one root and the votes cast for them
#[derive(Debug, Clone)]
pub struct Election {
    root: Root,
    status: ElectionStatus,
    blocks: HashMap<BlockHash, Block>,
    last_votes: HashMap<Account, LastVote>,
    cooldown: Duration,
    max_candidates: usize,
}

impl Election {
    pub fn new(block: Block, config: &ElectionConfig) -> Self {
        let root = block.root();
        let mut blocks = HashMap::new();
        blocks.insert(block.hash(), block);
        Self {
            root,
            status: ElectionStatus::Active,
            blocks,
            last_votes: HashMap::new(),
            cooldown: config.vote_cooldown(),
            max_candidates: config.max_candidates.max(1),
        }
    }

    pub fn root(&self) -> Root {
        self.root
    }

    pub fn status(&self) -> ElectionStatus {
        self.status
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.status, ElectionStatus::Confirmed { .. })
    }

    pub fn candidates(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn last_vote(&self, account: &Account) -> Option<&LastVote> {
        self.last_votes.get(account)
    }

    pub fn voter_count(&self) -> usize {
        self.last_votes.len()
    }

    /// Add a competing block. Returns true when `block` is a new candidate
    /// distinct from those already known.
    pub fn publish(&mut self, block: Block) -> bool {
        let hash = block.hash();
        if self.blocks.contains_key(&hash) || block.root() != self.root {
            return false;
        }
        if self.blocks.len() >= self.max_candidates {
            return false;
        }
        self.blocks.insert(hash, block);
        true
    }

    /// Record `account`'s vote for `block` at `sequence`.
    ///
    /// A higher sequence always replaces the previous choice. The same sequence
    /// may switch to a different block only after the cooldown has elapsed.
    /// A confirmed election takes no further votes.
    pub fn vote(&mut self, account: Account, sequence: u64, block: &Block, now: Instant) -> VoteOutcome {
        if self.is_confirmed() {
            return VoteOutcome::Replay;
        }
        let hash = block.hash();
        if let Some(last) = self.last_votes.get(&account) {
            let newer = sequence > last.sequence;
            let switch = sequence == last.sequence
                && hash != last.hash
                && now.saturating_duration_since(last.time) >= self.cooldown;
            if !newer && !switch {
                return VoteOutcome::Replay;
            }
        }
        if block.root() == self.root {
            self.blocks.entry(hash).or_insert_with(|| block.clone());
        }
        self.last_votes.insert(
            account,
            LastVote {
                sequence,
                hash,
                time: now,
            },
        );
        VoteOutcome::Accepted
    }

    /// Candidates with the summed weight of their voters, heaviest first
    pub fn tally<K: TransactionKind>(&self, txn: &Txn<'_, K>, ledger: &Ledger) -> Result<Vec<(Amount, Block)>> {
        let mut totals: HashMap<BlockHash, Amount> = self.blocks.keys().map(|hash| (*hash, 0)).collect();
        for (account, last) in &self.last_votes {
            if let Some(total) = totals.get_mut(&last.hash) {
                *total = total.saturating_add(ledger.weight(txn, account)?);
            }
        }
        let mut result: Vec<(Amount, BlockHash)> = totals.into_iter().map(|(hash, weight)| (weight, hash)).collect();
        result.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        Ok(result
            .into_iter()
            .filter_map(|(weight, hash)| self.blocks.get(&hash).map(|block| (weight, block.clone())))
            .collect())
    }

    /// Confirm the leader once it beats the runner-up by more than `quorum_delta`.
    /// Returns the winner only on the call that confirms.
    pub fn confirm_if_quorum<K: TransactionKind>(
        &mut self,
        txn: &Txn<'_, K>,
        ledger: &Ledger,
        quorum_delta: Amount,
    ) -> Result<Option<Block>> {
        if self.is_confirmed() {
            return Ok(None);
        }
        let tally = self.tally(txn, ledger)?;
        let Some((leader_weight, leader)) = tally.first() else {
            return Ok(None);
        };
        let runner_up = tally.get(1).map_or(0, |(weight, _)| *weight);
        if *leader_weight > 0 && leader_weight - runner_up > quorum_delta {
            self.status = ElectionStatus::Confirmed { winner: leader.hash() };
            return Ok(Some(leader.clone()));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn config(cooldown_ms: u64) -> ElectionConfig {
        ElectionConfig {
            vote_cooldown_ms: cooldown_ms,
            ..Default::default()
        }
    }

    fn forks(keys: &KeyPair) -> (Block, Block) {
        let previous = BlockHash::from(1u64);
        (
            Block::send(previous, Account::from(2u64), 10, keys, 0),
            Block::send(previous, Account::from(3u64), 10, keys, 0),
        )
    }

    #[test]
    fn test_higher_sequence_replaces_choice() {
        let keys = KeyPair::from_seed([1u8; 32]);
        let (a, b) = forks(&keys);
        let mut election = Election::new(a.clone(), &config(60_000));
        let rep = Account::from(9u64);
        let now = Instant::now();

        assert_eq!(election.vote(rep, 1, &a, now), VoteOutcome::Accepted);
        assert_eq!(election.vote(rep, 2, &b, now), VoteOutcome::Accepted);
        assert_eq!(election.last_vote(&rep).unwrap().hash, b.hash());
        assert_eq!(election.vote(rep, 1, &a, now), VoteOutcome::Replay);
        assert_eq!(election.last_vote(&rep).unwrap().hash, b.hash());
    }

    #[test]
    fn test_same_sequence_switch_waits_for_cooldown() {
        let keys = KeyPair::from_seed([1u8; 32]);
        let (a, b) = forks(&keys);
        let mut election = Election::new(a.clone(), &config(15_000));
        let rep = Account::from(9u64);
        let start = Instant::now();

        assert_eq!(election.vote(rep, 1, &a, start), VoteOutcome::Accepted);
        assert_eq!(election.vote(rep, 1, &a, start), VoteOutcome::Replay);
        assert_eq!(election.vote(rep, 1, &b, start), VoteOutcome::Replay);
        assert_eq!(election.last_vote(&rep).unwrap().hash, a.hash());

        let later = start + Duration::from_secs(20);
        assert_eq!(election.vote(rep, 1, &b, later), VoteOutcome::Accepted);
        assert_eq!(election.last_vote(&rep).unwrap().hash, b.hash());
        // lower sequence stays stale even after the cooldown
        assert_eq!(election.vote(rep, 0, &a, later + Duration::from_secs(20)), VoteOutcome::Replay);
    }

    #[test]
    fn test_confirmed_election_ignores_votes() {
        let keys = KeyPair::from_seed([1u8; 32]);
        let (a, b) = forks(&keys);
        let mut election = Election::new(a.clone(), &config(0));
        let rep = Account::from(9u64);
        let now = Instant::now();
        assert_eq!(election.vote(rep, 1, &a, now), VoteOutcome::Accepted);

        election.status = ElectionStatus::Confirmed { winner: a.hash() };
        assert_eq!(election.vote(rep, 2, &b, now), VoteOutcome::Replay);
        assert_eq!(election.vote(Account::from(10u64), 1, &b, now), VoteOutcome::Replay);
        assert_eq!(election.last_vote(&rep).unwrap().hash, a.hash());
        assert_eq!(election.voter_count(), 1);
    }

    #[test]
    fn test_publish_detects_forks() {
        let keys = KeyPair::from_seed([1u8; 32]);
        let (a, b) = forks(&keys);
        let mut election = Election::new(a.clone(), &config(0));
        assert!(!election.publish(a));
        assert!(election.publish(b.clone()));
        assert!(!election.publish(b));
        assert_eq!(election.candidates().count(), 2);

        let unrelated = Block::send(BlockHash::from(7u64), Account::from(2u64), 10, &keys, 0);
        assert!(!election.publish(unrelated));
    }

    #[test]
    fn test_candidate_cap() {
        let keys = KeyPair::from_seed([1u8; 32]);
        let previous = BlockHash::from(1u64);
        let first = Block::send(previous, Account::from(100u64), 10, &keys, 0);
        let mut election = Election::new(
            first,
            &ElectionConfig {
                max_candidates: 3,
                ..Default::default()
            },
        );
        let published = (0..5u64)
            .filter(|n| election.publish(Block::send(previous, Account::from(*n), 10, &keys, 0)))
            .count();
        assert_eq!(published, 2);
        assert_eq!(election.candidates().count(), 3);
    }
}
