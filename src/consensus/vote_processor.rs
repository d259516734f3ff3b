// Vote intake: signature check, election update and quorum check
use std::net::SocketAddr;
use std::sync::Arc;

use libmdbx::TransactionKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blockchain::Vote;
use crate::primitives::Result;
use crate::storage::Txn;
use super::active::ActiveElections;
use super::election::VoteOutcome;

/// Classification of an incoming vote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteCode {
    /// Signature valid and the vote is new, or no election is running for it
    Vote,
    /// Signature valid but the vote is stale or repeated
    Replay,
    /// Signature does not verify
    Invalid,
}

impl std::fmt::Display for VoteCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteCode::Vote => f.write_str("vote"),
            VoteCode::Replay => f.write_str("replay"),
            VoteCode::Invalid => f.write_str("invalid"),
        }
    }
}

pub struct VoteProcessor {
    active: Arc<ActiveElections>,
}

impl VoteProcessor {
    pub fn new(active: Arc<ActiveElections>) -> Self {
        Self { active }
    }

    pub fn active(&self) -> &Arc<ActiveElections> {
        &self.active
    }

    /// Validate and apply one vote. Accepted votes trigger a quorum check on
    /// their election.
    pub fn vote_blocking<K: TransactionKind>(&self, txn: &Txn<'_, K>, vote: &Vote, origin: SocketAddr) -> Result<VoteCode> {
        // Signature check runs before the election lock is taken
        if !vote.validate() {
            debug!(origin = %origin, account = %vote.account, "Vote signature invalid, dropped");
            return Ok(VoteCode::Invalid);
        }

        let code = match self.active.vote(vote) {
            VoteOutcome::Accepted => {
                self.active.confirm_if_quorum(txn, &vote.block.root())?;
                VoteCode::Vote
            }
            VoteOutcome::Replay => VoteCode::Replay,
            VoteOutcome::NoElection => VoteCode::Vote,
        };
        debug!(
            origin = %origin,
            account = %vote.account,
            sequence = vote.sequence,
            block = %vote.block.hash(),
            code = %code,
            "Vote processed"
        );
        Ok(code)
    }
}
