// Representative vote messages
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::KeyPair;
use crate::primitives::{validate_message, Account, BlockHash, Signature};
use super::block::Block;

const VOTE_PREFIX: &[u8] = b"vote ";

/// Signed statement by a representative that `block` should win its root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub account: Account,
    /// Monotonic per representative; later votes supersede earlier ones
    pub sequence: u64,
    pub signature: Signature,
    pub block: Block,
}

impl Vote {
    /// Create a vote signed by `keys`
    pub fn new(keys: &KeyPair, sequence: u64, block: Block) -> Self {
        let mut vote = Self {
            account: keys.account(),
            sequence,
            signature: Signature::zero(),
            block,
        };
        vote.signature = keys.sign(vote.hash().as_bytes());
        vote
    }

    /// Digest signed by the representative: block hash and sequence
    pub fn hash(&self) -> BlockHash {
        let mut hasher = Sha256::new();
        hasher.update(VOTE_PREFIX);
        hasher.update(self.block.hash().as_bytes());
        hasher.update(self.sequence.to_le_bytes());
        BlockHash(hasher.finalize().into())
    }

    /// True when the signature verifies against the voting account
    pub fn validate(&self) -> bool {
        validate_message(&self.account, self.hash().as_bytes(), &self.signature)
    }
}
