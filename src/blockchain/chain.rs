// Per-account chain state and receivable entries as stored by the ledger
use serde::{Deserialize, Serialize};

use crate::primitives::{Account, Amount, BlockHash, Epoch, Height, Timestamp};

/// State of an opened account chain
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Latest block on the chain
    pub head: BlockHash,
    /// Block that set the representative currently in force
    pub rep_block: BlockHash,
    /// First block of the chain
    pub open_block: BlockHash,
    pub balance: Amount,
    /// Unix seconds of the last modification
    pub modified: Timestamp,
    pub block_count: u64,
    pub epoch: Epoch,
}

/// Key of a receivable entry: the destination account and the send that created it.
/// Encoded destination-first so a cursor can walk all entries of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PendingKey {
    pub destination: Account,
    pub send_hash: BlockHash,
}

impl PendingKey {
    pub fn new(destination: Account, send_hash: BlockHash) -> Self {
        Self { destination, send_hash }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(self.destination.as_bytes());
        bytes[32..].copy_from_slice(self.send_hash.as_bytes());
        bytes
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 64 {
            return None;
        }
        let mut destination = [0u8; 32];
        let mut send_hash = [0u8; 32];
        destination.copy_from_slice(&bytes[..32]);
        send_hash.copy_from_slice(&bytes[32..]);
        Some(Self::new(Account(destination), BlockHash(send_hash)))
    }
}

/// Unclaimed credit created by a send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInfo {
    /// Account that sent the funds
    pub source: Account,
    pub amount: Amount,
    /// Epoch of the sending account when the send was applied
    pub epoch: Epoch,
}

/// Data derived while applying a block, stored alongside it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSideband {
    pub account: Account,
    pub height: Height,
    /// Account balance after this block
    pub balance: Amount,
    /// Next block on the chain, zero while this block is the head
    pub successor: BlockHash,
    /// Account epoch after this block
    pub epoch: Epoch,
}
