// Block-lattice ledger library
// Per-account chains, receivable tracking, representative weights and elections

pub mod primitives;
pub mod blockchain;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod ledger;
pub mod storage;

// Re-export key types for easy access
pub use primitives::{
    Account, Amount, BlockHash, Epoch, Height, LedgerError, Link, Result, Root, Signature,
};

pub use blockchain::{AccountInfo, Block, BlockSideband, BlockType, Genesis, PendingInfo, PendingKey, Vote};

pub use config::{ElectionConfig, EpochConfig, LedgerConfig, NodeConfig};

pub use consensus::{ActiveElections, BlockProcessor, VoteCode, VoteProcessor, VoteQueue};

pub use crypto::KeyPair;

pub use ledger::{Ledger, ProcessResult, ProcessReturn};

pub use storage::{DatabaseConfig, Store};
