// Block lattice data model
// Blocks, per-account chain rows, genesis and vote messages

pub mod block;
pub mod chain;
pub mod genesis;
pub mod vote;

pub use block::{
    work_value, Block, BlockType, ChangeBlock, OpenBlock, ReceiveBlock, SendBlock, StateBlock,
};
pub use chain::{AccountInfo, BlockSideband, PendingInfo, PendingKey};
pub use genesis::Genesis;
pub use vote::Vote;
