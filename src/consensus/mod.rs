// Election and vote handling on top of the ledger
pub mod active;
pub mod block_processor;
pub mod election;
pub mod vote_processor;
pub mod vote_queue;

pub use active::*;
pub use block_processor::*;
pub use election::*;
pub use vote_processor::*;
pub use vote_queue::*;
