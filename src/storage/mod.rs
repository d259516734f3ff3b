// Storage layer: transactional MDBX tables behind the ledger
pub mod mdbx_store;

pub use mdbx_store::*;
