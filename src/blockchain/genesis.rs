// Genesis open block that seeds a ledger with the full supply
use crate::crypto::KeyPair;
use crate::primitives::{Account, Amount, BlockHash};
use super::block::Block;

/// Genesis account and its self-sourced open block
#[derive(Debug, Clone)]
pub struct Genesis {
    pub open: Block,
    pub amount: Amount,
}

impl Genesis {
    /// The genesis open block names its own account as source and representative
    pub fn new(keys: &KeyPair, amount: Amount) -> Self {
        let account = keys.account();
        let open = Block::open(BlockHash(account.0), account, keys, 0);
        Self { open, amount }
    }

    pub fn account(&self) -> Account {
        self.open.account_field().unwrap_or_default()
    }

    pub fn hash(&self) -> BlockHash {
        self.open.hash()
    }
}
