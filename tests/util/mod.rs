// Shared fixtures for ledger integration tests
#![allow(dead_code)]

use std::sync::Arc;

use lattice_ledger::{
    Account, Amount, Block, BlockHash, DatabaseConfig, Genesis, KeyPair, Ledger, LedgerConfig, Store,
};
use tempfile::TempDir;

pub const SUPPLY: Amount = u128::MAX;

/// Ledger over a throwaway database, initialized with a genesis account holding `SUPPLY`
pub struct TestLedger {
    pub ledger: Arc<Ledger>,
    pub genesis: Genesis,
    pub genesis_key: KeyPair,
    _dir: TempDir,
}

impl TestLedger {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Self::with_supply(config, SUPPLY)
    }

    pub fn with_supply(config: LedgerConfig, supply: Amount) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = Store::open(dir.path(), DatabaseConfig::for_tests()).expect("open store");
        let ledger = Arc::new(Ledger::new(store, config));
        let genesis_key = genesis_key();
        let genesis = Genesis::new(&genesis_key, supply);
        let txn = ledger.store().tx_begin_write().expect("write txn");
        ledger.initialize(&txn, &genesis).expect("initialize");
        txn.commit().expect("commit");
        Self {
            ledger,
            genesis,
            genesis_key,
            _dir: dir,
        }
    }

    pub fn genesis_account(&self) -> Account {
        self.genesis_key.account()
    }

    pub fn genesis_hash(&self) -> BlockHash {
        self.genesis.hash()
    }
}

pub fn genesis_key() -> KeyPair {
    KeyPair::from_seed([0x11; 32])
}

/// Deterministic key for test account `n`
pub fn key(n: u8) -> KeyPair {
    KeyPair::from_seed([n; 32])
}

pub fn send(previous: BlockHash, destination: Account, balance: Amount, keys: &KeyPair) -> Block {
    Block::send(previous, destination, balance, keys, 0)
}

pub fn state(
    keys: &KeyPair,
    previous: BlockHash,
    representative: Account,
    balance: Amount,
    link: impl Into<lattice_ledger::Link>,
) -> Block {
    Block::state(keys.account(), previous, representative, balance, link.into(), keys, 0)
}
