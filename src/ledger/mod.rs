// Block-lattice ledger: block processing, rollback and read-only queries
// All operations run inside a caller-supplied store transaction.

pub mod checksum;
pub mod process;
pub mod rollback;

use std::sync::atomic::{AtomicBool, Ordering};

use libmdbx::TransactionKind;
use tracing::info;

use crate::blockchain::{AccountInfo, Block, BlockSideband, Genesis};
use crate::config::LedgerConfig;
use crate::primitives::{
    seconds_since_epoch, Account, Amount, BlockHash, Epoch, LedgerError, Result, Root,
};
use crate::storage::{Store, Txn, WriteTxn};

pub use process::{ProcessResult, ProcessReturn};

/// The ledger state machine over a `Store`
pub struct Ledger {
    store: Store,
    config: LedgerConfig,
    /// Cleared once the block count reaches the bootstrap threshold; never set again
    check_bootstrap_weights: AtomicBool,
}

impl Ledger {
    pub fn new(store: Store, config: LedgerConfig) -> Self {
        let check_bootstrap_weights = AtomicBool::new(config.bootstrap_weight_max_blocks > 0);
        Self {
            store,
            config,
            check_bootstrap_weights,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Write the genesis open block, crediting the whole supply to the genesis account.
    /// Re-initializing with the same genesis is a no-op.
    pub fn initialize(&self, txn: &WriteTxn<'_>, genesis: &Genesis) -> Result<()> {
        let hash = genesis.hash();
        if let Some(existing) = self.store.genesis_get(txn)? {
            if existing == hash {
                return Ok(());
            }
            return Err(LedgerError::InvalidState(format!(
                "ledger already initialized with genesis {}",
                existing
            )));
        }

        let account = genesis.account();
        let sideband = BlockSideband {
            account,
            height: 1,
            balance: genesis.amount,
            successor: BlockHash::zero(),
            epoch: Epoch::LEGACY,
        };
        self.store.block_put(txn, &hash, &genesis.open, &sideband)?;

        let info = AccountInfo {
            head: hash,
            rep_block: hash,
            open_block: hash,
            balance: genesis.amount,
            modified: seconds_since_epoch(),
            block_count: 1,
            epoch: Epoch::LEGACY,
        };
        self.change_latest(txn, &account, None, Some(&info))?;
        self.store.representation_put(txn, &account, genesis.amount)?;
        self.store.frontier_put(txn, &hash, &account)?;
        self.store.genesis_put(txn, &hash, genesis.amount)?;

        info!(account = %account, hash = %hash, "🌱 Ledger initialized with genesis");
        Ok(())
    }

    /// Hash of the genesis open block
    pub fn genesis_hash<K: TransactionKind>(&self, txn: &Txn<'_, K>) -> Result<BlockHash> {
        self.store.genesis_get(txn)?.ok_or(LedgerError::NotInitialized)
    }

    /// Total supply issued at genesis
    pub fn supply<K: TransactionKind>(&self, txn: &Txn<'_, K>) -> Result<Amount> {
        self.store.supply_get(txn)
    }

    pub fn block_exists<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<bool> {
        self.store.block_exists(txn, hash)
    }

    pub fn get_block<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<Option<Block>> {
        self.store.block_get(txn, hash)
    }

    pub fn block_count<K: TransactionKind>(&self, txn: &Txn<'_, K>) -> Result<u64> {
        self.store.block_count(txn)
    }

    pub fn account_info<K: TransactionKind>(&self, txn: &Txn<'_, K>, account: &Account) -> Result<Option<AccountInfo>> {
        self.store.account_get(txn, account)
    }

    /// Confirmed balance of an account, zero if unopened
    pub fn account_balance<K: TransactionKind>(&self, txn: &Txn<'_, K>, account: &Account) -> Result<Amount> {
        Ok(self
            .store
            .account_get(txn, account)?
            .map(|info| info.balance)
            .unwrap_or(0))
    }

    /// Sum of receivable entries addressed to an account
    pub fn account_pending<K: TransactionKind>(&self, txn: &Txn<'_, K>, account: &Account) -> Result<Amount> {
        Ok(self
            .store
            .pending_for_account(txn, account)?
            .iter()
            .fold(0, |total: Amount, (_, info)| total.saturating_add(info.amount)))
    }

    /// Voting weight delegated to `account`.
    ///
    /// While the ledger holds fewer blocks than the configured threshold, accounts
    /// listed in the bootstrap map report the configured weight instead.
    pub fn weight<K: TransactionKind>(&self, txn: &Txn<'_, K>, account: &Account) -> Result<Amount> {
        if self.check_bootstrap_weights.load(Ordering::Acquire) {
            if self.store.block_count(txn)? < self.config.bootstrap_weight_max_blocks {
                if let Some(weight) = self.config.bootstrap_weights.get(account) {
                    return Ok(*weight);
                }
            } else {
                self.check_bootstrap_weights.store(false, Ordering::Release);
            }
        }
        self.store.representation_get(txn, account)
    }

    /// Account balance after the block `hash`, zero for the zero hash
    pub fn balance<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<Amount> {
        if hash.is_zero() {
            return Ok(0);
        }
        Ok(self.sideband(txn, hash)?.balance)
    }

    /// Amount moved by the block: sent, received, or zero for representative changes
    pub fn amount<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<Amount> {
        let row = self
            .store
            .block_get_stored(txn, hash)?
            .ok_or(LedgerError::BlockNotFound(*hash))?;
        let previous_balance = self.balance(txn, &row.block.previous())?;
        Ok(row.sideband.balance.abs_diff(previous_balance))
    }

    /// Account owning the block
    pub fn account<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<Option<Account>> {
        Ok(self.store.block_sideband(txn, hash)?.map(|sideband| sideband.account))
    }

    /// Head block of an account, zero if unopened
    pub fn latest<K: TransactionKind>(&self, txn: &Txn<'_, K>, account: &Account) -> Result<BlockHash> {
        Ok(self
            .store
            .account_get(txn, account)?
            .map(|info| info.head)
            .unwrap_or_default())
    }

    /// Root the next block on this account will compete for
    pub fn latest_root<K: TransactionKind>(&self, txn: &Txn<'_, K>, account: &Account) -> Result<Root> {
        Ok(match self.store.account_get(txn, account)? {
            Some(info) => Root::from(info.head),
            None => Root::from(*account),
        })
    }

    /// Hash of the block that set the representative in force at `hash`
    pub fn representative<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<BlockHash> {
        let mut current = *hash;
        loop {
            let block = self
                .store
                .block_get(txn, &current)?
                .ok_or(LedgerError::BlockNotFound(current))?;
            if block.representative().is_some() {
                return Ok(current);
            }
            current = block.previous();
        }
    }

    /// Block occupying the position after `root`: the open block when `root`
    /// names an opened account, otherwise the successor of the block `root`
    pub fn successor<K: TransactionKind>(&self, txn: &Txn<'_, K>, root: &Root) -> Result<Option<Block>> {
        if root.is_zero() {
            return Ok(None);
        }
        let successor = match self.store.account_get(txn, &root.as_account())? {
            Some(info) => info.open_block,
            None => self.store.block_successor(txn, &root.as_block_hash())?,
        };
        if successor.is_zero() {
            return Ok(None);
        }
        self.store.block_get(txn, &successor)
    }

    /// Block already in the ledger that competes with `block` for its root
    pub fn forked_block<K: TransactionKind>(&self, txn: &Txn<'_, K>, block: &Block) -> Result<Option<Block>> {
        let previous = block.previous();
        let existing = if previous.is_zero() {
            match block.account_field() {
                Some(account) => self.store.account_get(txn, &account)?.map(|info| info.open_block),
                None => None,
            }
        } else {
            Some(self.store.block_successor(txn, &previous)?)
        };
        match existing {
            Some(hash) if !hash.is_zero() && hash != block.hash() => self.store.block_get(txn, &hash),
            _ => Ok(None),
        }
    }

    /// Whether `block` lowers its account's balance
    pub fn is_send<K: TransactionKind>(&self, txn: &Txn<'_, K>, block: &Block) -> Result<bool> {
        match block {
            Block::Send(_) => Ok(true),
            Block::State(b) => {
                if b.previous.is_zero() {
                    Ok(false)
                } else {
                    Ok(b.balance < self.balance(txn, &b.previous)?)
                }
            }
            _ => Ok(false),
        }
    }

    /// Receiving account of a send, zero for other blocks
    pub fn block_destination<K: TransactionKind>(&self, txn: &Txn<'_, K>, block: &Block) -> Result<Account> {
        match block {
            Block::Send(b) => Ok(b.destination),
            Block::State(b) if self.is_send(txn, block)? => Ok(b.link.as_account()),
            _ => Ok(Account::zero()),
        }
    }

    /// Send consumed by a receive, zero for other blocks
    pub fn block_source<K: TransactionKind>(&self, txn: &Txn<'_, K>, block: &Block) -> Result<BlockHash> {
        match block {
            Block::Receive(b) => Ok(b.source),
            Block::Open(b) => Ok(b.source),
            Block::State(b) if self.config.is_epoch_link(&b.link) => Ok(BlockHash::zero()),
            Block::State(b) if !self.is_send(txn, block)? => Ok(b.link.as_block_hash()),
            _ => Ok(BlockHash::zero()),
        }
    }

    fn sideband<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<BlockSideband> {
        self.store
            .block_sideband(txn, hash)?
            .ok_or(LedgerError::BlockNotFound(*hash))
    }

    /// Representative account named by a representative-setting block
    fn representative_account<K: TransactionKind>(&self, txn: &Txn<'_, K>, rep_block: &BlockHash) -> Result<Account> {
        self.store
            .block_get(txn, rep_block)?
            .and_then(|block| block.representative())
            .ok_or_else(|| LedgerError::InvalidState(format!("{} does not set a representative", rep_block)))
    }

    fn weight_add(&self, txn: &WriteTxn<'_>, representative: &Account, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let current = self.store.representation_get(txn, representative)?;
        let updated = current
            .checked_add(amount)
            .ok_or_else(|| LedgerError::InvalidState(format!("weight overflow for {}", representative)))?;
        self.store.representation_put(txn, representative, updated)
    }

    fn weight_sub(&self, txn: &WriteTxn<'_>, representative: &Account, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let current = self.store.representation_get(txn, representative)?;
        let updated = current
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InvalidState(format!("weight underflow for {}", representative)))?;
        self.store.representation_put(txn, representative, updated)
    }

    /// Replace an account row, keeping the checksum cache in step with its head
    fn change_latest(
        &self,
        txn: &WriteTxn<'_>,
        account: &Account,
        old: Option<&AccountInfo>,
        new: Option<&AccountInfo>,
    ) -> Result<()> {
        if let Some(old) = old {
            self.checksum_update(txn, account, &old.head)?;
        }
        match new {
            Some(info) => {
                self.checksum_update(txn, account, &info.head)?;
                self.store.account_put(txn, account, info)
            }
            None => self.store.account_del(txn, account),
        }
    }
}
