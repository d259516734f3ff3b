// Rollback of applied blocks, unwinding dependent receives first
use tracing::{debug, info};

use crate::blockchain::{AccountInfo, Block, PendingInfo, PendingKey};
use crate::primitives::{seconds_since_epoch, BlockHash, LedgerError, Result};
use crate::storage::WriteTxn;
use super::Ledger;

impl Ledger {
    /// Remove `hash` and every block that depends on it.
    ///
    /// Blocks above `hash` on its account are unwound head first. A send whose
    /// receivable entry was already claimed first unwinds the receiving chain
    /// down to the claiming block. Returns the removed hashes in removal order.
    pub fn rollback(&self, txn: &WriteTxn<'_>, hash: &BlockHash) -> Result<Vec<BlockHash>> {
        if !self.store.block_exists(txn, hash)? {
            return Err(LedgerError::BlockNotFound(*hash));
        }
        let genesis = self.store.genesis_get(txn)?;
        if genesis.as_ref() == Some(hash) {
            return Err(LedgerError::GenesisRollback);
        }

        let mut removed = Vec::new();
        let mut pending = vec![*hash];
        while let Some(target) = pending.last().copied() {
            let Some(sideband) = self.store.block_sideband(txn, &target)? else {
                pending.pop();
                continue;
            };
            let info = self
                .store
                .account_get(txn, &sideband.account)?
                .ok_or(LedgerError::AccountNotFound(sideband.account))?;
            if genesis.as_ref() == Some(&info.head) {
                return Err(LedgerError::GenesisRollback);
            }
            let head_hash = info.head;
            let head = self
                .store
                .block_get(txn, &head_hash)?
                .ok_or(LedgerError::BlockNotFound(head_hash))?;

            if let Some(dependent) = self.unclaimed_dependency(txn, &head, &head_hash)? {
                pending.push(dependent);
                continue;
            }
            self.rollback_head(txn, &head, &head_hash, info)?;
            removed.push(head_hash);
        }

        info!(hash = %hash, removed = removed.len(), "⏪ Rolled back");
        Ok(removed)
    }

    /// Head of the receiving chain that must go before send `hash` can be removed
    fn unclaimed_dependency(&self, txn: &WriteTxn<'_>, head: &Block, hash: &BlockHash) -> Result<Option<BlockHash>> {
        if !self.is_send(txn, head)? {
            return Ok(None);
        }
        let destination = self.block_destination(txn, head)?;
        if self.store.pending_exists(txn, &PendingKey::new(destination, *hash))? {
            return Ok(None);
        }
        let latest = self.latest(txn, &destination)?;
        if latest.is_zero() {
            return Err(LedgerError::InvalidState(format!(
                "send {} was received but {} has no chain",
                hash, destination
            )));
        }
        debug!(send = %hash, receiver = %destination, "Unwinding receiver before send");
        Ok(Some(latest))
    }

    /// Undo the head block of its account
    fn rollback_head(&self, txn: &WriteTxn<'_>, block: &Block, hash: &BlockHash, info: AccountInfo) -> Result<()> {
        let account = self
            .account(txn, hash)?
            .ok_or(LedgerError::BlockNotFound(*hash))?;
        let previous = block.previous();
        let previous_balance = self.balance(txn, &previous)?;
        let is_send = self.is_send(txn, block)?;

        // Restore the weight to the representative in force before this block
        let representative = self.representative_account(txn, &info.rep_block)?;
        self.weight_sub(txn, &representative, info.balance)?;
        let previous_rep_block = if previous.is_zero() {
            None
        } else {
            let rep_block = self.representative(txn, &previous)?;
            let previous_representative = self.representative_account(txn, &rep_block)?;
            self.weight_add(txn, &previous_representative, previous_balance)?;
            Some(rep_block)
        };

        if is_send {
            let destination = self.block_destination(txn, block)?;
            self.store.pending_del(txn, &PendingKey::new(destination, *hash))?;
        } else {
            // Receives are told apart by their source, zero-amount ones included
            let source = self.block_source(txn, block)?;
            if !source.is_zero() {
                let source_sideband = self
                    .store
                    .block_sideband(txn, &source)?
                    .ok_or(LedgerError::BlockNotFound(source))?;
                let pending = PendingInfo {
                    source: source_sideband.account,
                    amount: info.balance.saturating_sub(previous_balance),
                    epoch: source_sideband.epoch,
                };
                self.store.pending_put(txn, &PendingKey::new(account, source), &pending)?;
            }
        }

        match previous_rep_block {
            Some(rep_block) => {
                let previous_epoch = self
                    .store
                    .block_sideband(txn, &previous)?
                    .ok_or(LedgerError::BlockNotFound(previous))?
                    .epoch;
                let restored = AccountInfo {
                    head: previous,
                    rep_block,
                    open_block: info.open_block,
                    balance: previous_balance,
                    modified: seconds_since_epoch(),
                    block_count: info.block_count.saturating_sub(1),
                    epoch: previous_epoch,
                };
                self.change_latest(txn, &account, Some(&info), Some(&restored))?;
                self.store.block_successor_set(txn, &previous, &BlockHash::zero())?;
                let previous_block = self
                    .store
                    .block_get(txn, &previous)?
                    .ok_or(LedgerError::BlockNotFound(previous))?;
                if previous_block.is_legacy() {
                    self.store.frontier_put(txn, &previous, &account)?;
                }
            }
            None => self.change_latest(txn, &account, Some(&info), None)?,
        }

        self.store.frontier_del(txn, hash)?;
        self.store.block_del(txn, hash)?;
        debug!(hash = %hash, account = %account, "Block rolled back");
        Ok(())
    }
}
