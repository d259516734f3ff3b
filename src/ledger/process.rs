// Block validation and application
use libmdbx::TransactionKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blockchain::{AccountInfo, Block, BlockSideband, PendingInfo, PendingKey, StateBlock};
use crate::config::EpochConfig;
use crate::primitives::{
    seconds_since_epoch, validate_message, Account, Amount, BlockHash, Epoch, LedgerError, Result,
};
use crate::storage::{Txn, WriteTxn};
use super::Ledger;

/// Outcome of `Ledger::process`. Every variant other than `Progress` leaves the store untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessResult {
    /// Block applied
    Progress,
    /// Signature does not verify against the signer
    BadSignature,
    /// Block already in the ledger
    Old,
    /// Send declares a balance above the current one
    NegativeSpend,
    /// Another block already occupies this root
    Fork,
    /// Source send is unknown, already received, addressed elsewhere, or from a newer epoch
    Unreceivable,
    /// Previous block unknown
    GapPrevious,
    /// Source block unknown
    GapSource,
    /// Declared balance disagrees with the transferred amount
    BalanceMismatch,
    /// Epoch block changes the representative
    RepresentativeMismatch,
    /// Block type not allowed at this point of the chain
    BlockPosition,
}

impl std::fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProcessResult::Progress => "progress",
            ProcessResult::BadSignature => "bad_signature",
            ProcessResult::Old => "old",
            ProcessResult::NegativeSpend => "negative_spend",
            ProcessResult::Fork => "fork",
            ProcessResult::Unreceivable => "unreceivable",
            ProcessResult::GapPrevious => "gap_previous",
            ProcessResult::GapSource => "gap_source",
            ProcessResult::BalanceMismatch => "balance_mismatch",
            ProcessResult::RepresentativeMismatch => "representative_mismatch",
            ProcessResult::BlockPosition => "block_position",
        };
        f.write_str(name)
    }
}

/// Result of processing one block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReturn {
    pub code: ProcessResult,
    /// Account whose chain was extended
    pub account: Account,
    /// Amount sent or received; zero for representative changes and epoch upgrades
    pub amount: Amount,
    /// Destination of a send
    pub pending_account: Account,
}

impl ProcessReturn {
    fn rejected(code: ProcessResult) -> Self {
        Self {
            code,
            account: Account::zero(),
            amount: 0,
            pending_account: Account::zero(),
        }
    }
}

/// Everything needed to apply a validated block
#[derive(Debug)]
struct Plan {
    account: Account,
    old_info: Option<AccountInfo>,
    balance: Amount,
    /// Representative set by this block; `None` keeps the current one
    representative: Option<Account>,
    epoch: Epoch,
    consume: Option<PendingKey>,
    create: Option<(PendingKey, PendingInfo)>,
    amount: Amount,
    pending_account: Account,
}

enum Verdict {
    Accept(Plan),
    Reject(ProcessResult),
}

/// Reject with `$code` unless `$cond` holds
macro_rules! require {
    ($cond:expr, $code:expr) => {
        if !$cond {
            return Ok(Verdict::Reject($code));
        }
    };
}

impl Ledger {
    /// Validate `block` against the current ledger and apply it on success
    pub fn process(&self, txn: &WriteTxn<'_>, block: &Block) -> Result<ProcessReturn> {
        let hash = block.hash();
        match self.validate(txn, block, &hash, true)? {
            Verdict::Reject(code) => {
                debug!(hash = %hash, block_type = %block.block_type(), code = %code, "Block rejected");
                Ok(ProcessReturn::rejected(code))
            }
            Verdict::Accept(plan) => {
                let result = ProcessReturn {
                    code: ProcessResult::Progress,
                    account: plan.account,
                    amount: plan.amount,
                    pending_account: plan.pending_account,
                };
                self.apply(txn, block, &hash, plan)?;
                debug!(hash = %hash, account = %result.account, amount = result.amount, "Block processed");
                Ok(result)
            }
        }
    }

    /// True when every ordering and dependency rule for `block` is currently met.
    /// Signatures are not checked and nothing is written.
    pub fn could_fit<K: TransactionKind>(&self, txn: &Txn<'_, K>, block: &Block) -> Result<bool> {
        let hash = block.hash();
        Ok(matches!(self.validate(txn, block, &hash, false)?, Verdict::Accept(_)))
    }

    fn validate<K: TransactionKind>(
        &self,
        txn: &Txn<'_, K>,
        block: &Block,
        hash: &BlockHash,
        check_signature: bool,
    ) -> Result<Verdict> {
        let signed_by = |account: &Account| {
            !check_signature || validate_message(account, hash.as_bytes(), block.signature())
        };

        match block {
            Block::Open(b) => {
                require!(signed_by(&b.account), ProcessResult::BadSignature);
                require!(!self.store.block_exists(txn, hash)?, ProcessResult::Old);
                require!(self.store.block_exists(txn, &b.source)?, ProcessResult::GapSource);
                require!(!self.store.account_exists(txn, &b.account)?, ProcessResult::Fork);
                let key = PendingKey::new(b.account, b.source);
                let Some(pending) = self.store.pending_get(txn, &key)? else {
                    return Ok(Verdict::Reject(ProcessResult::Unreceivable));
                };
                require!(pending.epoch == Epoch::LEGACY, ProcessResult::Unreceivable);
                Ok(Verdict::Accept(Plan {
                    account: b.account,
                    old_info: None,
                    balance: pending.amount,
                    representative: Some(b.representative),
                    epoch: Epoch::LEGACY,
                    consume: Some(key),
                    create: None,
                    amount: pending.amount,
                    pending_account: Account::zero(),
                }))
            }
            Block::Send(_) | Block::Receive(_) | Block::Change(_) => {
                let previous = block.previous();
                let Some(prev) = self.store.block_get_stored(txn, &previous)? else {
                    return Ok(Verdict::Reject(ProcessResult::GapPrevious));
                };
                let account = prev.sideband.account;
                require!(signed_by(&account), ProcessResult::BadSignature);
                require!(!self.store.block_exists(txn, hash)?, ProcessResult::Old);
                require!(prev.block.is_legacy(), ProcessResult::BlockPosition);
                let info = self
                    .store
                    .account_get(txn, &account)?
                    .ok_or(LedgerError::AccountNotFound(account))?;
                // Frontiers only track legacy heads
                require!(self.store.frontier_get(txn, &info.head)?.is_some(), ProcessResult::BlockPosition);
                require!(self.store.frontier_get(txn, &previous)? == Some(account), ProcessResult::Fork);
                self.validate_legacy(txn, block, hash, account, info)
            }
            Block::State(b) => {
                let epoch = self.config.epoch_for_link(&b.link);
                let previous_balance = if b.previous.is_zero() {
                    Some(0)
                } else {
                    self.store.block_sideband(txn, &b.previous)?.map(|sideband| sideband.balance)
                };
                match (epoch, previous_balance) {
                    // Cannot tell an epoch upgrade from a send to the link account yet
                    (Some(_), None) => Ok(Verdict::Reject(ProcessResult::GapPrevious)),
                    (Some(epoch), Some(balance)) if balance == b.balance => {
                        require!(signed_by(&epoch.signer), ProcessResult::BadSignature);
                        self.validate_epoch(txn, b, hash, epoch)
                    }
                    _ => {
                        require!(signed_by(&b.account), ProcessResult::BadSignature);
                        self.validate_state(txn, b, hash, previous_balance.is_some())
                    }
                }
            }
        }
    }

    fn validate_legacy<K: TransactionKind>(
        &self,
        txn: &Txn<'_, K>,
        block: &Block,
        hash: &BlockHash,
        account: Account,
        info: AccountInfo,
    ) -> Result<Verdict> {
        let plan = match block {
            Block::Send(b) => {
                require!(b.balance <= info.balance, ProcessResult::NegativeSpend);
                let amount = info.balance - b.balance;
                let pending = PendingInfo {
                    source: account,
                    amount,
                    epoch: info.epoch,
                };
                Plan {
                    account,
                    balance: b.balance,
                    representative: None,
                    epoch: info.epoch,
                    consume: None,
                    create: Some((PendingKey::new(b.destination, *hash), pending)),
                    amount,
                    pending_account: b.destination,
                    old_info: Some(info),
                }
            }
            Block::Receive(b) => {
                require!(self.store.block_exists(txn, &b.source)?, ProcessResult::GapSource);
                let key = PendingKey::new(account, b.source);
                let Some(pending) = self.store.pending_get(txn, &key)? else {
                    return Ok(Verdict::Reject(ProcessResult::Unreceivable));
                };
                require!(pending.epoch == Epoch::LEGACY, ProcessResult::Unreceivable);
                let balance = info
                    .balance
                    .checked_add(pending.amount)
                    .ok_or_else(|| LedgerError::InvalidState(format!("balance overflow for {}", account)))?;
                Plan {
                    account,
                    balance,
                    representative: None,
                    epoch: info.epoch,
                    consume: Some(key),
                    create: None,
                    amount: pending.amount,
                    pending_account: Account::zero(),
                    old_info: Some(info),
                }
            }
            Block::Change(b) => Plan {
                account,
                balance: info.balance,
                representative: Some(b.representative),
                epoch: info.epoch,
                consume: None,
                create: None,
                amount: 0,
                pending_account: Account::zero(),
                old_info: Some(info),
            },
            Block::Open(_) | Block::State(_) => {
                return Err(LedgerError::InvalidState("not a chained legacy block".into()));
            }
        };
        Ok(Verdict::Accept(plan))
    }

    fn validate_state<K: TransactionKind>(
        &self,
        txn: &Txn<'_, K>,
        block: &StateBlock,
        hash: &BlockHash,
        previous_known: bool,
    ) -> Result<Verdict> {
        require!(!self.store.block_exists(txn, hash)?, ProcessResult::Old);

        let old_info = self.store.account_get(txn, &block.account)?;
        let (is_send, amount, mut epoch) = match &old_info {
            Some(info) => {
                require!(!block.previous.is_zero(), ProcessResult::Fork);
                require!(previous_known, ProcessResult::GapPrevious);
                require!(block.previous == info.head, ProcessResult::Fork);
                let is_send = block.balance < info.balance;
                (is_send, block.balance.abs_diff(info.balance), info.epoch)
            }
            None => {
                require!(block.previous.is_zero(), ProcessResult::GapPrevious);
                require!(!block.link.is_zero(), ProcessResult::GapSource);
                (false, block.balance, Epoch::LEGACY)
            }
        };

        let mut consume = None;
        let mut create = None;
        let mut pending_account = Account::zero();
        if is_send {
            pending_account = block.link.as_account();
            let pending = PendingInfo {
                source: block.account,
                amount,
                epoch,
            };
            create = Some((PendingKey::new(pending_account, *hash), pending));
        } else if !block.link.is_zero() {
            let source = block.link.as_block_hash();
            require!(self.store.block_exists(txn, &source)?, ProcessResult::GapSource);
            let key = PendingKey::new(block.account, source);
            let Some(pending) = self.store.pending_get(txn, &key)? else {
                return Ok(Verdict::Reject(ProcessResult::Unreceivable));
            };
            require!(amount == pending.amount, ProcessResult::BalanceMismatch);
            epoch = epoch.max(pending.epoch);
            consume = Some(key);
        } else {
            // Without a link only the representative may change
            require!(amount == 0, ProcessResult::BalanceMismatch);
        }

        Ok(Verdict::Accept(Plan {
            account: block.account,
            old_info,
            balance: block.balance,
            representative: Some(block.representative),
            epoch,
            consume,
            create,
            amount,
            pending_account,
        }))
    }

    fn validate_epoch<K: TransactionKind>(
        &self,
        txn: &Txn<'_, K>,
        block: &StateBlock,
        hash: &BlockHash,
        upgrade: &EpochConfig,
    ) -> Result<Verdict> {
        require!(!self.store.block_exists(txn, hash)?, ProcessResult::Old);

        let old_info = self.store.account_get(txn, &block.account)?;
        match &old_info {
            Some(info) => {
                require!(!block.previous.is_zero(), ProcessResult::Fork);
                require!(block.previous == info.head, ProcessResult::Fork);
                let representative = self.representative_account(txn, &info.rep_block)?;
                require!(block.representative == representative, ProcessResult::RepresentativeMismatch);
            }
            None => {
                require!(block.previous.is_zero(), ProcessResult::GapPrevious);
                require!(block.representative.is_zero(), ProcessResult::RepresentativeMismatch);
            }
        }

        let current = old_info.as_ref().map(|info| info.epoch).unwrap_or(Epoch::LEGACY);
        require!(current.next() == Some(upgrade.epoch), ProcessResult::BlockPosition);
        let balance = old_info.as_ref().map(|info| info.balance).unwrap_or(0);
        require!(block.balance == balance, ProcessResult::BalanceMismatch);

        Ok(Verdict::Accept(Plan {
            account: block.account,
            old_info,
            balance,
            representative: Some(block.representative),
            epoch: upgrade.epoch,
            consume: None,
            create: None,
            amount: 0,
            pending_account: Account::zero(),
        }))
    }

    fn apply(&self, txn: &WriteTxn<'_>, block: &Block, hash: &BlockHash, plan: Plan) -> Result<()> {
        let height = plan.old_info.as_ref().map_or(0, |info| info.block_count) + 1;
        let sideband = BlockSideband {
            account: plan.account,
            height,
            balance: plan.balance,
            successor: BlockHash::zero(),
            epoch: plan.epoch,
        };
        self.store.block_put(txn, hash, block, &sideband)?;
        let previous = block.previous();
        if !previous.is_zero() {
            self.store.block_successor_set(txn, &previous, hash)?;
        }

        // Move the whole balance from the old representative to the new one
        let old_representative = match &plan.old_info {
            Some(info) => {
                let representative = self.representative_account(txn, &info.rep_block)?;
                self.weight_sub(txn, &representative, info.balance)?;
                Some(representative)
            }
            None => None,
        };
        let representative = plan
            .representative
            .or(old_representative)
            .ok_or_else(|| LedgerError::InvalidState(format!("no representative for {}", plan.account)))?;
        self.weight_add(txn, &representative, plan.balance)?;

        if let Some(key) = &plan.consume {
            self.store.pending_del(txn, key)?;
        }
        if let Some((key, info)) = &plan.create {
            self.store.pending_put(txn, key, info)?;
        }

        let info = AccountInfo {
            head: *hash,
            rep_block: match (&plan.representative, &plan.old_info) {
                (None, Some(old)) => old.rep_block,
                _ => *hash,
            },
            open_block: plan.old_info.as_ref().map_or(*hash, |old| old.open_block),
            balance: plan.balance,
            modified: seconds_since_epoch(),
            block_count: height,
            epoch: plan.epoch,
        };
        self.change_latest(txn, &plan.account, plan.old_info.as_ref(), Some(&info))?;

        if let Some(old) = &plan.old_info {
            self.store.frontier_del(txn, &old.head)?;
        }
        if block.is_legacy() {
            self.store.frontier_put(txn, hash, &plan.account)?;
        }
        Ok(())
    }
}
