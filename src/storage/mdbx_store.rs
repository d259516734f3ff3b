// MDBX storage for the ledger tables
// Every accessor is transaction-scoped: reads are generic over read-only and
// read-write transactions, writes require a read-write transaction.
use std::{ops::Range, path::Path, sync::Arc};

use libmdbx::{NoWriteMap, TableFlags, Transaction, TransactionKind, WriteFlags, RO, RW};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use crate::blockchain::{AccountInfo, Block, BlockSideband, PendingInfo, PendingKey};
use crate::primitives::{Account, Amount, BlockHash, LedgerError, Result};

const MEGABYTE: usize = 1024 * 1024;
const GIGABYTE: usize = MEGABYTE * 1024;

pub const ACCOUNTS_TABLE: &str = "accounts";
pub const BLOCKS_TABLE: &str = "blocks";
pub const PENDING_TABLE: &str = "pending";
pub const REPRESENTATION_TABLE: &str = "representation";
pub const FRONTIERS_TABLE: &str = "frontiers";
pub const CHECKSUM_TABLE: &str = "checksum";
pub const META_TABLE: &str = "meta";

const TABLES: [&str; 7] = [
    ACCOUNTS_TABLE,
    BLOCKS_TABLE,
    PENDING_TABLE,
    REPRESENTATION_TABLE,
    FRONTIERS_TABLE,
    CHECKSUM_TABLE,
    META_TABLE,
];

const META_BLOCK_COUNT: &[u8] = b"block_count";
const META_GENESIS: &[u8] = b"genesis";
const META_SUPPLY: &[u8] = b"supply";

/// Transaction over the ledger database
pub type Txn<'db, K> = Transaction<'db, K, NoWriteMap>;
/// Snapshot read transaction
pub type ReadTxn<'db> = Txn<'db, RO>;
/// Exclusive write transaction
pub type WriteTxn<'db> = Txn<'db, RW>;

/// Database config options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_tables: Option<u64>,
    pub max_readers: Option<u32>,
    pub no_rdahead: bool,
    pub size: Option<Range<isize>>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            max_tables: Some(20),
            max_readers: None,
            no_rdahead: true,
            // Default max database size: 64GB
            size: Some(0..(64 * GIGABYTE as isize)),
        }
    }
}

impl DatabaseConfig {
    /// Small map size for tests and throwaway ledgers
    pub fn for_tests() -> Self {
        DatabaseConfig {
            size: Some(0..(256 * MEGABYTE as isize)),
            ..Default::default()
        }
    }
}

impl From<DatabaseConfig> for libmdbx::DatabaseOptions {
    fn from(value: DatabaseConfig) -> Self {
        libmdbx::DatabaseOptions {
            max_tables: value.max_tables,
            max_readers: value.max_readers,
            no_rdahead: value.no_rdahead,
            mode: libmdbx::Mode::ReadWrite(libmdbx::ReadWriteOptions {
                sync_mode: libmdbx::SyncMode::Durable,
                min_size: value.size.as_ref().map(|r| r.start),
                max_size: value.size.map(|r| r.end),
                ..Default::default()
            }),
            liforeclaim: true,
            ..Default::default()
        }
    }
}

/// Block row: the signed block plus ledger-derived sideband
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredBlock {
    pub block: Block,
    pub sideband: BlockSideband,
}

/// Row counts per table
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseStats {
    pub accounts: u64,
    pub blocks: u64,
    pub pending: u64,
    pub representatives: u64,
    pub frontiers: u64,
}

/// Ledger database handle. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    db: Arc<libmdbx::Database<NoWriteMap>>,
}

impl Store {
    /// Open or create the database under `path`.
    ///
    /// Failure here is the only initialization signal: callers must not build
    /// a ledger over a store that failed to open.
    pub fn open<P: AsRef<Path>>(path: P, config: DatabaseConfig) -> Result<Self> {
        std::fs::create_dir_all(path.as_ref())
            .map_err(|e| LedgerError::Storage(format!("Failed to create directory: {}", e)))?;

        let db = libmdbx::Database::open_with_options(path.as_ref(), libmdbx::DatabaseOptions::from(config))
            .map_err(|e| LedgerError::Storage(format!("MDBX open failed: {}", e)))?;

        let store = Self { db: Arc::new(db) };
        store.create_tables()?;

        info!(path = %path.as_ref().display(), "📂 Ledger store opened");
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        let txn = self.tx_begin_write()?;
        for name in TABLES {
            txn.create_table(Some(name), TableFlags::empty())
                .map_err(|e| LedgerError::Storage(format!("Create {} table failed: {}", name, e)))?;
        }
        txn.commit()
            .map_err(|e| LedgerError::Storage(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    /// Begin a snapshot read transaction
    pub fn tx_begin_read(&self) -> Result<ReadTxn<'_>> {
        self.db
            .begin_ro_txn()
            .map_err(|e| LedgerError::Storage(format!("Read transaction failed: {}", e)))
    }

    /// Begin the single write transaction. Blocks while another writer is active.
    pub fn tx_begin_write(&self) -> Result<WriteTxn<'_>> {
        self.db
            .begin_rw_txn()
            .map_err(|e| LedgerError::Storage(format!("Write transaction failed: {}", e)))
    }

    fn get_raw<K: TransactionKind>(txn: &Txn<'_, K>, table_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let table = txn.open_table(Some(table_name))?;
        txn.get::<Vec<u8>>(&table, key)
            .map_err(|e| LedgerError::Storage(format!("MDBX get from {} failed: {}", table_name, e)))
    }

    fn get_row<K: TransactionKind, T: DeserializeOwned>(
        txn: &Txn<'_, K>,
        table_name: &str,
        key: &[u8],
    ) -> Result<Option<T>> {
        match Self::get_raw(txn, table_name, key)? {
            Some(data) => Ok(Some(bincode::deserialize(&data)?)),
            None => Ok(None),
        }
    }

    fn put_raw(txn: &WriteTxn<'_>, table_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let table = txn.open_table(Some(table_name))?;
        txn.put(&table, key, value, WriteFlags::empty())
            .map_err(|e| LedgerError::Storage(format!("MDBX put into {} failed: {}", table_name, e)))
    }

    fn put_row<T: Serialize>(txn: &WriteTxn<'_>, table_name: &str, key: &[u8], value: &T) -> Result<()> {
        let data = bincode::serialize(value)?;
        Self::put_raw(txn, table_name, key, &data)
    }

    fn del_raw(txn: &WriteTxn<'_>, table_name: &str, key: &[u8]) -> Result<bool> {
        let table = txn.open_table(Some(table_name))?;
        txn.del(&table, key, None)
            .map_err(|e| LedgerError::Storage(format!("MDBX delete from {} failed: {}", table_name, e)))
    }

    /// Visit rows of `table_name` in key order starting at `start` until `visit` returns false
    fn walk<K, F>(txn: &Txn<'_, K>, table_name: &str, start: &[u8], mut visit: F) -> Result<()>
    where
        K: TransactionKind,
        F: FnMut(&[u8], &[u8]) -> Result<bool>,
    {
        let table = txn.open_table(Some(table_name))?;
        let mut cursor = txn.cursor(&table)?;
        let iter = if start.is_empty() {
            cursor.iter_start::<Vec<u8>, Vec<u8>>()
        } else {
            cursor.iter_from::<Vec<u8>, Vec<u8>>(start)
        };
        for item in iter {
            let (key, value) = item?;
            if !visit(&key, &value)? {
                break;
            }
        }
        Ok(())
    }

    fn count<K: TransactionKind>(txn: &Txn<'_, K>, table_name: &str) -> Result<u64> {
        let mut count = 0u64;
        Self::walk(txn, table_name, &[], |_, _| {
            count += 1;
            Ok(true)
        })?;
        Ok(count)
    }

    // Blocks

    pub fn block_put(&self, txn: &WriteTxn<'_>, hash: &BlockHash, block: &Block, sideband: &BlockSideband) -> Result<()> {
        let exists = self.block_exists(txn, hash)?;
        let row = StoredBlock {
            block: block.clone(),
            sideband: sideband.clone(),
        };
        Self::put_row(txn, BLOCKS_TABLE, hash.as_bytes(), &row)?;
        if !exists {
            let count = self.block_count(txn)?;
            Self::put_raw(txn, META_TABLE, META_BLOCK_COUNT, &(count + 1).to_be_bytes())?;
        }
        debug!(hash = %hash, block_type = %block.block_type(), "Stored block");
        Ok(())
    }

    pub fn block_get_stored<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<Option<StoredBlock>> {
        Self::get_row(txn, BLOCKS_TABLE, hash.as_bytes())
    }

    pub fn block_get<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<Option<Block>> {
        Ok(self.block_get_stored(txn, hash)?.map(|row| row.block))
    }

    pub fn block_sideband<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<Option<BlockSideband>> {
        Ok(self.block_get_stored(txn, hash)?.map(|row| row.sideband))
    }

    pub fn block_exists<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<bool> {
        Ok(Self::get_raw(txn, BLOCKS_TABLE, hash.as_bytes())?.is_some())
    }

    pub fn block_del(&self, txn: &WriteTxn<'_>, hash: &BlockHash) -> Result<()> {
        if Self::del_raw(txn, BLOCKS_TABLE, hash.as_bytes())? {
            let count = self.block_count(txn)?;
            Self::put_raw(txn, META_TABLE, META_BLOCK_COUNT, &count.saturating_sub(1).to_be_bytes())?;
        }
        Ok(())
    }

    /// Point the sideband of `hash` at its successor (zero clears it)
    pub fn block_successor_set(&self, txn: &WriteTxn<'_>, hash: &BlockHash, successor: &BlockHash) -> Result<()> {
        let mut row = self
            .block_get_stored(txn, hash)?
            .ok_or(LedgerError::BlockNotFound(*hash))?;
        row.sideband.successor = *successor;
        Self::put_row(txn, BLOCKS_TABLE, hash.as_bytes(), &row)
    }

    pub fn block_successor<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<BlockHash> {
        Ok(self
            .block_sideband(txn, hash)?
            .map(|sideband| sideband.successor)
            .unwrap_or_default())
    }

    /// Number of blocks in the ledger
    pub fn block_count<K: TransactionKind>(&self, txn: &Txn<'_, K>) -> Result<u64> {
        match Self::get_raw(txn, META_TABLE, META_BLOCK_COUNT)? {
            Some(bytes) => {
                let array: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| LedgerError::Serialization("block count must be 8 bytes".into()))?;
                Ok(u64::from_be_bytes(array))
            }
            None => Ok(0),
        }
    }

    // Accounts

    pub fn account_get<K: TransactionKind>(&self, txn: &Txn<'_, K>, account: &Account) -> Result<Option<AccountInfo>> {
        Self::get_row(txn, ACCOUNTS_TABLE, account.as_bytes())
    }

    pub fn account_put(&self, txn: &WriteTxn<'_>, account: &Account, info: &AccountInfo) -> Result<()> {
        Self::put_row(txn, ACCOUNTS_TABLE, account.as_bytes(), info)
    }

    pub fn account_del(&self, txn: &WriteTxn<'_>, account: &Account) -> Result<()> {
        Self::del_raw(txn, ACCOUNTS_TABLE, account.as_bytes())?;
        Ok(())
    }

    pub fn account_exists<K: TransactionKind>(&self, txn: &Txn<'_, K>, account: &Account) -> Result<bool> {
        Ok(Self::get_raw(txn, ACCOUNTS_TABLE, account.as_bytes())?.is_some())
    }

    /// Ordered walk over accounts starting at `start` (inclusive).
    /// Stops when `visit` returns false or the table ends.
    pub fn latest_begin<K, F>(&self, txn: &Txn<'_, K>, start: &Account, mut visit: F) -> Result<()>
    where
        K: TransactionKind,
        F: FnMut(Account, AccountInfo) -> bool,
    {
        Self::walk(txn, ACCOUNTS_TABLE, start.as_bytes(), |key, value| {
            let account = Account(
                key.try_into()
                    .map_err(|_| LedgerError::Serialization("account key must be 32 bytes".into()))?,
            );
            let info: AccountInfo = bincode::deserialize(value)?;
            Ok(visit(account, info))
        })
    }

    pub fn account_count<K: TransactionKind>(&self, txn: &Txn<'_, K>) -> Result<u64> {
        Self::count(txn, ACCOUNTS_TABLE)
    }

    // Pending

    pub fn pending_put(&self, txn: &WriteTxn<'_>, key: &PendingKey, info: &PendingInfo) -> Result<()> {
        Self::put_row(txn, PENDING_TABLE, &key.to_bytes(), info)
    }

    pub fn pending_get<K: TransactionKind>(&self, txn: &Txn<'_, K>, key: &PendingKey) -> Result<Option<PendingInfo>> {
        Self::get_row(txn, PENDING_TABLE, &key.to_bytes())
    }

    pub fn pending_del(&self, txn: &WriteTxn<'_>, key: &PendingKey) -> Result<()> {
        Self::del_raw(txn, PENDING_TABLE, &key.to_bytes())?;
        Ok(())
    }

    pub fn pending_exists<K: TransactionKind>(&self, txn: &Txn<'_, K>, key: &PendingKey) -> Result<bool> {
        Ok(Self::get_raw(txn, PENDING_TABLE, &key.to_bytes())?.is_some())
    }

    /// All receivable entries addressed to `destination`, ordered by send hash
    pub fn pending_for_account<K: TransactionKind>(
        &self,
        txn: &Txn<'_, K>,
        destination: &Account,
    ) -> Result<Vec<(PendingKey, PendingInfo)>> {
        let start = PendingKey::new(*destination, BlockHash::zero());
        let mut entries = Vec::new();
        Self::walk(txn, PENDING_TABLE, &start.to_bytes(), |key, value| {
            let key = PendingKey::from_slice(key)
                .ok_or_else(|| LedgerError::Serialization("pending key must be 64 bytes".into()))?;
            if key.destination != *destination {
                return Ok(false);
            }
            entries.push((key, bincode::deserialize(value)?));
            Ok(true)
        })?;
        Ok(entries)
    }

    // Representation

    pub fn representation_get<K: TransactionKind>(&self, txn: &Txn<'_, K>, representative: &Account) -> Result<Amount> {
        match Self::get_raw(txn, REPRESENTATION_TABLE, representative.as_bytes())? {
            Some(bytes) => {
                let array: [u8; 16] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| LedgerError::Serialization("weight must be 16 bytes".into()))?;
                Ok(Amount::from_be_bytes(array))
            }
            None => Ok(0),
        }
    }

    /// Store the weight of `representative`; zero removes the row
    pub fn representation_put(&self, txn: &WriteTxn<'_>, representative: &Account, weight: Amount) -> Result<()> {
        if weight == 0 {
            Self::del_raw(txn, REPRESENTATION_TABLE, representative.as_bytes())?;
            Ok(())
        } else {
            Self::put_raw(txn, REPRESENTATION_TABLE, representative.as_bytes(), &weight.to_be_bytes())
        }
    }

    /// Every representative with non-zero weight
    pub fn representation_all<K: TransactionKind>(&self, txn: &Txn<'_, K>) -> Result<Vec<(Account, Amount)>> {
        let mut weights = Vec::new();
        Self::walk(txn, REPRESENTATION_TABLE, &[], |key, value| {
            let account = Account(
                key.try_into()
                    .map_err(|_| LedgerError::Serialization("representative key must be 32 bytes".into()))?,
            );
            let weight = Amount::from_be_bytes(
                value
                    .try_into()
                    .map_err(|_| LedgerError::Serialization("weight must be 16 bytes".into()))?,
            );
            weights.push((account, weight));
            Ok(true)
        })?;
        Ok(weights)
    }

    // Frontiers

    pub fn frontier_get<K: TransactionKind>(&self, txn: &Txn<'_, K>, hash: &BlockHash) -> Result<Option<Account>> {
        match Self::get_raw(txn, FRONTIERS_TABLE, hash.as_bytes())? {
            Some(bytes) => Ok(Some(Account(
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| LedgerError::Serialization("frontier account must be 32 bytes".into()))?,
            ))),
            None => Ok(None),
        }
    }

    pub fn frontier_put(&self, txn: &WriteTxn<'_>, hash: &BlockHash, account: &Account) -> Result<()> {
        Self::put_raw(txn, FRONTIERS_TABLE, hash.as_bytes(), account.as_bytes())
    }

    pub fn frontier_del(&self, txn: &WriteTxn<'_>, hash: &BlockHash) -> Result<()> {
        Self::del_raw(txn, FRONTIERS_TABLE, hash.as_bytes())?;
        Ok(())
    }

    // Checksum cache, keyed by (prefix, mask bits)

    pub fn checksum_get<K: TransactionKind>(&self, txn: &Txn<'_, K>, prefix: u8, mask: u8) -> Result<BlockHash> {
        match Self::get_raw(txn, CHECKSUM_TABLE, &[mask, prefix])? {
            Some(bytes) => Ok(BlockHash(
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| LedgerError::Serialization("checksum must be 32 bytes".into()))?,
            )),
            None => Ok(BlockHash::zero()),
        }
    }

    pub fn checksum_put(&self, txn: &WriteTxn<'_>, prefix: u8, mask: u8, checksum: &BlockHash) -> Result<()> {
        if checksum.is_zero() {
            Self::del_raw(txn, CHECKSUM_TABLE, &[mask, prefix])?;
            Ok(())
        } else {
            Self::put_raw(txn, CHECKSUM_TABLE, &[mask, prefix], checksum.as_bytes())
        }
    }

    // Meta

    pub fn genesis_put(&self, txn: &WriteTxn<'_>, hash: &BlockHash, supply: Amount) -> Result<()> {
        Self::put_raw(txn, META_TABLE, META_GENESIS, hash.as_bytes())?;
        Self::put_raw(txn, META_TABLE, META_SUPPLY, &supply.to_be_bytes())
    }

    /// Hash of the genesis open block, if the ledger has been initialized
    pub fn genesis_get<K: TransactionKind>(&self, txn: &Txn<'_, K>) -> Result<Option<BlockHash>> {
        match Self::get_raw(txn, META_TABLE, META_GENESIS)? {
            Some(bytes) => Ok(Some(BlockHash(
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| LedgerError::Serialization("genesis hash must be 32 bytes".into()))?,
            ))),
            None => Ok(None),
        }
    }

    /// Total supply issued at genesis
    pub fn supply_get<K: TransactionKind>(&self, txn: &Txn<'_, K>) -> Result<Amount> {
        match Self::get_raw(txn, META_TABLE, META_SUPPLY)? {
            Some(bytes) => Ok(Amount::from_be_bytes(
                bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| LedgerError::Serialization("supply must be 16 bytes".into()))?,
            )),
            None => Ok(0),
        }
    }

    /// Row counts, used by the inspect command
    pub fn stats<K: TransactionKind>(&self, txn: &Txn<'_, K>) -> Result<DatabaseStats> {
        Ok(DatabaseStats {
            accounts: Self::count(txn, ACCOUNTS_TABLE)?,
            blocks: self.block_count(txn)?,
            pending: Self::count(txn, PENDING_TABLE)?,
            representatives: Self::count(txn, REPRESENTATION_TABLE)?,
            frontiers: Self::count(txn, FRONTIERS_TABLE)?,
        })
    }
}
