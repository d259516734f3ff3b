// XOR checksum over account heads, cached per 8-bit account prefix
use std::ops::{Bound, RangeBounds};

use libmdbx::TransactionKind;

use crate::primitives::{Account, BlockHash, Result};
use crate::storage::{Txn, WriteTxn};
use super::Ledger;

/// Prefix length, in bits, of the cached checksum buckets
const BUCKET_BITS: u8 = 8;

impl Ledger {
    /// XOR of the head hashes of every account in `range`.
    ///
    /// Buckets fully inside the range come from the cache; the at most two
    /// buckets cut by the range bounds are scanned.
    pub fn checksum<K, R>(&self, txn: &Txn<'_, K>, range: R) -> Result<BlockHash>
    where
        K: TransactionKind,
        R: RangeBounds<Account>,
    {
        let mut result = BlockHash::zero();
        for prefix in 0..=u8::MAX {
            let first = bucket_first(prefix);
            let last = bucket_last(prefix);
            let covers_first = range.contains(&first);
            let covers_last = range.contains(&last);
            if covers_first && covers_last {
                result ^= self.store.checksum_get(txn, prefix, BUCKET_BITS)?;
            } else if intersects(&range, &first, &last) {
                self.store.latest_begin(txn, &first, |account, info| {
                    if account.0[0] != prefix {
                        return false;
                    }
                    if range.contains(&account) {
                        result ^= info.head;
                    }
                    true
                })?;
            }
        }
        Ok(result)
    }

    /// Toggle `hash` in the bucket of `account`
    pub(super) fn checksum_update(&self, txn: &WriteTxn<'_>, account: &Account, hash: &BlockHash) -> Result<()> {
        let prefix = account.0[0];
        let current = self.store.checksum_get(txn, prefix, BUCKET_BITS)?;
        self.store.checksum_put(txn, prefix, BUCKET_BITS, &(current ^ *hash))
    }
}

fn bucket_first(prefix: u8) -> Account {
    let mut bytes = [0u8; 32];
    bytes[0] = prefix;
    Account(bytes)
}

fn bucket_last(prefix: u8) -> Account {
    let mut bytes = [0xffu8; 32];
    bytes[0] = prefix;
    Account(bytes)
}

/// Whether `range` shares any account with the closed interval [first, last]
fn intersects<R: RangeBounds<Account>>(range: &R, first: &Account, last: &Account) -> bool {
    let starts_before_last = match range.start_bound() {
        Bound::Included(start) => start <= last,
        Bound::Excluded(start) => start < last,
        Bound::Unbounded => true,
    };
    let ends_after_first = match range.end_bound() {
        Bound::Included(end) => end >= first,
        Bound::Excluded(end) => end > first,
        Bound::Unbounded => true,
    };
    starts_before_last && ends_after_first
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects() {
        let first = bucket_first(1);
        let last = bucket_last(1);
        assert!(intersects(&(..), &first, &last));
        assert!(intersects(&(bucket_first(1)..bucket_first(2)), &first, &last));
        assert!(!intersects(&(bucket_first(2)..), &first, &last));
        assert!(!intersects(&(..bucket_first(1)), &first, &last));
        assert!(intersects(&(..=bucket_first(1)), &first, &last));
    }
}
