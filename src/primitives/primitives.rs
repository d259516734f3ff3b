// Core primitives shared by the block model, the ledger and the election layer
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Raw currency amount. The full supply fits in 128 bits.
pub type Amount = u128;
pub type Height = u64;
pub type Timestamp = u64;

/// Declares a 32-byte value type rendered as hex in human readable formats
/// and as raw bytes in binary ones.
macro_rules! bytes32_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            pub const fn zero() -> Self {
                $name([0u8; 32])
            }

            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                $name(bytes)
            }

            pub fn from_hex(text: &str) -> std::result::Result<Self, hex::FromHexError> {
                let mut bytes = [0u8; 32];
                hex::decode_to_slice(text, &mut bytes)?;
                Ok($name(bytes))
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode_upper(self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                let mut bytes = [0u8; 32];
                bytes[24..].copy_from_slice(&value.to_be_bytes());
                $name(bytes)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                if serializer.is_human_readable() {
                    serializer.serialize_str(&self.to_hex())
                } else {
                    self.0.serialize(serializer)
                }
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                if deserializer.is_human_readable() {
                    let text = String::deserialize(deserializer)?;
                    $name::from_hex(&text).map_err(serde::de::Error::custom)
                } else {
                    <[u8; 32]>::deserialize(deserializer).map($name)
                }
            }
        }
    };
}

bytes32_type!(
    /// Content digest of a block
    BlockHash
);

bytes32_type!(
    /// Public key identifying an account chain
    Account
);

bytes32_type!(
    /// Polymorphic state block field: a source hash, a destination account,
    /// an epoch marker or zero
    Link
);

bytes32_type!(
    /// Previous hash for chained blocks, account key for opening blocks
    Root
);

impl From<BlockHash> for Root {
    fn from(hash: BlockHash) -> Self {
        Root(hash.0)
    }
}

impl From<Account> for Root {
    fn from(account: Account) -> Self {
        Root(account.0)
    }
}

impl From<BlockHash> for Link {
    fn from(hash: BlockHash) -> Self {
        Link(hash.0)
    }
}

impl From<Account> for Link {
    fn from(account: Account) -> Self {
        Link(account.0)
    }
}

impl Link {
    pub fn as_account(&self) -> Account {
        Account(self.0)
    }

    pub fn as_block_hash(&self) -> BlockHash {
        BlockHash(self.0)
    }
}

impl Root {
    pub fn as_account(&self) -> Account {
        Account(self.0)
    }

    pub fn as_block_hash(&self) -> BlockHash {
        BlockHash(self.0)
    }
}

impl std::ops::BitXor for BlockHash {
    type Output = BlockHash;

    fn bitxor(self, rhs: BlockHash) -> BlockHash {
        let mut out = self.0;
        for (lhs, rhs) in out.iter_mut().zip(rhs.0.iter()) {
            *lhs ^= rhs;
        }
        BlockHash(out)
    }
}

impl std::ops::BitXorAssign for BlockHash {
    fn bitxor_assign(&mut self, rhs: BlockHash) {
        *self = *self ^ rhs;
    }
}

/// Ed25519 signature over a block hash or vote digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    pub const fn zero() -> Self {
        Signature([0u8; 64])
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    pub fn from_hex(text: &str) -> std::result::Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 64];
        hex::decode_to_slice(text, &mut bytes)?;
        Ok(Signature(bytes))
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            Signature::from_hex(&text).map_err(serde::de::Error::custom)
        } else {
            let bytes = Vec::<u8>::deserialize(deserializer)?;
            let array: [u8; 64] = bytes
                .try_into()
                .map_err(|_| serde::de::Error::custom("signature must be 64 bytes"))?;
            Ok(Signature(array))
        }
    }
}

/// Per-account ledger format marker. Only ever advanced by epoch blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Epoch(pub u8);

impl Epoch {
    /// Accounts that have never been upgraded
    pub const LEGACY: Epoch = Epoch(0);

    pub fn next(self) -> Option<Epoch> {
        self.0.checked_add(1).map(Epoch)
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "epoch_{}", self.0)
    }
}

/// SHA-256 digest of arbitrary data
pub fn hash_data(data: &[u8]) -> BlockHash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    BlockHash(hasher.finalize().into())
}

/// Current unix time in seconds
pub fn seconds_since_epoch() -> Timestamp {
    chrono::Utc::now().timestamp().max(0) as Timestamp
}
