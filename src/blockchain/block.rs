// Block model: the five account-chain block variants as a single tagged union
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::crypto::KeyPair;
use crate::primitives::{Account, Amount, BlockHash, Link, Root, Signature};

/// Discriminant of a block variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Send = 2,
    Receive = 3,
    Open = 4,
    Change = 5,
    State = 6,
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BlockType::Send => "send",
            BlockType::Receive => "receive",
            BlockType::Open => "open",
            BlockType::Change => "change",
            BlockType::State => "state",
        };
        f.write_str(name)
    }
}

/// Legacy send: declares the balance left after the transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBlock {
    pub previous: BlockHash,
    pub destination: Account,
    pub balance: Amount,
    pub signature: Signature,
    pub work: u64,
}

/// Legacy receive of a pending send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveBlock {
    pub previous: BlockHash,
    pub source: BlockHash,
    pub signature: Signature,
    pub work: u64,
}

/// Legacy first block of an account chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBlock {
    pub source: BlockHash,
    pub representative: Account,
    pub account: Account,
    pub signature: Signature,
    pub work: u64,
}

/// Legacy representative change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBlock {
    pub previous: BlockHash,
    pub representative: Account,
    pub signature: Signature,
    pub work: u64,
}

/// Unified block carrying the full account state after it is applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateBlock {
    pub account: Account,
    pub previous: BlockHash,
    pub representative: Account,
    pub balance: Amount,
    pub link: Link,
    pub signature: Signature,
    pub work: u64,
}

/// Account-chain block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    Send(SendBlock),
    Receive(ReceiveBlock),
    Open(OpenBlock),
    Change(ChangeBlock),
    State(StateBlock),
}

impl Block {
    /// Build and sign a legacy send
    pub fn send(previous: BlockHash, destination: Account, balance: Amount, keys: &KeyPair, work: u64) -> Self {
        let mut block = Block::Send(SendBlock {
            previous,
            destination,
            balance,
            signature: Signature::zero(),
            work,
        });
        block.sign(keys);
        block
    }

    /// Build and sign a legacy receive
    pub fn receive(previous: BlockHash, source: BlockHash, keys: &KeyPair, work: u64) -> Self {
        let mut block = Block::Receive(ReceiveBlock {
            previous,
            source,
            signature: Signature::zero(),
            work,
        });
        block.sign(keys);
        block
    }

    /// Build and sign a legacy open. The account is taken from `keys`.
    pub fn open(source: BlockHash, representative: Account, keys: &KeyPair, work: u64) -> Self {
        let mut block = Block::Open(OpenBlock {
            source,
            representative,
            account: keys.account(),
            signature: Signature::zero(),
            work,
        });
        block.sign(keys);
        block
    }

    /// Build and sign a legacy representative change
    pub fn change(previous: BlockHash, representative: Account, keys: &KeyPair, work: u64) -> Self {
        let mut block = Block::Change(ChangeBlock {
            previous,
            representative,
            signature: Signature::zero(),
            work,
        });
        block.sign(keys);
        block
    }

    /// Build and sign a state block. The signer is usually the account
    /// owner; epoch blocks are signed by the epoch signer instead.
    pub fn state(
        account: Account,
        previous: BlockHash,
        representative: Account,
        balance: Amount,
        link: Link,
        keys: &KeyPair,
        work: u64,
    ) -> Self {
        let mut block = Block::State(StateBlock {
            account,
            previous,
            representative,
            balance,
            link,
            signature: Signature::zero(),
            work,
        });
        block.sign(keys);
        block
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Block::Send(_) => BlockType::Send,
            Block::Receive(_) => BlockType::Receive,
            Block::Open(_) => BlockType::Open,
            Block::Change(_) => BlockType::Change,
            Block::State(_) => BlockType::State,
        }
    }

    /// Content digest over the variant tag and hashable fields.
    /// Signature and work are not covered.
    pub fn hash(&self) -> BlockHash {
        let mut hasher = Sha256::new();
        hasher.update([self.block_type() as u8]);
        match self {
            Block::Send(b) => {
                hasher.update(b.previous.as_bytes());
                hasher.update(b.destination.as_bytes());
                hasher.update(b.balance.to_be_bytes());
            }
            Block::Receive(b) => {
                hasher.update(b.previous.as_bytes());
                hasher.update(b.source.as_bytes());
            }
            Block::Open(b) => {
                hasher.update(b.source.as_bytes());
                hasher.update(b.representative.as_bytes());
                hasher.update(b.account.as_bytes());
            }
            Block::Change(b) => {
                hasher.update(b.previous.as_bytes());
                hasher.update(b.representative.as_bytes());
            }
            Block::State(b) => {
                hasher.update(b.account.as_bytes());
                hasher.update(b.previous.as_bytes());
                hasher.update(b.representative.as_bytes());
                hasher.update(b.balance.to_be_bytes());
                hasher.update(b.link.as_bytes());
            }
        }
        BlockHash(hasher.finalize().into())
    }

    /// Previous block on the same chain, zero for opening blocks
    pub fn previous(&self) -> BlockHash {
        match self {
            Block::Send(b) => b.previous,
            Block::Receive(b) => b.previous,
            Block::Open(_) => BlockHash::zero(),
            Block::Change(b) => b.previous,
            Block::State(b) => b.previous,
        }
    }

    /// Chain position this block competes for
    pub fn root(&self) -> Root {
        match self {
            Block::Open(b) => Root::from(b.account),
            Block::State(b) if b.previous.is_zero() => Root::from(b.account),
            _ => Root::from(self.previous()),
        }
    }

    /// Representative declared by the block, if its variant carries one
    pub fn representative(&self) -> Option<Account> {
        match self {
            Block::Open(b) => Some(b.representative),
            Block::Change(b) => Some(b.representative),
            Block::State(b) => Some(b.representative),
            Block::Send(_) | Block::Receive(_) => None,
        }
    }

    /// Source send referenced by a legacy receive or open
    pub fn source(&self) -> Option<BlockHash> {
        match self {
            Block::Receive(b) => Some(b.source),
            Block::Open(b) => Some(b.source),
            _ => None,
        }
    }

    /// Link field of a state block, zero for legacy variants
    pub fn link(&self) -> Link {
        match self {
            Block::State(b) => b.link,
            _ => Link::zero(),
        }
    }

    /// Account named inside the block (open and state variants)
    pub fn account_field(&self) -> Option<Account> {
        match self {
            Block::Open(b) => Some(b.account),
            Block::State(b) => Some(b.account),
            _ => None,
        }
    }

    /// Balance declared inside the block (send and state variants)
    pub fn balance_field(&self) -> Option<Amount> {
        match self {
            Block::Send(b) => Some(b.balance),
            Block::State(b) => Some(b.balance),
            _ => None,
        }
    }

    pub fn signature(&self) -> &Signature {
        match self {
            Block::Send(b) => &b.signature,
            Block::Receive(b) => &b.signature,
            Block::Open(b) => &b.signature,
            Block::Change(b) => &b.signature,
            Block::State(b) => &b.signature,
        }
    }

    pub fn set_signature(&mut self, signature: Signature) {
        match self {
            Block::Send(b) => b.signature = signature,
            Block::Receive(b) => b.signature = signature,
            Block::Open(b) => b.signature = signature,
            Block::Change(b) => b.signature = signature,
            Block::State(b) => b.signature = signature,
        }
    }

    pub fn work(&self) -> u64 {
        match self {
            Block::Send(b) => b.work,
            Block::Receive(b) => b.work,
            Block::Open(b) => b.work,
            Block::Change(b) => b.work,
            Block::State(b) => b.work,
        }
    }

    pub fn set_work(&mut self, work: u64) {
        match self {
            Block::Send(b) => b.work = work,
            Block::Receive(b) => b.work = work,
            Block::Open(b) => b.work = work,
            Block::Change(b) => b.work = work,
            Block::State(b) => b.work = work,
        }
    }

    /// Re-sign the block hash with `keys`
    pub fn sign(&mut self, keys: &KeyPair) {
        let signature = keys.sign(self.hash().as_bytes());
        self.set_signature(signature);
    }

    /// Legacy variants cannot follow a state block on the same chain
    pub fn is_legacy(&self) -> bool {
        !matches!(self, Block::State(_))
    }

    /// Whether the attached work value meets `threshold` for this block's root
    pub fn work_valid(&self, threshold: u64) -> bool {
        work_value(&self.root(), self.work()) >= threshold
    }
}

/// Difficulty of `work` against `root`: the first eight bytes of
/// SHA-256(work || root) read little-endian.
pub fn work_value(root: &Root, work: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(work.to_le_bytes());
    hasher.update(root.as_bytes());
    let digest = hasher.finalize();
    let mut value = [0u8; 8];
    value.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(value)
}
