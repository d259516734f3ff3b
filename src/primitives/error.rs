// Error types for the ledger and storage layers
use thiserror::Error;

use super::primitives::{Account, BlockHash};

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Infrastructure failures. Block validation outcomes are not errors, see `ProcessResult`.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Block not found: {0}")]
    BlockNotFound(BlockHash),

    #[error("Account not found: {0}")]
    AccountNotFound(Account),

    #[error("Genesis open block cannot be rolled back")]
    GenesisRollback,

    #[error("Ledger is not initialized")]
    NotInitialized,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Conversion from MDBX errors to LedgerError
impl From<libmdbx::Error> for LedgerError {
    fn from(err: libmdbx::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

/// Conversion from bincode errors to LedgerError
impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

/// Conversion from std::io::Error to LedgerError
impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Storage(err.to_string())
    }
}

/// Conversion from CryptoError to LedgerError
impl From<crate::crypto::CryptoError> for LedgerError {
    fn from(err: crate::crypto::CryptoError) -> Self {
        LedgerError::Crypto(err.to_string())
    }
}

/// Conversion from serde_json errors to LedgerError
impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}
