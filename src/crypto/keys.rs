// Ed25519 key pairs for account owners, representatives and the epoch signer

use ed25519_dalek::{Signer, SigningKey};
use rand::RngCore;

use crate::primitives::{Account, Signature};
use super::{CryptoError, Result};

/// Key pair controlling one account chain
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    account: Account,
}

impl KeyPair {
    /// Generate a new key pair from the OS random source
    pub fn generate() -> Result<Self> {
        let mut seed = [0u8; 32];
        rand::rngs::OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;
        Ok(Self::from_seed(seed))
    }

    /// Deterministic key pair from a 32-byte private seed
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        let account = Account(signing_key.verifying_key().to_bytes());
        Self { signing_key, account }
    }

    /// Parse a hex encoded private seed
    pub fn from_hex(text: &str) -> Result<Self> {
        let mut seed = [0u8; 32];
        hex::decode_to_slice(text.trim(), &mut seed).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self::from_seed(seed))
    }

    /// The account (public key) of this key pair
    pub fn account(&self) -> Account {
        self.account
    }

    /// Hex encoded private seed (use carefully!)
    pub fn private_hex(&self) -> String {
        hex::encode_upper(self.signing_key.to_bytes())
    }

    /// Sign a message with this key pair
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(self.signing_key.sign(message).to_bytes())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair").field("account", &self.account).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_deterministic() {
        let a = KeyPair::from_seed([9u8; 32]);
        let b = KeyPair::from_hex(&a.private_hex()).unwrap();
        assert_eq!(a.account(), b.account());
        assert_eq!(a.sign(b"x"), b.sign(b"x"));
    }

    #[test]
    fn test_generate_distinct() {
        let a = KeyPair::generate().unwrap();
        let b = KeyPair::generate().unwrap();
        assert_ne!(a.account(), b.account());
    }

    #[test]
    fn test_bad_hex_rejected() {
        assert!(matches!(KeyPair::from_hex("zz"), Err(CryptoError::InvalidPrivateKey)));
    }
}
