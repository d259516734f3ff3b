// Signature verification used by the ledger and the vote processor
use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};

use super::primitives::{Account, Signature};

/// Verify `signature` over `message` against the account's public key.
///
/// Returns false for keys that are not valid curve points; never panics.
pub fn validate_message(account: &Account, message: &[u8], signature: &Signature) -> bool {
    let Ok(key) = VerifyingKey::from_bytes(account.as_bytes()) else {
        return false;
    };
    let signature = DalekSignature::from_bytes(signature.as_bytes());
    key.verify(message, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    #[test]
    fn test_validate_message() {
        let keys = KeyPair::from_seed([1u8; 32]);
        let signature = keys.sign(b"message");
        assert!(validate_message(&keys.account(), b"message", &signature));
        assert!(!validate_message(&keys.account(), b"other", &signature));

        let other = KeyPair::from_seed([2u8; 32]);
        assert!(!validate_message(&other.account(), b"message", &signature));
    }

    #[test]
    fn test_zero_signature_rejected() {
        let keys = KeyPair::from_seed([3u8; 32]);
        assert!(!validate_message(&keys.account(), b"message", &Signature::zero()));
    }
}
