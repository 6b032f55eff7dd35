//! Ed25519 signing of audit entries.
//!
//! The key pair is generated when the process starts and never persisted.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use super::entry::AuditEntry;
use super::errors::{LedgerError, LedgerResult};
use super::hashing::canonical_encode;

pub struct LedgerSigner {
    signing_key: SigningKey,
}

impl std::fmt::Debug for LedgerSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerSigner")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}

impl LedgerSigner {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Hex signature over the canonical (payload_hash, timestamp) pair
    pub fn sign(&self, payload_hash: &str, timestamp: &str) -> String {
        let message = canonical_encode(&[payload_hash, timestamp]);
        hex::encode(self.signing_key.sign(&message).to_bytes())
    }
}

/// Check an entry's signature against the public key stored with it
pub fn verify_signature(entry: &AuditEntry) -> LedgerResult<bool> {
    let key_bytes: [u8; 32] = hex::decode(&entry.actor_public_key)
        .map_err(|e| LedgerError::Signature(format!("public key is not hex: {e}")))?
        .try_into()
        .map_err(|_| LedgerError::Signature("public key must be 32 bytes".to_string()))?;
    let key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|e| LedgerError::Signature(e.to_string()))?;

    let signature_bytes = hex::decode(&entry.actor_signature)
        .map_err(|e| LedgerError::Signature(format!("signature is not hex: {e}")))?;
    let signature = Signature::from_slice(&signature_bytes)
        .map_err(|e| LedgerError::Signature(e.to_string()))?;

    let message = canonical_encode(&[&entry.payload_hash, &entry.timestamp]);
    Ok(key.verify(&message, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_entry(signer: &LedgerSigner) -> AuditEntry {
        let payload_hash = "ab".repeat(32);
        let timestamp = "2026-01-01T00:00:00.000000001Z".to_string();
        AuditEntry {
            actor_signature: signer.sign(&payload_hash, &timestamp),
            actor_public_key: signer.public_key_hex(),
            timestamp,
            payload_hash,
            event_type: "AI_PREDICTION".to_string(),
            subject_hash: String::new(),
            prev_hash: String::new(),
            current_hash: String::new(),
            actor_id: "AI_SYSTEM".to_string(),
        }
    }

    #[test]
    fn test_signature_verifies() {
        let signer = LedgerSigner::generate();
        assert!(verify_signature(&signed_entry(&signer)).unwrap());
    }

    #[test]
    fn test_altered_payload_hash_fails_verification() {
        let signer = LedgerSigner::generate();
        let mut entry = signed_entry(&signer);
        entry.payload_hash = "cd".repeat(32);
        assert!(!verify_signature(&entry).unwrap());
    }

    #[test]
    fn test_other_key_fails_verification() {
        let mut entry = signed_entry(&LedgerSigner::generate());
        entry.actor_public_key = LedgerSigner::generate().public_key_hex();
        assert!(!verify_signature(&entry).unwrap());
    }

    #[test]
    fn test_garbage_key_is_an_error() {
        let mut entry = signed_entry(&LedgerSigner::generate());
        entry.actor_public_key = "zz".to_string();
        assert!(verify_signature(&entry).is_err());
    }
}
