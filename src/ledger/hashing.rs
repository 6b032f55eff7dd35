//! Canonical hash preimages.
//!
//! Every field is written as its byte length (u64, big-endian) followed by
//! the bytes, in a fixed order. Two different field lists can never produce
//! the same preimage.

use sha2::{Digest, Sha256};

/// `prev_hash` of the first entry
pub const GENESIS: &str = "GENESIS";

pub fn canonical_encode(fields: &[&str]) -> Vec<u8> {
    let capacity = fields.iter().map(|f| 8 + f.len()).sum();
    let mut out = Vec::with_capacity(capacity);
    for field in fields {
        out.extend_from_slice(&(field.len() as u64).to_be_bytes());
        out.extend_from_slice(field.as_bytes());
    }
    out
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hash of an entry's fields, in chain order
pub fn entry_hash(
    timestamp: &str,
    event_type: &str,
    subject_hash: &str,
    payload_hash: &str,
    prev_hash: &str,
    actor_id: &str,
) -> String {
    sha256_hex(&canonical_encode(&[
        timestamp,
        event_type,
        subject_hash,
        payload_hash,
        prev_hash,
        actor_id,
    ]))
}
