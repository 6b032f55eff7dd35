//! # Encrypted Backups
//!
//! A ledger export is sealed with a fresh ChaCha20-Poly1305 session key and
//! written to a content-addressed store. The blob is the 12-byte nonce
//! followed by the ciphertext; its content id is `Qm` plus the unpadded
//! base64url SHA-256 of the blob.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    ChaCha20Poly1305, Key, Nonce,
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::errors::{LedgerError, LedgerResult};

const NONCE_LEN: usize = 12;
const CONTENT_ID_LEN: usize = 46;

/// Where a backup went and the key needed to open it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupReceipt {
    pub content_id: String,
    pub session_key_hex: String,
    pub size_bytes: usize,
}

pub fn content_id(blob: &[u8]) -> String {
    let digest = Sha256::digest(blob);
    format!("Qm{}", URL_SAFE_NO_PAD.encode(digest))
        .chars()
        .take(CONTENT_ID_LEN)
        .collect()
}

/// Seal `plaintext` under a new key; returns (nonce || ciphertext, key)
pub fn seal(plaintext: &[u8]) -> LedgerResult<(Vec<u8>, Key)> {
    let key = ChaCha20Poly1305::generate_key(&mut OsRng);
    let cipher = ChaCha20Poly1305::new(&key);
    let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| LedgerError::Encryption(e.to_string()))?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok((blob, key))
}

/// Reverse of [`seal`] given the hex session key from a receipt
pub fn open(blob: &[u8], session_key_hex: &str) -> LedgerResult<Vec<u8>> {
    let key_bytes = hex::decode(session_key_hex)
        .map_err(|e| LedgerError::Encryption(format!("session key is not hex: {e}")))?;
    if key_bytes.len() != 32 {
        return Err(LedgerError::Encryption("session key must be 32 bytes".to_string()));
    }
    if blob.len() < NONCE_LEN {
        return Err(LedgerError::Encryption("backup blob is truncated".to_string()));
    }

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key_bytes));
    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| LedgerError::Encryption(e.to_string()))
}

/// Content-addressed blob storage
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Store `blob` and return its content id
    async fn put(&self, blob: Vec<u8>) -> LedgerResult<String>;

    async fn get(&self, content_id: &str) -> LedgerResult<Option<Vec<u8>>>;
}

#[derive(Debug, Default)]
pub struct InMemoryContentStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn put(&self, blob: Vec<u8>) -> LedgerResult<String> {
        let id = content_id(&blob);
        self.blobs.insert(id.clone(), blob);
        Ok(id)
    }

    async fn get(&self, content_id: &str) -> LedgerResult<Option<Vec<u8>>> {
        Ok(self.blobs.get(content_id).map(|b| b.value().clone()))
    }
}

/// One file per blob, named by content id
#[derive(Debug, Clone)]
pub struct FileContentStore {
    directory: PathBuf,
}

impl FileContentStore {
    pub async fn new(directory: impl Into<PathBuf>) -> LedgerResult<Self> {
        let directory = directory.into();
        tokio::fs::create_dir_all(&directory).await?;
        Ok(Self { directory })
    }

    fn path_for(&self, content_id: &str) -> LedgerResult<PathBuf> {
        // Ids are base64url, so anything else would escape the directory
        if content_id.is_empty()
            || !content_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(LedgerError::ContentStore(format!(
                "invalid content id '{content_id}'"
            )));
        }
        Ok(self.directory.join(content_id))
    }
}

#[async_trait]
impl ContentStore for FileContentStore {
    async fn put(&self, blob: Vec<u8>) -> LedgerResult<String> {
        let id = content_id(&blob);
        tokio::fs::write(self.path_for(&id)?, &blob).await?;
        Ok(id)
    }

    async fn get(&self, content_id: &str) -> LedgerResult<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(content_id)?).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
