//! Registry persistence.
//!
//! `TokenStore` maps token records onto an external key-value store under
//! the `('I', identifier)` key schema. Loading tolerates identifier gaps
//! up to [`TOKEN_MAX_SKIP`] so a registry survives holes left by reorgs.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::token::{Token, ISSUANCE_ID_BEGIN, TOKEN_MAX_SKIP};
use crate::TokenError;

/// Key prefix byte for token records.
const DB_TOKEN: u8 = b'I';

/// The persistent key-value store the node injects.
pub trait KvStore: Send + Sync {
    /// Read a value; `None` if the key is absent.
    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TokenError>;
    /// Write a value, overwriting any previous one.
    fn write(&self, key: &[u8], value: &[u8]) -> Result<(), TokenError>;
    /// Remove a key; absent keys are not an error.
    fn erase(&self, key: &[u8]) -> Result<(), TokenError>;
    /// True if the key is present.
    fn exists(&self, key: &[u8]) -> Result<bool, TokenError>;
    /// Force buffered writes to durable storage.
    fn flush(&self) -> Result<(), TokenError>;
}

/// Token-record view over a [`KvStore`].
#[derive(Clone)]
pub struct TokenStore {
    kv: Arc<dyn KvStore>,
}

impl TokenStore {
    /// Wrap a key-value store handle.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        TokenStore { kv }
    }

    fn key(id: u64) -> [u8; 9] {
        let mut key = [0u8; 9];
        key[0] = DB_TOKEN;
        key[1..].copy_from_slice(&id.to_le_bytes());
        key
    }

    /// Read the token stored under `id`.
    pub fn read_token(&self, id: u64) -> Result<Option<Token>, TokenError> {
        match self.kv.read(&Self::key(id))? {
            Some(bytes) => Ok(Some(Token::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Write a token under its identifier. Idempotent.
    pub fn write_token(&self, token: &Token) -> Result<(), TokenError> {
        self.kv.write(&Self::key(token.id()), &token.serialize())
    }

    /// Erase the record under `id`.
    pub fn erase_token(&self, id: u64) -> Result<(), TokenError> {
        self.kv.erase(&Self::key(id))
    }

    /// True if a record exists under `id`.
    pub fn exists_token(&self, id: u64) -> Result<bool, TokenError> {
        self.kv.exists(&Self::key(id))
    }

    /// Scan identifiers upward from [`ISSUANCE_ID_BEGIN`], collecting
    /// stored tokens and stopping after [`TOKEN_MAX_SKIP`] consecutive
    /// misses.
    pub fn load_known_issuances(&self) -> Result<Vec<Token>, TokenError> {
        let mut tokens = Vec::new();
        let mut skipped = 0u64;
        let mut id = ISSUANCE_ID_BEGIN;

        loop {
            id += 1;
            match self.read_token(id)? {
                Some(token) => {
                    skipped = 0;
                    tokens.push(token);
                }
                None => {
                    skipped += 1;
                    if skipped > TOKEN_MAX_SKIP {
                        break;
                    }
                }
            }
        }

        info!(count = tokens.len(), "loaded token issuances from disk");
        Ok(tokens)
    }

    /// Write every token in the slice. Returns the count written.
    pub fn save_known_issuances(&self, tokens: &[Token]) -> Result<u64, TokenError> {
        let mut counter = 0u64;
        for token in tokens {
            self.write_token(token)?;
            counter += 1;
        }
        self.kv.flush()?;
        info!(count = counter, "saved token issuances to disk");
        Ok(counter)
    }

    /// Erase every stored token record, using the same gap-tolerant scan
    /// as loading.
    pub fn wipe(&self) -> Result<(), TokenError> {
        let mut skipped = 0u64;
        let mut id = ISSUANCE_ID_BEGIN;

        loop {
            id += 1;
            if self.exists_token(id)? {
                skipped = 0;
                self.erase_token(id)?;
            } else {
                skipped += 1;
                if skipped > TOKEN_MAX_SKIP {
                    break;
                }
            }
        }
        self.kv.flush()
    }

    /// Flush the underlying store.
    pub fn flush(&self) -> Result<(), TokenError> {
        self.kv.flush()
    }
}

/// In-memory [`KvStore`] used by the test suites and `tokenrebuild`
/// exercises.
#[derive(Default)]
pub struct MemoryKv {
    map: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryKv {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TokenError> {
        Ok(self.map.lock().expect("kv lock").get(key).cloned())
    }

    fn write(&self, key: &[u8], value: &[u8]) -> Result<(), TokenError> {
        self.map
            .lock()
            .expect("kv lock")
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn erase(&self, key: &[u8]) -> Result<(), TokenError> {
        self.map.lock().expect("kv lock").remove(key);
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, TokenError> {
        Ok(self.map.lock().expect("kv lock").contains_key(key))
    }

    fn flush(&self) -> Result<(), TokenError> {
        Ok(())
    }
}
