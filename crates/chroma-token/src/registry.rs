//! The chain-wide issuance registry.
//!
//! One authoritative, insertion-ordered set of every issued token, with
//! O(1) lookup by identifier and by name. The mutex lives inside the
//! value and is always the innermost lock (chain, mempool, and wallet
//! locks are external and acquired first); persistence writes through
//! the injected [`TokenStore`] before an insert is observable.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use crate::chain::MempoolAccess;
use crate::mempool::is_identifier_in_mempool;
use crate::store::TokenStore;
use crate::token::{Token, TokenType, ISSUANCE_ID_BEGIN};
use crate::TokenError;

#[derive(Default)]
struct RegistryInner {
    /// Tokens in insertion order.
    tokens: Vec<Token>,
    /// Identifier -> position in `tokens`.
    by_id: HashMap<u64, usize>,
    /// Name -> position in `tokens`.
    by_name: HashMap<String, usize>,
}

impl RegistryInner {
    fn reindex(&mut self) {
        self.by_id.clear();
        self.by_name.clear();
        for (pos, token) in self.tokens.iter().enumerate() {
            self.by_id.insert(token.id(), pos);
            self.by_name.insert(token.name().to_string(), pos);
        }
    }
}

/// The authoritative set of known issuances.
pub struct IssuanceRegistry {
    inner: Mutex<RegistryInner>,
    store: TokenStore,
}

impl IssuanceRegistry {
    /// Create an empty registry over a persistence handle.
    pub fn new(store: TokenStore) -> Self {
        IssuanceRegistry {
            inner: Mutex::new(RegistryInner::default()),
            store,
        }
    }

    /// Load persisted issuances into memory. Returns the count loaded.
    pub fn load(&self) -> Result<usize, TokenError> {
        let tokens = self.store.load_known_issuances()?;
        let mut inner = self.inner.lock().expect("registry lock");
        inner.tokens = tokens;
        inner.reindex();
        Ok(inner.tokens.len())
    }

    /// Look up a token by byte-exact name.
    pub fn lookup_by_name(&self, name: &str) -> Option<Token> {
        let inner = self.inner.lock().expect("registry lock");
        inner.by_name.get(name).map(|&pos| inner.tokens[pos].clone())
    }

    /// Look up a token by identifier.
    pub fn lookup_by_id(&self, id: u64) -> Option<Token> {
        let inner = self.inner.lock().expect("registry lock");
        inner.by_id.get(&id).map(|&pos| inner.tokens[pos].clone())
    }

    /// True if any entry carries this name.
    pub fn contains_name(&self, name: &str) -> bool {
        self.inner
            .lock()
            .expect("registry lock")
            .by_name
            .contains_key(name)
    }

    /// True if any entry carries this identifier.
    pub fn contains_id(&self, id: u64) -> bool {
        self.inner
            .lock()
            .expect("registry lock")
            .by_id
            .contains_key(&id)
    }

    /// Insert a new issuance.
    ///
    /// The token must be an issuance whose identifier and name are both
    /// unused; the record is durably written before success is returned.
    pub fn insert(&self, token: Token) -> Result<(), TokenError> {
        if token.token_type() != TokenType::Issuance {
            return Err(TokenError::TypeInvalid(token.token_type().to_wire()));
        }

        let mut inner = self.inner.lock().expect("registry lock");
        if inner.by_name.contains_key(token.name()) {
            return Err(TokenError::NameExists(token.name().to_string()));
        }
        if inner.by_id.contains_key(&token.id()) {
            return Err(TokenError::IdExists(token.id()));
        }

        // Durable before observable.
        self.store.write_token(&token)?;
        self.store.flush()?;

        debug!(id = token.id(), name = token.name(), "registry insert");
        let pos = inner.tokens.len();
        inner.by_id.insert(token.id(), pos);
        inner.by_name.insert(token.name().to_string(), pos);
        inner.tokens.push(token);
        Ok(())
    }

    /// Remove the entry matching both `id` and `name`.
    ///
    /// A no-op when absent; when `id` and `name` belong to different
    /// records nothing is removed.
    pub fn remove(&self, id: u64, name: &str) -> Result<(), TokenError> {
        let mut inner = self.inner.lock().expect("registry lock");
        let pos = match inner.by_id.get(&id) {
            Some(&pos) if inner.tokens[pos].name() == name => pos,
            _ => return Ok(()),
        };

        self.store.erase_token(id)?;
        debug!(id, name, "registry remove");
        inner.tokens.remove(pos);
        inner.reindex();
        Ok(())
    }

    /// A copy of all entries in insertion order.
    pub fn snapshot(&self) -> Vec<Token> {
        self.inner.lock().expect("registry lock").tokens.clone()
    }

    /// Number of entries.
    pub fn size(&self) -> u64 {
        self.inner.lock().expect("registry lock").tokens.len() as u64
    }

    /// The smallest identifier above [`ISSUANCE_ID_BEGIN`] that is
    /// neither registered nor claimed by an unconfirmed issuance.
    ///
    /// Ascending scan, so two nodes with the same registry and mempool
    /// agree on the result.
    pub fn next_identifier(&self, mempool: &dyn MempoolAccess) -> u64 {
        let mut id = ISSUANCE_ID_BEGIN;
        loop {
            id += 1;
            if self.contains_id(id) {
                continue;
            }
            if is_identifier_in_mempool(mempool, id) {
                continue;
            }
            return id;
        }
    }

    /// Persist every in-memory entry. Returns the count written.
    pub fn flush(&self) -> Result<u64, TokenError> {
        let snapshot = self.snapshot();
        self.store.save_known_issuances(&snapshot)
    }

    /// Clear both the in-memory set and the persisted records.
    pub fn reset(&self) -> Result<(), TokenError> {
        let mut inner = self.inner.lock().expect("registry lock");
        inner.tokens.clear();
        inner.by_id.clear();
        inner.by_name.clear();
        drop(inner);
        self.store.wipe()
    }
}
