//! Node-wide token context.
//!
//! `TokenNode` owns the issuance registry and holds handles to the
//! external collaborators; every core operation takes it by reference,
//! so there is no hidden global state.
//!
//! Lock order, outermost first: chain, mempool, wallet, registry. The
//! first three live behind the collaborator traits and are acquired by
//! their implementations; the registry mutex is internal and always
//! taken last, so no token operation can deadlock against node locks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::chain::{ChainAccess, ChainParams, MempoolAccess};
use crate::registry::IssuanceRegistry;
use crate::store::TokenStore;

/// The token subsystem's context value.
pub struct TokenNode {
    /// Consensus parameters.
    pub params: ChainParams,
    /// The authoritative issuance registry.
    pub registry: IssuanceRegistry,
    /// Active chain access.
    pub chain: Arc<dyn ChainAccess>,
    /// Unconfirmed transaction pool access.
    pub mempool: Arc<dyn MempoolAccess>,
    shutdown: AtomicBool,
}

impl TokenNode {
    /// Assemble the context. The key-value handle is injected here and
    /// nowhere else.
    pub fn new(
        params: ChainParams,
        store: TokenStore,
        chain: Arc<dyn ChainAccess>,
        mempool: Arc<dyn MempoolAccess>,
    ) -> Self {
        TokenNode {
            params,
            registry: IssuanceRegistry::new(store),
            chain,
            mempool,
            shutdown: AtomicBool::new(false),
        }
    }

    /// Ask long-running scans to stop at their next block boundary.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// True once shutdown has been requested.
    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
