//! Reference to a specific transaction output.

use std::fmt;

use serde::{Deserialize, Serialize};

use chroma_primitives::Hash;

/// A `(transaction, output index)` pair identifying one output.
///
/// The UTXO view, mempool, and wallet all key on this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Hash of the transaction holding the output.
    pub txid: Hash,
    /// Index of the output within that transaction.
    pub vout: u32,
}

impl OutPoint {
    /// Create an outpoint.
    pub fn new(txid: Hash, vout: u32) -> Self {
        OutPoint { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}
