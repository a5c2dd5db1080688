//! External chain collaborators.
//!
//! The token subsystem never owns the chain state, UTXO set, or mempool;
//! it consumes them through the traits here. Node integration provides
//! the real implementations; the test suites provide in-memory ones.

use chroma_primitives::Hash;
use chroma_transaction::{OutPoint, Transaction, TxOut};

/// Consensus parameters the token layer cares about.
#[derive(Clone, Debug)]
pub struct ChainParams {
    /// Height at which token rules activate; the subsystem is inert below.
    pub token_activation_height: i32,
}

/// Position of a block on the active chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockIndex {
    /// Block height.
    pub height: i32,
    /// Block hash.
    pub hash: Hash,
}

/// A block's transactions as read from disk.
#[derive(Clone, Debug)]
pub struct Block {
    /// Block hash.
    pub hash: Hash,
    /// Height the block connects at.
    pub height: i32,
    /// Transactions in block order.
    pub txs: Vec<Transaction>,
}

/// An unspent output as seen by the UTXO view.
#[derive(Clone, Debug)]
pub struct Coin {
    /// The output itself.
    pub output: TxOut,
    /// Height of the block that created it.
    pub height: i32,
}

/// Read access to the active chain.
pub trait ChainAccess: Send + Sync {
    /// Fetch a transaction and the hash of its confirming block.
    fn get_transaction(&self, txid: &Hash) -> Option<(Transaction, Hash)>;

    /// Read the block at `height` from disk.
    fn read_block_from_disk(&self, height: i32) -> Option<Block>;

    /// The index entry for the block at `height`.
    fn block_index(&self, height: i32) -> Option<BlockIndex>;

    /// Current tip height.
    fn height(&self) -> i32;

    /// True while the node is catching up with the network.
    fn is_initial_block_download(&self) -> bool;
}

/// Read access to the UTXO set.
pub trait UtxoView: Send + Sync {
    /// Look up an unspent coin; `None` if unknown or already spent.
    fn access_coin(&self, outpoint: &OutPoint) -> Option<Coin>;
}

/// Why a transaction is being evicted from the mempool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalReason {
    /// The transaction conflicts with validated chain state.
    Conflict,
}

/// Access to the unconfirmed transaction pool.
pub trait MempoolAccess: Send + Sync {
    /// Snapshot of all pool transactions.
    fn entries(&self) -> Vec<Transaction>;

    /// True if the pool holds a transaction with this id.
    fn exists(&self, txid: &Hash) -> bool;

    /// True if any pool transaction spends this outpoint.
    fn spends_outpoint(&self, outpoint: &OutPoint) -> bool;

    /// Evict a transaction and its descendants.
    fn remove_recursive(&self, txid: &Hash, reason: RemovalReason);
}
