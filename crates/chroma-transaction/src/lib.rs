//! Chroma chain transactions.
//!
//! The `Transaction` type with its wire codec and id computation, the
//! BIP-143-style signature hash, and the P2PKH lock/unlock template used
//! by the wallet signing helper.

pub mod input;
pub mod outpoint;
pub mod output;
pub mod sighash;
pub mod template;
pub mod transaction;

mod error;
pub use error::TransactionError;
pub use input::TxIn;
pub use outpoint::OutPoint;
pub use output::TxOut;
pub use transaction::Transaction;
