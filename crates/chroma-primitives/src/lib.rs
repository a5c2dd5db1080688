//! Chroma chain primitives: hash functions, the 32-byte chain hash type,
//! wire (de)serialization helpers, and secp256k1 key material.
//!
//! Everything in this crate is deterministic and allocation-light; the
//! higher layers (script, transaction, token) build on these types.

pub mod chainhash;
pub mod ec;
pub mod hash;
pub mod wire;

mod error;
pub use chainhash::Hash;
pub use error::PrimitivesError;
