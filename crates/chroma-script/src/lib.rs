//! Chroma chain script handling.
//!
//! Provides the `Script` byte-vector type with classification predicates
//! (including the token and checksum-data patterns), the opcode table,
//! push-data chunk parsing, the minimal script-number codec used for token
//! identifiers, and Base58Check P2PKH addresses.
//!
//! The token predicates are pure byte-pattern matches; nothing in this
//! crate runs a script interpreter.

pub mod address;
pub mod chunk;
pub mod opcodes;
pub mod script;
pub mod scriptnum;

mod error;
pub use address::{Address, Network};
pub use chunk::ScriptChunk;
pub use error::ScriptError;
pub use script::Script;
