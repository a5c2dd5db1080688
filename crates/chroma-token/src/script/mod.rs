//! Token and checksum output script codec.
//!
//! Builders emit the canonical byte layout; the reader walks raw bytes
//! with a bounds-checked cursor and never consults an interpreter. Any
//! divergence here is a chain split, so both directions are covered by
//! round-trip tests.

mod builder;
mod reader;

pub use builder::{build_checksum_script, build_token_script};
pub use reader::{
    decode_checksum_script, decode_token_script, token_from_script, token_id_from_script,
    DecodedToken,
};
