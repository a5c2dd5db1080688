//! Hash function primitives.
//!
//! SHA-256, double SHA-256, RIPEMD-160, and Hash160 as used throughout the
//! chroma protocol for transaction ids, addresses, and content digests.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Compute SHA-256 of the input data.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute double SHA-256 (SHA-256 applied twice).
///
/// The standard hash for transaction ids, block hashes, and Base58Check
/// checksums.
pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256(&sha256(data))
}

/// Compute RIPEMD-160 of the input data.
pub fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    let digest = hasher.finalize();
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest);
    out
}

/// Compute Hash160: RIPEMD-160(SHA-256(data)).
///
/// Used to derive public key hashes for addresses and owner scripts.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    ripemd160(&sha256(data))
}
