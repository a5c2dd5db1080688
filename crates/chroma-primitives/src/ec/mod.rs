//! secp256k1 key material and ECDSA signatures.
//!
//! Thin wrappers over k256 providing the key and signature types the
//! wallet signing helper consumes. Signatures are low-S normalized and
//! exchanged in DER form, matching the network's standardness rules.

mod private_key;
mod public_key;
mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::EcdsaSig;
