//! secp256k1 public key.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::VerifyingKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::ec::signature::EcdsaSig;
use crate::PrimitivesError;

/// A secp256k1 public key used for signature verification and address
/// derivation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    inner: VerifyingKey,
}

impl PublicKey {
    /// Parse a SEC1-encoded public key (33-byte compressed or 65-byte
    /// uncompressed).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let inner = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
        Ok(PublicKey { inner })
    }

    /// Parse a hex-encoded SEC1 public key.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes =
            hex::decode(hex_str).map_err(|e| PrimitivesError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// The 33-byte compressed SEC1 encoding.
    pub fn to_compressed(&self) -> Vec<u8> {
        self.inner.to_encoded_point(true).as_bytes().to_vec()
    }

    /// Verify an ECDSA signature over a 32-byte prehashed message.
    pub fn verify(&self, hash: &[u8; 32], sig: &EcdsaSig) -> bool {
        self.inner.verify_prehash(hash, sig.as_k256()).is_ok()
    }

    pub(crate) fn from_verifying_key(inner: VerifyingKey) -> Self {
        PublicKey { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A compressed key parses and re-encodes identically.
    #[test]
    fn test_compressed_roundtrip() {
        let hex_key = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
        let key = PublicKey::from_hex(hex_key).expect("valid key");
        assert_eq!(hex::encode(key.to_compressed()), hex_key);
    }

    /// Garbage bytes are rejected.
    #[test]
    fn test_from_bytes_invalid() {
        assert!(PublicKey::from_bytes(&[0u8; 33]).is_err());
        assert!(PublicKey::from_bytes(b"short").is_err());
    }
}
