//! ECDSA signature wrapper.

use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature as K256Signature, SigningKey};

use crate::PrimitivesError;

/// An ECDSA signature over secp256k1.
///
/// Always low-S normalized so the DER encoding passes the network's
/// standardness rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EcdsaSig {
    inner: K256Signature,
}

impl EcdsaSig {
    /// Sign a 32-byte prehashed message (RFC6979 deterministic nonce).
    pub(crate) fn sign(hash: &[u8; 32], key: &SigningKey) -> Result<Self, PrimitivesError> {
        let sig: K256Signature = key
            .sign_prehash(hash)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        let sig = sig.normalize_s().unwrap_or(sig);
        Ok(EcdsaSig { inner: sig })
    }

    /// Parse a DER-encoded signature.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let inner = K256Signature::from_der(bytes)
            .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
        Ok(EcdsaSig { inner })
    }

    /// Encode to DER.
    pub fn to_der(&self) -> Vec<u8> {
        self.inner.to_der().as_bytes().to_vec()
    }

    pub(crate) fn as_k256(&self) -> &K256Signature {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::PrivateKey;
    use crate::hash::sha256;

    /// DER encoding round-trips and still verifies.
    #[test]
    fn test_der_roundtrip() {
        let key = PrivateKey::new();
        let hash = sha256(b"payload");
        let sig = key.sign(&hash).expect("signing succeeds");
        let der = sig.to_der();
        assert_eq!(der[0], 0x30);
        let restored = EcdsaSig::from_der(&der).expect("valid DER");
        assert!(key.pub_key().verify(&hash, &restored));
    }

    /// Malformed DER is rejected.
    #[test]
    fn test_from_der_invalid() {
        assert!(EcdsaSig::from_der(&[]).is_err());
        assert!(EcdsaSig::from_der(&[0x30, 0x01, 0x02]).is_err());
    }

    /// Deterministic nonces: the same key and hash produce the same bytes.
    #[test]
    fn test_deterministic() {
        let key = PrivateKey::from_hex(
            "1111111111111111111111111111111111111111111111111111111111111111",
        )
        .unwrap();
        let hash = sha256(b"deterministic");
        let a = key.sign(&hash).unwrap().to_der();
        let b = key.sign(&hash).unwrap().to_der();
        assert_eq!(a, b);
    }
}
