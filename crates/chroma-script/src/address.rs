//! P2PKH address handling.
//!
//! Base58Check encoding of a 20-byte public key hash with a network
//! version byte and a SHA-256d checksum.

use std::fmt;

use chroma_primitives::hash::{hash160, sha256d};

use crate::ScriptError;

/// Mainnet P2PKH version byte (addresses start with 'C').
const MAINNET_P2PKH: u8 = 0x1c;
/// Testnet P2PKH version byte.
const TESTNET_P2PKH: u8 = 0x6f;

/// Network discriminator for address prefixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Network {
    /// Production chain.
    Mainnet,
    /// Test chain.
    Testnet,
}

/// A P2PKH address: a 20-byte public key hash plus its network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address {
    /// The Base58Check string form.
    pub address_string: String,
    /// The 20-byte hash160 of the public key.
    pub public_key_hash: [u8; 20],
    /// The network the version byte encodes.
    pub network: Network,
}

impl Address {
    /// Parse a Base58Check address string, validating length, checksum,
    /// and version byte.
    pub fn from_string(addr: &str) -> Result<Self, ScriptError> {
        let decoded = bs58::decode(addr)
            .into_vec()
            .map_err(|_| ScriptError::InvalidAddress(format!("bad char in '{}'", addr)))?;

        if decoded.len() != 25 {
            return Err(ScriptError::InvalidAddressLength(addr.to_string()));
        }

        let checksum = sha256d(&decoded[..21]);
        if decoded[21..25] != checksum[..4] {
            return Err(ScriptError::ChecksumFailed);
        }

        let network = match decoded[0] {
            MAINNET_P2PKH => Network::Mainnet,
            TESTNET_P2PKH => Network::Testnet,
            _ => return Err(ScriptError::UnsupportedAddress(addr.to_string())),
        };

        let mut pkh = [0u8; 20];
        pkh.copy_from_slice(&decoded[1..21]);

        Ok(Address {
            address_string: addr.to_string(),
            public_key_hash: pkh,
            network,
        })
    }

    /// Build an address from a 20-byte public key hash.
    pub fn from_public_key_hash(hash: &[u8; 20], network: Network) -> Self {
        let version = match network {
            Network::Mainnet => MAINNET_P2PKH,
            Network::Testnet => TESTNET_P2PKH,
        };

        let mut payload = Vec::with_capacity(25);
        payload.push(version);
        payload.extend_from_slice(hash);
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);

        Address {
            address_string: bs58::encode(&payload).into_string(),
            public_key_hash: *hash,
            network,
        }
    }

    /// Build an address by hashing a SEC1-encoded public key.
    pub fn from_public_key(pub_key: &[u8], network: Network) -> Self {
        Self::from_public_key_hash(&hash160(pub_key), network)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address_string)
    }
}
