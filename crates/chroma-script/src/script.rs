//! The `Script` type: a raw byte vector with classification predicates
//! and push-building helpers.
//!
//! Token detection (`is_pay_to_token`, `is_checksum_data`) is a plain
//! byte-pattern match over the prefix and trailer; consensus code must
//! never depend on interpreter execution to recognize these outputs.

use std::fmt;

use crate::chunk::{decode_script, push_data_prefix, ScriptChunk};
use crate::opcodes::*;
use crate::ScriptError;

/// Fewest bytes a token output script can occupy: marker, version, type,
/// one identifier byte with its length, a three-character name with its
/// length, four drops, and at least one owner byte.
const TOKEN_SCRIPT_MIN_LEN: usize = 14;

/// Exact length of a checksum-data output script.
const CHECKSUM_SCRIPT_LEN: usize = 28;

/// A chain script, represented as a byte-vector newtype.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Script(Vec<u8>);

impl Script {
    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes =
            hex::decode(hex_str).map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Encode the script as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Borrow the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The script length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if the script has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    // -----------------------------------------------------------------------
    // Classification
    // -----------------------------------------------------------------------

    /// Check for the Pay-to-Public-Key-Hash pattern:
    /// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`.
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check for a data output (OP_RETURN or OP_FALSE OP_RETURN prefix).
    pub fn is_data(&self) -> bool {
        let b = &self.0;
        (!b.is_empty() && b[0] == OP_RETURN)
            || (b.len() > 1 && b[0] == OP_FALSE && b[1] == OP_RETURN)
    }

    /// Check for the token output pattern:
    ///
    /// `OP_TOKEN <version> <type> <push id> <push name> OP_DROP x4 <owner>`
    ///
    /// where version and type are small-integer opcodes, the identifier
    /// push is 1-8 bytes, and the name push is 3-12 bytes. The owner
    /// portion is any non-empty byte sequence after the drops.
    pub fn is_pay_to_token(&self) -> bool {
        let b = &self.0;
        if b.len() < TOKEN_SCRIPT_MIN_LEN || b[0] != OP_TOKEN {
            return false;
        }
        if !is_small_int_op(b[1]) || !is_small_int_op(b[2]) {
            return false;
        }
        let idlen = b[3] as usize;
        if !(1..=8).contains(&idlen) {
            return false;
        }
        let name_at = 4 + idlen;
        if name_at >= b.len() {
            return false;
        }
        let namelen = b[name_at] as usize;
        if !(3..=12).contains(&namelen) {
            return false;
        }
        let drops_at = name_at + 1 + namelen;
        // Four drops plus at least one byte of owner script must follow.
        if drops_at + 4 >= b.len() {
            return false;
        }
        b[drops_at..drops_at + 4].iter().all(|&op| op == OP_DROP)
    }

    /// Check for the checksum-data output pattern:
    ///
    /// `OP_TOKEN OP_0 OP_DROP OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY
    /// OP_CHECKSIG`
    pub fn is_checksum_data(&self) -> bool {
        let b = &self.0;
        b.len() == CHECKSUM_SCRIPT_LEN
            && b[0] == OP_TOKEN
            && b[1] == OP_0
            && b[2] == OP_DROP
            && b[3] == OP_DUP
            && b[4] == OP_HASH160
            && b[5] == OP_DATA_20
            && b[26] == OP_EQUALVERIFY
            && b[27] == OP_CHECKSIG
    }

    // -----------------------------------------------------------------------
    // Extraction
    // -----------------------------------------------------------------------

    /// Extract the 20-byte public key hash from a P2PKH script.
    pub fn public_key_hash(&self) -> Result<[u8; 20], ScriptError> {
        if self.0.is_empty() {
            return Err(ScriptError::EmptyScript);
        }
        if !self.is_p2pkh() {
            return Err(ScriptError::NotP2pkh);
        }
        let mut pkh = [0u8; 20];
        pkh.copy_from_slice(&self.0[3..23]);
        Ok(pkh)
    }

    /// Parse the script into push/opcode chunks.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    // -----------------------------------------------------------------------
    // Building
    // -----------------------------------------------------------------------

    /// Append a data push with the minimal push prefix.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append a single raw opcode byte.
    pub fn append_opcode(&mut self, op: u8) {
        self.0.push(op);
    }

    /// Append another script's bytes verbatim.
    pub fn append_script(&mut self, other: &Script) {
        self.0.extend_from_slice(&other.0);
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
