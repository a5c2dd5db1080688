//! The token value object and protocol constants.

use chroma_primitives::wire::{WireReader, WireWriter};
use chroma_primitives::Hash;

use crate::TokenError;

/// Current (and only) token script version.
pub const TOKEN_CURRENT_VERSION: u8 = 0x01;
/// First identifier reserved for issuances; assignment starts just above.
pub const ISSUANCE_ID_BEGIN: u64 = 16;
/// Growth factor bounding how far ahead of the registry an identifier may
/// reach.
pub const TOKEN_IDRANGE: u64 = 16;
/// Minimum confirmations every input of a token transaction must carry.
pub const TOKEN_MINCONFS: i32 = 1;
/// Shortest permitted token name.
pub const TOKENNAME_MINLEN: usize = 3;
/// Longest permitted token name.
pub const TOKENNAME_MAXLEN: usize = 12;
/// Largest mintable token amount.
pub const TOKEN_VALUEMAX: u64 = i32::MAX as u64;
/// Consecutive missing identifiers tolerated while loading the registry.
pub const TOKEN_MAX_SKIP: u64 = 1024;
/// Value carried by the checksum side-output of an issuance.
pub const CHECKSUM_OUTPUT_VALUE: u64 = 1000;

/// The two kinds of token output.
///
/// The wire carries these as small-integer opcodes; anything else fails
/// decoding, so no "uninitialized" state exists past the codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenType {
    /// First on-chain appearance of an `(identifier, name)` pair.
    Issuance,
    /// Movement of an already-issued token.
    Transfer,
}

impl TokenType {
    /// Map a wire type value to a token type.
    pub fn from_wire(raw: u16) -> Option<Self> {
        match raw {
            1 => Some(TokenType::Issuance),
            2 => Some(TokenType::Transfer),
            _ => None,
        }
    }

    /// The wire type value.
    pub fn to_wire(self) -> u16 {
        match self {
            TokenType::Issuance => 1,
            TokenType::Transfer => 2,
        }
    }
}

/// A token record: the metadata of one issued (or in-flight) token.
///
/// Immutable once committed to the registry; transfers reference it by
/// identifier only.
#[derive(Clone, Debug)]
pub struct Token {
    version: u8,
    token_type: TokenType,
    id: u64,
    name: String,
    origin_tx: Hash,
}

impl Token {
    /// Create a token record at the current version.
    pub fn new(token_type: TokenType, id: u64, name: String, origin_tx: Hash) -> Self {
        Token {
            version: TOKEN_CURRENT_VERSION,
            token_type,
            id,
            name,
            origin_tx,
        }
    }

    /// The script version this token was decoded from.
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Issuance or transfer.
    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    /// The 64-bit identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The token name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hash of the transaction that first carried this token.
    pub fn origin_tx(&self) -> Hash {
        self.origin_tx
    }

    /// Record the carrying transaction once it is known.
    pub fn set_origin_tx(&mut self, origin_tx: Hash) {
        self.origin_tx = origin_tx;
    }

    /// Canonical serialization: version, type, identifier, name,
    /// origin transaction, in order.
    pub fn serialize(&self) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(64);
        writer.write_u8(self.version);
        writer.write_u16_le(self.token_type.to_wire());
        writer.write_u64_le(self.id);
        writer.write_string(&self.name);
        writer.write_bytes(self.origin_tx.as_bytes());
        writer.into_bytes()
    }

    /// Inverse of [`serialize`](Self::serialize).
    pub fn deserialize(bytes: &[u8]) -> Result<Self, TokenError> {
        let mut reader = WireReader::new(bytes);
        let version = reader
            .read_u8()
            .map_err(|e| TokenError::ReadFailed(e.to_string()))?;
        let raw_type = reader
            .read_u16_le()
            .map_err(|e| TokenError::ReadFailed(e.to_string()))?;
        let token_type = TokenType::from_wire(raw_type).ok_or(TokenError::TypeInvalid(raw_type))?;
        let id = reader
            .read_u64_le()
            .map_err(|e| TokenError::ReadFailed(e.to_string()))?;
        let name = reader
            .read_string()
            .map_err(|e| TokenError::ReadFailed(e.to_string()))?;
        let origin_bytes = reader
            .read_bytes(32)
            .map_err(|e| TokenError::ReadFailed(e.to_string()))?;
        let origin_tx =
            Hash::from_bytes(origin_bytes).map_err(|e| TokenError::ReadFailed(e.to_string()))?;

        Ok(Token {
            version,
            token_type,
            id,
            name,
            origin_tx,
        })
    }
}

/// Tokens are the same record when identifier and name both match.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.name == other.name
    }
}

impl Eq for Token {}
