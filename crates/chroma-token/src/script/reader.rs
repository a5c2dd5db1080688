//! Token script decoding.

use tracing::debug;

use chroma_primitives::Hash;
use chroma_script::opcodes::*;
use chroma_script::scriptnum::decode_scriptnum;
use chroma_script::Script;

use crate::token::{Token, TokenType, TOKEN_CURRENT_VERSION};
use crate::TokenError;

/// The fields parsed out of a token output script.
#[derive(Clone, Debug)]
pub struct DecodedToken {
    /// Script version byte.
    pub version: u8,
    /// Issuance or transfer.
    pub token_type: TokenType,
    /// The 64-bit identifier.
    pub id: u64,
    /// The token name, byte-exact as carried in the script.
    pub name: String,
    /// Everything after the four drops: the owner's locking script.
    pub owner_script: Script,
    /// The owner public key hash when the owner portion ends in the
    /// standard P2PKH template; decoding does not require it to.
    pub owner_key_hash: Option<[u8; 20]>,
}

/// Decode a token output script into its fields.
///
/// Fails with a specific error kind on the first violation; never returns
/// a partial result.
pub fn decode_token_script(script: &Script) -> Result<DecodedToken, TokenError> {
    if !script.is_pay_to_token() {
        return Err(TokenError::TokenScriptMalformed(
            "missing pay-to-token pattern".into(),
        ));
    }
    let b = script.as_bytes();
    debug!(script = %script, len = b.len(), "decoding token script");

    // Predicate guarantees structure and bounds; the cursor below only
    // interprets field contents.
    let version = small_int_value(b[1]).expect("predicate checked version opcode");
    if version != TOKEN_CURRENT_VERSION {
        return Err(TokenError::VersionUnsupported(version));
    }
    debug!(version, "version ok");

    let raw_type = small_int_value(b[2]).expect("predicate checked type opcode") as u16;
    let token_type = TokenType::from_wire(raw_type).ok_or(TokenError::TypeInvalid(raw_type))?;
    debug!(raw_type, "type ok");

    let idlen = b[3] as usize;
    let id = decode_scriptnum(&b[4..4 + idlen])
        .map_err(|e| TokenError::TokenScriptMalformed(e.to_string()))?;
    debug!(idlen, id, "identifier ok");

    let name_at = 4 + idlen;
    let namelen = b[name_at] as usize;
    let name_bytes = &b[name_at + 1..name_at + 1 + namelen];
    let name = String::from_utf8_lossy(name_bytes).into_owned();
    debug!(namelen, name = %name, "name ok");

    let owner_at = name_at + 1 + namelen + 4;
    let owner_script = Script::from_bytes(&b[owner_at..]);

    let owner_key_hash = owner_tail_key_hash(&owner_script);
    if let Some(pkh) = owner_key_hash {
        debug!(owner = %hex::encode(pkh), "owner key hash ok");
    }

    Ok(DecodedToken {
        version,
        token_type,
        id,
        name,
        owner_script,
        owner_key_hash,
    })
}

/// Extract the 20-byte digest from a checksum output script.
pub fn decode_checksum_script(script: &Script) -> Result<[u8; 20], TokenError> {
    if !script.is_checksum_data() {
        return Err(TokenError::ChecksumScriptMalformed);
    }
    let b = script.as_bytes();
    let mut digest = [0u8; 20];
    digest.copy_from_slice(&b[b.len() - 22..b.len() - 2]);
    Ok(digest)
}

/// Decode a token script into a [`Token`] record carrying `origin_tx`.
pub fn token_from_script(script: &Script, origin_tx: Hash) -> Result<Token, TokenError> {
    let decoded = decode_token_script(script)?;
    Ok(Token::new(
        decoded.token_type,
        decoded.id,
        decoded.name,
        origin_tx,
    ))
}

/// Pull just the identifier out of a token script, if it decodes.
pub fn token_id_from_script(script: &Script) -> Option<u64> {
    decode_token_script(script).ok().map(|d| d.id)
}

/// The key hash in the last 25 bytes, when they form a P2PKH template.
fn owner_tail_key_hash(owner_script: &Script) -> Option<[u8; 20]> {
    let b = owner_script.as_bytes();
    if b.len() < 25 {
        return None;
    }
    let tail = Script::from_bytes(&b[b.len() - 25..]);
    tail.public_key_hash().ok()
}
