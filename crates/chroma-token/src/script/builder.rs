//! Token script construction.

use chroma_script::opcodes::*;
use chroma_script::scriptnum::encode_scriptnum;
use chroma_script::Script;

use crate::names::check_token_name;
use crate::token::TokenType;
use crate::TokenError;

/// Build a token output script:
///
/// `OP_TOKEN <version> <type> <push id> <push name> OP_DROP x4 <owner>`
///
/// The identifier is pushed in minimal script-number form; version and
/// type use the small-integer opcodes.
pub fn build_token_script(
    version: u8,
    token_type: TokenType,
    id: u64,
    name: &str,
    owner_script: &Script,
) -> Result<Script, TokenError> {
    let version_op =
        small_int_opcode(version).ok_or(TokenError::VersionUnsupported(version))?;
    let type_op = small_int_opcode(token_type.to_wire() as u8)
        .expect("token type wire values are 1 and 2");

    check_token_name(name)?;

    let id_bytes =
        encode_scriptnum(id).map_err(|e| TokenError::TokenScriptMalformed(e.to_string()))?;
    if id_bytes.is_empty() {
        return Err(TokenError::TokenScriptMalformed(
            "identifier encodes to zero bytes".into(),
        ));
    }

    let mut script = Script::new();
    script.append_opcode(OP_TOKEN);
    script.append_opcode(version_op);
    script.append_opcode(type_op);
    script
        .append_push_data(&id_bytes)
        .map_err(|e| TokenError::TokenScriptMalformed(e.to_string()))?;
    script
        .append_push_data(name.as_bytes())
        .map_err(|e| TokenError::TokenScriptMalformed(e.to_string()))?;
    for _ in 0..4 {
        script.append_opcode(OP_DROP);
    }
    script.append_script(owner_script);

    Ok(script)
}

/// Build a checksum output script carrying a 20-byte content digest:
///
/// `OP_TOKEN OP_0 OP_DROP OP_DUP OP_HASH160 <digest> OP_EQUALVERIFY
/// OP_CHECKSIG`
pub fn build_checksum_script(digest: &[u8; 20]) -> Script {
    let mut script = Script::new();
    script.append_opcode(OP_TOKEN);
    script.append_opcode(OP_0);
    script.append_opcode(OP_DROP);
    script.append_opcode(OP_DUP);
    script.append_opcode(OP_HASH160);
    script
        .append_push_data(digest)
        .expect("20 bytes always fits a direct push");
    script.append_opcode(OP_EQUALVERIFY);
    script.append_opcode(OP_CHECKSIG);
    script
}
