//! Token name sanitization and validation.

use crate::token::{TOKENNAME_MAXLEN, TOKENNAME_MINLEN};
use crate::TokenError;

/// Keep only ASCII alphanumeric characters, preserving their order.
pub fn sanitize_name(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Validate a token name: length within bounds and untouched by the
/// sanitizer (byte-exact comparison).
pub fn check_token_name(name: &str) -> Result<(), TokenError> {
    if name.len() < TOKENNAME_MINLEN || name.len() > TOKENNAME_MAXLEN {
        return Err(TokenError::NameInvalid("tokenname-bounds-exceeded".into()));
    }

    let cleaned = sanitize_name(name);
    if cleaned.len() != name.len() {
        return Err(TokenError::NameInvalid(
            "tokenname-bounds-inconsistent".into(),
        ));
    }
    if cleaned != name {
        return Err(TokenError::NameInvalid(
            "tokenname-payload-inconsistent".into(),
        ));
    }

    Ok(())
}
