//! Backward history walk for a token UTXO.
//!
//! Traces from a transaction carrying a token output back to the
//! issuance that rooted it, hopping at each step to the input whose
//! prevout carries the matching token.

use chroma_primitives::Hash;

use crate::chain::ChainAccess;
use crate::script::decode_token_script;
use crate::token::TokenType;
use crate::TokenError;

/// Walk depth guard against malformed or cyclic references.
const MAX_HISTORY_DEPTH: usize = 10_000;

/// Trace `name` from `start_txid` back to its issuance.
///
/// Returns the transaction hashes along the way, most recent first and
/// the issuance last.
pub fn token_history(
    chain: &dyn ChainAccess,
    start_txid: &Hash,
    name: &str,
) -> Result<Vec<Hash>, TokenError> {
    let mut trail = Vec::new();
    let mut current = *start_txid;

    for _ in 0..MAX_HISTORY_DEPTH {
        let (tx, _block_hash) = chain
            .get_transaction(&current)
            .ok_or(TokenError::PrevTxMissing(current))?;
        trail.push(current);

        let is_issuance = tx.outputs.iter().any(|out| {
            out.script_pubkey.is_pay_to_token()
                && decode_token_script(&out.script_pubkey)
                    .map(|d| d.token_type == TokenType::Issuance && d.name == name)
                    .unwrap_or(false)
        });
        if is_issuance {
            return Ok(trail);
        }

        // Hop to the input that actually carries this token, not just
        // the first input.
        let mut next = None;
        for input in &tx.inputs {
            let (prev, _) = chain
                .get_transaction(&input.prevout.txid)
                .ok_or(TokenError::PrevTxMissing(input.prevout.txid))?;
            let Some(prev_out) = prev.outputs.get(input.prevout.vout as usize) else {
                continue;
            };
            if !prev_out.script_pubkey.is_pay_to_token() {
                continue;
            }
            if let Ok(decoded) = decode_token_script(&prev_out.script_pubkey) {
                if decoded.name == name {
                    next = Some(input.prevout.txid);
                    break;
                }
            }
        }

        match next {
            Some(txid) => current = txid,
            None => return Err(TokenError::PrevTokenMismatch),
        }
    }

    Err(TokenError::PrevTokenMismatch)
}
