//! Mempool admission guard.
//!
//! Layered on top of [`check_token`]: keeps unconfirmed token
//! transactions consistent with each other, not just with the chain.

use tracing::debug;

use chroma_primitives::Hash;
use chroma_transaction::Transaction;

use crate::chain::{BlockIndex, MempoolAccess, UtxoView};
use crate::node::TokenNode;
use crate::script::decode_token_script;
use crate::token::TokenType;
use crate::verify::check_token;
use crate::TokenError;

/// Admission check for a token transaction entering the pool.
///
/// Runs the validator in dry-run mode against a synthetic index one
/// above the current tip (the block the transaction would confirm in),
/// then enforces pool-local rules: no second unconfirmed issuance of the
/// same name, and no outpoint already spent by another pool entry.
pub fn accept_token_transaction(
    node: &TokenNode,
    tx: &Transaction,
    view: &dyn UtxoView,
) -> Result<(), TokenError> {
    let next = BlockIndex {
        height: node.chain.height() + 1,
        hash: Hash::default(),
    };
    check_token(node, tx, &next, view, true)?;

    let txid = tx.txid();

    // Names this transaction tries to issue.
    let mut candidate_names = Vec::new();
    for out in &tx.outputs {
        if !out.script_pubkey.is_pay_to_token() {
            continue;
        }
        if let Ok(decoded) = decode_token_script(&out.script_pubkey) {
            if decoded.token_type == TokenType::Issuance {
                candidate_names.push(decoded.name);
            }
        }
    }

    if !candidate_names.is_empty() {
        for entry in node.mempool.entries() {
            if entry.txid() == txid {
                continue;
            }
            for out in &entry.outputs {
                if !out.script_pubkey.is_pay_to_token() {
                    continue;
                }
                if let Ok(decoded) = decode_token_script(&out.script_pubkey) {
                    if decoded.token_type == TokenType::Issuance
                        && candidate_names.iter().any(|n| *n == decoded.name)
                    {
                        debug!(name = %decoded.name, "issuance name already pending");
                        return Err(TokenError::IssuanceExistsInMempool(decoded.name));
                    }
                }
            }
        }
    }

    // Two wallets racing on the same UTXO: first one in wins.
    for input in &tx.inputs {
        if node.mempool.spends_outpoint(&input.prevout) {
            debug!(outpoint = %input.prevout, "outpoint already spent in pool");
            return Err(TokenError::InputAlreadyUsedInMempool);
        }
    }

    Ok(())
}

/// True if any unconfirmed issuance output claims `id`.
pub fn is_identifier_in_mempool(mempool: &dyn MempoolAccess, id: u64) -> bool {
    for entry in mempool.entries() {
        if !entry.has_token_output() {
            continue;
        }
        for out in &entry.outputs {
            if !out.script_pubkey.is_pay_to_token() {
                continue;
            }
            if let Ok(decoded) = decode_token_script(&out.script_pubkey) {
                if decoded.token_type == TokenType::Issuance && decoded.id == id {
                    return true;
                }
            }
        }
    }
    false
}
