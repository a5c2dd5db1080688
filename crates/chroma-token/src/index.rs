//! Chain indexer: registry rebuild and undo.
//!
//! Rescans feed connected issuances into the registry through the same
//! validator used everywhere else, so live application and rebuild
//! produce identical registries for identical chain histories. The chain
//! lock is held by the caller for the duration of a rescan so the tip
//! cannot move underneath it.

use std::time::Instant;

use tracing::{debug, info, warn};

use crate::chain::{Block, UtxoView};
use crate::node::TokenNode;
use crate::script::decode_token_script;
use crate::token::TokenType;
use crate::verify::check_token;
use crate::TokenError;

/// Apply every token transaction from the activation height up to
/// `last_height` inclusive.
///
/// Safe to call repeatedly: re-processing a connected issuance is a
/// no-op. A shutdown request stops the scan between blocks, leaving all
/// fully processed heights applied.
///
/// `view` must resolve the inputs of historical transactions, including
/// coins the live UTXO set has since dropped; callers pass a
/// chain-backed view, not the bare tip view.
pub fn scan_for_token_metadata(
    node: &TokenNode,
    view: &dyn UtxoView,
    last_height: i32,
) -> Result<(), TokenError> {
    if last_height < node.params.token_activation_height {
        debug!("chain has not entered the token phase");
        return Ok(());
    }

    for height in node.params.token_activation_height..=last_height {
        if node.shutdown_requested() {
            info!(height, "token rescan stopped by shutdown request");
            return Ok(());
        }

        let index = node
            .chain
            .block_index(height)
            .ok_or_else(|| TokenError::ReadFailed(format!("no block index at {}", height)))?;
        let block = node
            .chain
            .read_block_from_disk(height)
            .ok_or_else(|| TokenError::ReadFailed(format!("no block at {}", height)))?;

        for tx in &block.txs {
            if !tx.has_token_output() {
                continue;
            }
            if let Err(err) = check_token(node, tx, &index, view, false) {
                warn!(height, txid = %tx.txid(), %err, "token rescan failed");
                return Err(err);
            }
        }
    }

    Ok(())
}

/// Rescan from activation to the current tip, logging the elapsed time.
pub fn sync_token_metadata(node: &TokenNode, view: &dyn UtxoView) -> Result<(), TokenError> {
    let start = Instant::now();
    scan_for_token_metadata(node, view, node.chain.height())?;
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "token index synced");
    Ok(())
}

/// Undo a disconnected block: drop its issuances from the registry.
///
/// Transfers need no action; the UTXO rollback removes their colored
/// outputs.
pub fn undo_block_tokens(node: &TokenNode, block: &Block) -> Result<(), TokenError> {
    for tx in &block.txs {
        for out in &tx.outputs {
            if !out.script_pubkey.is_pay_to_token() {
                continue;
            }
            if let Ok(decoded) = decode_token_script(&out.script_pubkey) {
                if decoded.token_type == TokenType::Issuance {
                    debug!(id = decoded.id, name = %decoded.name, "undoing issuance");
                    node.registry.remove(decoded.id, &decoded.name)?;
                }
            }
        }
    }
    Ok(())
}

/// Reset the registry and rebuild it from the chain.
pub fn rebuild_token_index(node: &TokenNode, view: &dyn UtxoView) -> Result<(), TokenError> {
    node.registry.reset()?;
    sync_token_metadata(node, view)
}
