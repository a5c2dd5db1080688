//! Per-transaction token validation.
//!
//! [`check_token`] is the single entry point used by mempool admission,
//! block connection, and the rescan indexer; the `only_check` flag is
//! the only difference between those contexts (dry-run versus commit).

use tracing::debug;

use chroma_primitives::Hash;
use chroma_script::Script;
use chroma_transaction::{Transaction, TxIn, TxOut};

use crate::chain::{BlockIndex, RemovalReason, UtxoView};
use crate::names::check_token_name;
use crate::node::TokenNode;
use crate::script::{decode_token_script, token_from_script};
use crate::token::{Token, TokenType, ISSUANCE_ID_BEGIN, TOKEN_IDRANGE, TOKEN_MINCONFS};
use crate::TokenError;

/// Decode a token script and apply the context-free rules: current
/// version, known type, valid name. Returns the token stamped with
/// `origin_tx`.
pub fn contextual_check_token(script: &Script, origin_tx: Hash) -> Result<Token, TokenError> {
    let token = token_from_script(script, origin_tx)?;
    check_token_name(token.name())?;
    Ok(token)
}

/// Validate one transaction against the token rules.
///
/// `tip` is the index of the block the transaction would confirm in:
/// block connection passes the connecting block, mempool admission a
/// synthetic index one above the current tip. With `only_check` the call
/// is a pure predicate; without it, accepted issuances are committed to
/// the registry and failures evict the transaction from the mempool.
pub fn check_token(
    node: &TokenNode,
    tx: &Transaction,
    tip: &BlockIndex,
    view: &dyn UtxoView,
    only_check: bool,
) -> Result<(), TokenError> {
    if tip.height < node.params.token_activation_height {
        return Err(TokenError::NotActiveYet);
    }

    let txid = tx.txid();

    // Every input must be buried at least TOKEN_MINCONFS deep relative
    // to the confirming block.
    for input in &tx.inputs {
        let coin = view
            .access_coin(&input.prevout)
            .ok_or(TokenError::InsufficientConfirms)?;
        let confirmations = tip.height - coin.height;
        if confirmations < TOKEN_MINCONFS {
            debug!(outpoint = %input.prevout, confirmations, "input below minimum confirmations");
            return Err(TokenError::InsufficientConfirms);
        }
    }

    // At most one issuance output per transaction.
    let mut issuance_total = 0;
    for out in &tx.outputs {
        if !out.script_pubkey.is_pay_to_token() {
            continue;
        }
        if let Ok(decoded) = decode_token_script(&out.script_pubkey) {
            if decoded.token_type == TokenType::Issuance {
                issuance_total += 1;
            }
        }
    }
    if issuance_total > 1 {
        return Err(TokenError::MultipleIssuances);
    }

    // Per-output rules and per-input linkage.
    for out in &tx.outputs {
        if !out.script_pubkey.is_pay_to_token() {
            continue;
        }
        let token = contextual_check_token(&out.script_pubkey, txid)?;

        match token.token_type() {
            TokenType::Issuance => {
                if let Err(err) = check_token_issuance(node, &token, only_check) {
                    if !only_check {
                        node.mempool.remove_recursive(&txid, RemovalReason::Conflict);
                    }
                    return Err(err);
                }
                // An issuance is funded from ordinary coins only.
                for input in &tx.inputs {
                    let prev_out = fetch_prevout(node, input)?;
                    if prev_out.script_pubkey.is_pay_to_token() {
                        return Err(TokenError::IssuancePrevoutNotStandard);
                    }
                }
            }
            TokenType::Transfer => {
                // Every input must chain to a token of the claimed pair.
                for input in &tx.inputs {
                    let prev_out = fetch_prevout(node, input)?;
                    if !prev_out.script_pubkey.is_pay_to_token() {
                        return Err(TokenError::TransferPrevoutInvalid);
                    }
                    let prev_token =
                        contextual_check_token(&prev_out.script_pubkey, input.prevout.txid)?;
                    if prev_token.name() != token.name() || prev_token.id() != token.id() {
                        debug!(
                            claimed_id = token.id(),
                            claimed_name = token.name(),
                            prev_id = prev_token.id(),
                            prev_name = prev_token.name(),
                            "transfer does not match its previous token"
                        );
                        return Err(TokenError::PrevTokenMismatch);
                    }
                }
            }
        }
    }

    Ok(())
}

/// The issuance-specific rules for one decoded issuance token.
///
/// Registry entries with a different origin must not collide on name or
/// identifier; an entry with the same origin means this block is being
/// re-processed and the issuance is simply already known. The identifier
/// must fall inside the rate-limited range. Without `only_check`, a new
/// issuance is inserted into the registry.
pub fn check_token_issuance(
    node: &TokenNode,
    token: &Token,
    only_check: bool,
) -> Result<(), TokenError> {
    let mut already_seen = false;
    for issued in node.registry.snapshot() {
        if issued.origin_tx() != token.origin_tx() {
            if issued.name() == token.name() {
                return Err(TokenError::NameExists(token.name().to_string()));
            }
            if issued.id() == token.id() {
                return Err(TokenError::IdExists(token.id()));
            }
        } else {
            already_seen = true;
        }
    }

    let ceiling = (node.registry.size() + ISSUANCE_ID_BEGIN) * TOKEN_IDRANGE;
    if token.id() < ISSUANCE_ID_BEGIN || token.id() > ceiling {
        return Err(TokenError::IdOutOfRange(token.id()));
    }

    if !only_check && !already_seen {
        node.registry.insert(token.clone())?;
    }
    Ok(())
}

/// The previous output an input spends, via the chain's transaction
/// fetch.
fn fetch_prevout(node: &TokenNode, input: &TxIn) -> Result<TxOut, TokenError> {
    let (prev_tx, _block_hash) = node
        .chain
        .get_transaction(&input.prevout.txid)
        .ok_or(TokenError::PrevTxMissing(input.prevout.txid))?;
    prev_tx
        .outputs
        .get(input.prevout.vout as usize)
        .cloned()
        .ok_or(TokenError::PrevTxMissing(input.prevout.txid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use crate::token::TOKEN_CURRENT_VERSION;

    /// A valid issuance passes in both modes, and only the committing
    /// mode mutates the registry.
    #[test]
    fn test_issuance_dry_run_vs_commit() {
        let h = Harness::new();
        let funding = h.add_funding_coin(1000, 1);
        let tx = h.issuance_tx(&[funding], 17, "FOO", 100);
        let tip = h.tip_at(3);

        check_token(&h.node, &tx, &tip, &h.view, true).expect("dry run passes");
        assert_eq!(h.node.registry.size(), 0);

        check_token(&h.node, &tx, &tip, &h.view, false).expect("commit passes");
        assert_eq!(h.node.registry.size(), 1);
        let token = h.node.registry.lookup_by_name("FOO").expect("registered");
        assert_eq!(token.id(), 17);
        assert_eq!(token.version(), TOKEN_CURRENT_VERSION);
        assert_eq!(token.origin_tx(), tx.txid());
    }

    /// Dry-run calls are repeatable with identical results.
    #[test]
    fn test_only_check_referentially_transparent() {
        let h = Harness::new();
        let funding = h.add_funding_coin(1000, 1);
        let tx = h.issuance_tx(&[funding], 17, "FOO", 100);
        let tip = h.tip_at(3);

        for _ in 0..3 {
            check_token(&h.node, &tx, &tip, &h.view, true).expect("passes");
            assert_eq!(h.node.registry.size(), 0);
        }
    }

    /// Re-processing a committed issuance is idempotent.
    #[test]
    fn test_issuance_replay_idempotent() {
        let h = Harness::new();
        let funding = h.add_funding_coin(1000, 1);
        let tx = h.issuance_tx(&[funding], 17, "FOO", 100);
        let tip = h.tip_at(3);

        check_token(&h.node, &tx, &tip, &h.view, false).expect("first commit");
        check_token(&h.node, &tx, &tip, &h.view, false).expect("replay commit");
        assert_eq!(h.node.registry.size(), 1);
    }

    /// A duplicate name from a different origin fails and, in commit
    /// mode, evicts the transaction from the mempool.
    #[test]
    fn test_duplicate_name_rejected() {
        let h = Harness::new();
        let f1 = h.add_funding_coin(1000, 1);
        let first = h.issuance_tx(&[f1], 17, "FOO", 100);
        let tip = h.tip_at(3);
        check_token(&h.node, &first, &tip, &h.view, false).unwrap();

        let f2 = h.add_funding_coin(1000, 1);
        let second = h.issuance_tx(&[f2], 18, "FOO", 50);
        assert!(matches!(
            check_token(&h.node, &second, &tip, &h.view, true),
            Err(TokenError::NameExists(_))
        ));
        assert!(h.pool.removed().is_empty());

        assert!(matches!(
            check_token(&h.node, &second, &tip, &h.view, false),
            Err(TokenError::NameExists(_))
        ));
        assert_eq!(h.pool.removed(), vec![second.txid()]);
        assert_eq!(h.node.registry.size(), 1);
    }

    /// A duplicate identifier from a different origin fails.
    #[test]
    fn test_duplicate_id_rejected() {
        let h = Harness::new();
        let f1 = h.add_funding_coin(1000, 1);
        let first = h.issuance_tx(&[f1], 17, "FOO", 100);
        let tip = h.tip_at(3);
        check_token(&h.node, &first, &tip, &h.view, false).unwrap();

        let f2 = h.add_funding_coin(1000, 1);
        let second = h.issuance_tx(&[f2], 17, "BAR", 50);
        assert!(matches!(
            check_token(&h.node, &second, &tip, &h.view, true),
            Err(TokenError::IdExists(17))
        ));
    }

    /// Identifiers outside the rate-limited range are rejected.
    #[test]
    fn test_id_out_of_range() {
        let h = Harness::new();
        let funding = h.add_funding_coin(1000, 1);
        // Empty registry: ceiling is (0 + 16) * 16 = 256.
        let tx = h.issuance_tx(&[funding], 257, "FOO", 100);
        let tip = h.tip_at(3);
        assert!(matches!(
            check_token(&h.node, &tx, &tip, &h.view, true),
            Err(TokenError::IdOutOfRange(257))
        ));

        let f2 = h.add_funding_coin(1000, 1);
        let low = h.issuance_tx(&[f2], 15, "BAR", 100);
        assert!(matches!(
            check_token(&h.node, &low, &tip, &h.view, true),
            Err(TokenError::IdOutOfRange(15))
        ));

        let f3 = h.add_funding_coin(1000, 1);
        let edge = h.issuance_tx(&[f3], 256, "BAZ", 100);
        check_token(&h.node, &edge, &tip, &h.view, true).expect("ceiling is inclusive");
    }

    /// Two issuance outputs in one transaction are rejected.
    #[test]
    fn test_multiple_issuances() {
        let h = Harness::new();
        let funding = h.add_funding_coin(1000, 1);
        let mut tx = h.issuance_tx(&[funding], 17, "FOO", 100);
        let extra = h.issuance_output(18, "BAR", 50);
        tx.outputs.push(extra);
        let tip = h.tip_at(3);
        assert!(matches!(
            check_token(&h.node, &tx, &tip, &h.view, true),
            Err(TokenError::MultipleIssuances)
        ));
    }

    /// An issuance spending a token-colored input is rejected.
    #[test]
    fn test_issuance_token_prevout() {
        let h = Harness::new();
        let funding = h.add_funding_coin(1000, 1);
        let mint = h.issuance_tx(&[funding], 17, "FOO", 100);
        let tip = h.tip_at(3);
        check_token(&h.node, &mint, &tip, &h.view, false).unwrap();
        let colored = h.confirm_tx(&mint, 2);

        let tx = h.issuance_tx(&[colored[0]], 18, "BAR", 50);
        assert!(matches!(
            check_token(&h.node, &tx, &tip, &h.view, true),
            Err(TokenError::IssuancePrevoutNotStandard)
        ));
    }

    /// A transfer chaining to a matching token prevout passes.
    #[test]
    fn test_transfer_valid() {
        let h = Harness::new();
        let funding = h.add_funding_coin(1000, 1);
        let mint = h.issuance_tx(&[funding], 17, "FOO", 100);
        let tip = h.tip_at(3);
        check_token(&h.node, &mint, &tip, &h.view, false).unwrap();
        let colored = h.confirm_tx(&mint, 2);

        let transfer = h.transfer_tx(&[colored[0]], 17, "FOO", &[30, 70]);
        check_token(&h.node, &transfer, &tip, &h.view, true).expect("transfer passes");
    }

    /// A transfer spending a plain coin is rejected.
    #[test]
    fn test_transfer_plain_prevout() {
        let h = Harness::new();
        let funding = h.add_funding_coin(1000, 1);
        let tx = h.transfer_tx(&[funding], 17, "FOO", &[100]);
        let tip = h.tip_at(3);
        assert!(matches!(
            check_token(&h.node, &tx, &tip, &h.view, true),
            Err(TokenError::TransferPrevoutInvalid)
        ));
    }

    /// A transfer claiming a different pair than its prevout is rejected.
    #[test]
    fn test_transfer_pair_mismatch() {
        let h = Harness::new();
        let funding = h.add_funding_coin(1000, 1);
        let mint = h.issuance_tx(&[funding], 17, "FOO", 100);
        let tip = h.tip_at(3);
        check_token(&h.node, &mint, &tip, &h.view, false).unwrap();
        let colored = h.confirm_tx(&mint, 2);

        let wrong_name = h.transfer_tx(&[colored[0]], 17, "BAR", &[100]);
        assert!(matches!(
            check_token(&h.node, &wrong_name, &tip, &h.view, true),
            Err(TokenError::PrevTokenMismatch)
        ));

        let wrong_id = h.transfer_tx(&[colored[0]], 18, "FOO", &[100]);
        assert!(matches!(
            check_token(&h.node, &wrong_id, &tip, &h.view, true),
            Err(TokenError::PrevTokenMismatch)
        ));
    }

    /// Inputs without enough confirmations are rejected.
    #[test]
    fn test_insufficient_confirms() {
        let h = Harness::new();
        let funding = h.add_funding_coin(1000, 3);
        let tx = h.issuance_tx(&[funding], 17, "FOO", 100);
        // Confirming block is height 3, coin height 3: zero confirmations.
        let tip = h.tip_at(3);
        assert!(matches!(
            check_token(&h.node, &tx, &tip, &h.view, true),
            Err(TokenError::InsufficientConfirms)
        ));
        // One block deeper it passes.
        let tip = h.tip_at(4);
        check_token(&h.node, &tx, &tip, &h.view, true).expect("one confirmation");
    }

    /// An unknown coin counts as unconfirmed.
    #[test]
    fn test_missing_coin() {
        let h = Harness::new();
        let phantom = h.phantom_outpoint();
        let tx = h.issuance_tx(&[phantom], 17, "FOO", 100);
        let tip = h.tip_at(3);
        assert!(matches!(
            check_token(&h.node, &tx, &tip, &h.view, true),
            Err(TokenError::InsufficientConfirms)
        ));
    }

    /// A missing previous transaction surfaces in the linkage step.
    #[test]
    fn test_prev_tx_missing() {
        let h = Harness::new();
        // Coin exists in the view but its transaction is unknown to the
        // chain fetcher.
        let orphan = h.add_coin_without_tx(1000, 1);
        let tx = h.issuance_tx(&[orphan], 17, "FOO", 100);
        let tip = h.tip_at(3);
        assert!(matches!(
            check_token(&h.node, &tx, &tip, &h.view, true),
            Err(TokenError::PrevTxMissing(_))
        ));
    }

    /// Below the activation height everything is rejected.
    #[test]
    fn test_not_active_yet() {
        let h = Harness::with_activation(100);
        let funding = h.add_funding_coin(1000, 1);
        let tx = h.issuance_tx(&[funding], 17, "FOO", 100);
        let tip = h.tip_at(3);
        assert!(matches!(
            check_token(&h.node, &tx, &tip, &h.view, true),
            Err(TokenError::NotActiveYet)
        ));
    }

    /// A malformed name inside an otherwise valid script is rejected.
    #[test]
    fn test_invalid_name_rejected() {
        let h = Harness::new();
        let funding = h.add_funding_coin(1000, 1);
        // "A B" survives the length gate but not the sanitizer.
        let tx = h.issuance_tx(&[funding], 17, "A B", 100);
        let tip = h.tip_at(3);
        assert!(matches!(
            check_token(&h.node, &tx, &tip, &h.view, true),
            Err(TokenError::NameInvalid(_))
        ));
    }
}
