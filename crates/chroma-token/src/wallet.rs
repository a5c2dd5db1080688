//! Wallet funding, assembly, and signing for token transactions.
//!
//! The wallet itself (keys, owned transactions, spent tracking) is an
//! external collaborator behind [`WalletAccess`]; this module selects
//! inputs that carry the right colored value, assembles mint and send
//! transactions, and signs them against a coin view layered over the
//! UTXO set and the mempool.

use std::collections::HashMap;

use tracing::debug;

use chroma_primitives::ec::{PrivateKey, PublicKey};
use chroma_primitives::hash::hash160;
use chroma_script::{Address, Script};
use chroma_transaction::template::p2pkh;
use chroma_transaction::{OutPoint, Transaction, TxIn, TxOut};

use crate::chain::{Coin, UtxoView};
use crate::names::check_token_name;
use crate::node::TokenNode;
use crate::script::{build_checksum_script, build_token_script, decode_token_script};
use crate::token::{TokenType, CHECKSUM_OUTPUT_VALUE, TOKEN_CURRENT_VERSION, TOKEN_MINCONFS};
use crate::verify::contextual_check_token;
use crate::TokenError;

/// Height marker for coins that only exist in the mempool.
const MEMPOOL_HEIGHT: i32 = i32::MAX;

/// A wallet-owned transaction with its confirmation status.
#[derive(Clone, Debug)]
pub struct WalletTx {
    /// The transaction.
    pub tx: Transaction,
    /// Height of the confirming block; `None` while unconfirmed.
    pub block_height: Option<i32>,
    /// Wallet-recorded acceptance time (unix seconds).
    pub time: u64,
}

/// The external wallet surface the token helpers consume.
pub trait WalletAccess: Send + Sync {
    /// All transactions the wallet tracks.
    fn owned_transactions(&self) -> Vec<WalletTx>;

    /// True if the wallet can spend this script.
    fn is_mine(&self, script: &Script) -> bool;

    /// True if the wallet has already spent this outpoint.
    fn is_spent(&self, outpoint: &OutPoint) -> bool;

    /// Reserve a fresh key from the keypool.
    fn reserve_key(&self) -> Option<PublicKey>;

    /// The private key for a public key hash, if the wallet holds it.
    fn signing_key(&self, pkh: &[u8; 20]) -> Option<PrivateKey>;

    /// Relay a finished transaction to the network.
    fn broadcast_transaction(&self, tx: &Transaction) -> Result<(), TokenError>;
}

/// Parameters for a mint.
pub struct MintRequest {
    /// Recipient of the issued tokens.
    pub owner: Address,
    /// Token name (already sanitized by the caller).
    pub name: String,
    /// Amount to mint.
    pub amount: u64,
    /// Optional 20-byte content digest for a checksum side-output.
    pub checksum: Option<[u8; 20]>,
}

/// Parameters for a transfer.
pub struct SendRequest {
    /// Recipient of the tokens.
    pub dest: Address,
    /// Token name.
    pub name: String,
    /// Amount to send.
    pub amount: u64,
}

/// Is this wallet output usable as a funding input at all?
///
/// Shared filters for both funding paths: the owning transaction must
/// not be waiting in the mempool, the output must be unspent, ours,
/// buried at least [`TOKEN_MINCONFS`] deep, not already spent by a pool
/// entry, and not a checksum output (its value is reserved).
fn spendable_coin(
    node: &TokenNode,
    wallet: &dyn WalletAccess,
    view: &dyn UtxoView,
    txid: chroma_primitives::Hash,
    vout: usize,
    output: &TxOut,
) -> Option<OutPoint> {
    let outpoint = OutPoint::new(txid, vout as u32);
    if node.mempool.exists(&txid) {
        return None;
    }
    let coin = view.access_coin(&outpoint)?;
    if !wallet.is_mine(&output.script_pubkey) {
        return None;
    }
    if wallet.is_spent(&outpoint) {
        return None;
    }
    let confirmations = node.chain.height() - coin.height + 1;
    if confirmations < TOKEN_MINCONFS {
        return None;
    }
    if node.mempool.spends_outpoint(&outpoint) {
        return None;
    }
    if output.script_pubkey.is_checksum_data() {
        return None;
    }
    Some(outpoint)
}

/// Select non-token wallet coins totalling at least `amount_min`.
///
/// Returns the chosen inputs and their combined value.
pub fn fund_mint_transaction(
    node: &TokenNode,
    wallet: &dyn WalletAccess,
    view: &dyn UtxoView,
    amount_min: u64,
) -> Result<(Vec<TxIn>, u64), TokenError> {
    let mut found = 0u64;
    let mut inputs = Vec::new();

    for wtx in wallet.owned_transactions() {
        let txid = wtx.tx.txid();
        for (vout, output) in wtx.tx.outputs.iter().enumerate() {
            let Some(outpoint) = spendable_coin(node, wallet, view, txid, vout, output) else {
                continue;
            };
            if output.script_pubkey.is_pay_to_token() {
                continue;
            }
            found += output.value;
            inputs.push(TxIn::new(outpoint));
            if found >= amount_min {
                return Ok((inputs, found));
            }
        }
    }

    Err(TokenError::InsufficientBalance)
}

/// Select token wallet coins of `name` whose colored values total at
/// least `amount_min`.
pub fn fund_token_transaction(
    node: &TokenNode,
    wallet: &dyn WalletAccess,
    view: &dyn UtxoView,
    name: &str,
    amount_min: u64,
) -> Result<(Vec<TxIn>, u64), TokenError> {
    let mut found = 0u64;
    let mut inputs = Vec::new();

    for wtx in wallet.owned_transactions() {
        let txid = wtx.tx.txid();
        for (vout, output) in wtx.tx.outputs.iter().enumerate() {
            let Some(outpoint) = spendable_coin(node, wallet, view, txid, vout, output) else {
                continue;
            };
            if !output.script_pubkey.is_pay_to_token() {
                continue;
            }
            let Ok(decoded) = decode_token_script(&output.script_pubkey) else {
                continue;
            };
            if decoded.name != name {
                continue;
            }
            found += output.value;
            inputs.push(TxIn::new(outpoint));
            if found >= amount_min {
                return Ok((inputs, found));
            }
        }
    }

    Err(TokenError::InsufficientBalance)
}

/// Build and sign an issuance transaction for `req`.
///
/// One issuance output at the requested amount, an optional checksum
/// output at [`CHECKSUM_OUTPUT_VALUE`], and a change output for any
/// surplus. Lock time is set to the current tip height.
pub fn create_mint_transaction(
    node: &TokenNode,
    wallet: &dyn WalletAccess,
    view: &dyn UtxoView,
    req: &MintRequest,
) -> Result<Transaction, TokenError> {
    check_token_name(&req.name)?;

    let id = node.registry.next_identifier(node.mempool.as_ref());
    let owner_script = p2pkh::lock(&req.owner);
    let issuance_script = build_token_script(
        TOKEN_CURRENT_VERSION,
        TokenType::Issuance,
        id,
        &req.name,
        &owner_script,
    )?;

    let required = req.amount
        + if req.checksum.is_some() {
            CHECKSUM_OUTPUT_VALUE
        } else {
            0
        };
    let (inputs, found) = fund_mint_transaction(node, wallet, view, required)?;
    debug!(id, name = %req.name, required, found, "funding mint");

    let mut tx = Transaction::new();
    tx.lock_time = node.chain.height() as u32;
    tx.inputs = inputs;
    tx.outputs.push(TxOut::new(req.amount, issuance_script));
    if let Some(digest) = &req.checksum {
        tx.outputs
            .push(TxOut::new(CHECKSUM_OUTPUT_VALUE, build_checksum_script(digest)));
    }

    let change = found - required;
    if change > 0 {
        let change_key = wallet.reserve_key().ok_or(TokenError::KeypoolExhausted)?;
        let change_script = p2pkh::lock_to_key_hash(&hash160(&change_key.to_compressed()));
        tx.outputs.push(TxOut::new(change, change_script));
    }

    sign_token_transaction(node, wallet, view, &mut tx)?;
    Ok(tx)
}

/// Build and sign a transfer transaction for `req`.
///
/// One transfer output at the requested amount and a colored change
/// output back to a fresh wallet key for the remainder.
pub fn create_send_transaction(
    node: &TokenNode,
    wallet: &dyn WalletAccess,
    view: &dyn UtxoView,
    req: &SendRequest,
) -> Result<Transaction, TokenError> {
    check_token_name(&req.name)?;

    let token = node
        .registry
        .lookup_by_name(&req.name)
        .ok_or(TokenError::InsufficientBalance)?;

    let (inputs, found) = fund_token_transaction(node, wallet, view, &req.name, req.amount)?;
    debug!(id = token.id(), name = %req.name, amount = req.amount, found, "funding send");

    let dest_script = build_token_script(
        TOKEN_CURRENT_VERSION,
        TokenType::Transfer,
        token.id(),
        &req.name,
        &p2pkh::lock(&req.dest),
    )?;

    let mut tx = Transaction::new();
    tx.lock_time = node.chain.height() as u32;
    tx.inputs = inputs;
    tx.outputs.push(TxOut::new(req.amount, dest_script));

    let change = found - req.amount;
    if change > 0 {
        let change_key = wallet.reserve_key().ok_or(TokenError::KeypoolExhausted)?;
        let change_script = build_token_script(
            TOKEN_CURRENT_VERSION,
            TokenType::Transfer,
            token.id(),
            &req.name,
            &p2pkh::lock_to_key_hash(&hash160(&change_key.to_compressed())),
        )?;
        tx.outputs.push(TxOut::new(change, change_script));
    }

    sign_token_transaction(node, wallet, view, &mut tx)?;
    Ok(tx)
}

/// Sign every input of `tx` and verify each signature.
///
/// Coins are resolved against the UTXO view first and the mempool
/// second, so freshly created but unconfirmed outputs can be signed.
/// Verification failures surface the verifier's message verbatim.
pub fn sign_token_transaction(
    node: &TokenNode,
    wallet: &dyn WalletAccess,
    view: &dyn UtxoView,
    tx: &mut Transaction,
) -> Result<(), TokenError> {
    for index in 0..tx.inputs.len() {
        let outpoint = tx.inputs[index].prevout;
        let coin = resolve_coin(node, view, &outpoint)
            .ok_or_else(|| TokenError::SigningFailed("input not found or already spent".into()))?;

        let pkh = p2pkh::spendable_key_hash(&coin.output.script_pubkey).ok_or_else(|| {
            TokenError::SigningFailed("previous script carries no key hash".into())
        })?;
        let key = wallet
            .signing_key(&pkh)
            .ok_or_else(|| TokenError::SigningFailed("no key for input".into()))?;

        let unlocker = p2pkh::unlock(key, None);
        let script_sig = unlocker
            .sign(tx, index, &coin.output.script_pubkey, coin.output.value)
            .map_err(|e| TokenError::SigningFailed(e.to_string()))?;
        tx.inputs[index].script_sig = Some(script_sig);

        p2pkh::verify_input(tx, index, &coin.output.script_pubkey, coin.output.value)
            .map_err(|e| TokenError::SigningFailed(e.to_string()))?;
    }
    Ok(())
}

/// A coin from the UTXO set, or from a pending mempool transaction.
fn resolve_coin(node: &TokenNode, view: &dyn UtxoView, outpoint: &OutPoint) -> Option<Coin> {
    if let Some(coin) = view.access_coin(outpoint) {
        return Some(coin);
    }
    for entry in node.mempool.entries() {
        if entry.txid() == outpoint.txid {
            return entry.outputs.get(outpoint.vout as usize).map(|output| Coin {
                output: output.clone(),
                height: MEMPOOL_HEIGHT,
            });
        }
    }
    None
}

/// Confirmed token balances by name, over unspent wallet outputs.
pub fn confirmed_token_balances(
    wallet: &dyn WalletAccess,
    filter: Option<&str>,
) -> HashMap<String, u64> {
    let mut balances = HashMap::new();

    for wtx in wallet.owned_transactions() {
        if wtx.block_height.is_none() {
            continue;
        }
        let txid = wtx.tx.txid();
        for (vout, output) in wtx.tx.outputs.iter().enumerate() {
            if !output.script_pubkey.is_pay_to_token() {
                continue;
            }
            if !wallet.is_mine(&output.script_pubkey) {
                continue;
            }
            if wallet.is_spent(&OutPoint::new(txid, vout as u32)) {
                continue;
            }
            let Ok(decoded) = decode_token_script(&output.script_pubkey) else {
                continue;
            };
            if let Some(wanted) = filter {
                if decoded.name != wanted {
                    continue;
                }
            }
            *balances.entry(decoded.name).or_insert(0) += output.value;
        }
    }

    balances
}

/// Unconfirmed token balances by name, over mempool outputs the wallet
/// owns.
pub fn unconfirmed_token_balances(
    node: &TokenNode,
    wallet: &dyn WalletAccess,
) -> Result<HashMap<String, u64>, TokenError> {
    let mut balances = HashMap::new();

    for entry in node.mempool.entries() {
        if !entry.has_token_output() {
            continue;
        }
        let txid = entry.txid();
        for output in &entry.outputs {
            if !output.script_pubkey.is_pay_to_token() {
                continue;
            }
            if !wallet.is_mine(&output.script_pubkey) {
                continue;
            }
            let token = contextual_check_token(&output.script_pubkey, txid).map_err(|_| {
                TokenError::TokenScriptMalformed("corrupt token in mempool".into())
            })?;
            *balances.entry(token.name().to_string()).or_insert(0) += output.value;
        }
    }

    Ok(balances)
}
