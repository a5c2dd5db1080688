//! Handlers for the `token` RPC namespace.
//!
//! Each handler is a plain function producing a `serde_json::Value`; the
//! JSON-RPC dispatcher, help text, and wallet unlocking live outside the
//! token subsystem. Errors carry Bitcoin-style RPC codes.

use serde_json::{json, Map, Value};

use chroma_script::{Address, Network, Script};

use crate::chain::UtxoView;
use crate::history::token_history;
use crate::index::rebuild_token_index;
use crate::names::sanitize_name;
use crate::node::TokenNode;
use crate::script::{decode_checksum_script, decode_token_script};
use crate::token::{Token, TokenType, TOKENNAME_MAXLEN, TOKENNAME_MINLEN, TOKEN_VALUEMAX};
use crate::wallet::{
    confirmed_token_balances, create_mint_transaction, create_send_transaction,
    unconfirmed_token_balances, MintRequest, SendRequest, WalletAccess,
};
use crate::TokenError;

/// Miscellaneous error.
pub const RPC_MISC_ERROR: i32 = -1;
/// Unexpected type was passed as parameter.
pub const RPC_TYPE_ERROR: i32 = -3;
/// Unspecified problem with wallet.
pub const RPC_WALLET_ERROR: i32 = -4;
/// Invalid address or key.
pub const RPC_INVALID_ADDRESS_OR_KEY: i32 = -5;
/// Still downloading initial blocks.
pub const RPC_CLIENT_IN_INITIAL_DOWNLOAD: i32 = -10;
/// Keypool ran out.
pub const RPC_WALLET_KEYPOOL_RAN_OUT: i32 = -12;
/// Database error.
pub const RPC_DATABASE_ERROR: i32 = -20;
/// Transaction rejected by network rules.
pub const RPC_VERIFY_REJECTED: i32 = -26;

/// A JSON-RPC error: code plus human-readable message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcError {
    /// Bitcoin-style error code.
    pub code: i32,
    /// Message surfaced to the client.
    pub message: String,
}

impl RpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        RpcError {
            code,
            message: message.into(),
        }
    }
}

impl From<TokenError> for RpcError {
    fn from(err: TokenError) -> Self {
        let code = match &err {
            TokenError::TokenScriptMalformed(_)
            | TokenError::ChecksumScriptMalformed
            | TokenError::NameInvalid(_)
            | TokenError::VersionUnsupported(_)
            | TokenError::TypeInvalid(_) => RPC_INVALID_ADDRESS_OR_KEY,

            TokenError::MultipleIssuances
            | TokenError::NameExists(_)
            | TokenError::IdExists(_)
            | TokenError::IdOutOfRange(_)
            | TokenError::TransferPrevoutInvalid
            | TokenError::IssuancePrevoutNotStandard
            | TokenError::PrevTokenMismatch
            | TokenError::InsufficientConfirms
            | TokenError::NotActiveYet
            | TokenError::IssuanceExistsInMempool(_)
            | TokenError::InputAlreadyUsedInMempool => RPC_VERIFY_REJECTED,

            TokenError::PrevTxMissing(_) => RPC_INVALID_ADDRESS_OR_KEY,
            TokenError::InitialBlockDownload => RPC_CLIENT_IN_INITIAL_DOWNLOAD,

            TokenError::InsufficientBalance
            | TokenError::SigningFailed(_)
            | TokenError::BroadcastFailed(_) => RPC_WALLET_ERROR,
            TokenError::KeypoolExhausted => RPC_WALLET_KEYPOOL_RAN_OUT,

            TokenError::ReadFailed(_) | TokenError::WriteFailed(_) => RPC_DATABASE_ERROR,
        };
        RpcError::new(code, err.to_string())
    }
}

/// Handler result: a JSON value or an RPC error.
pub type RpcResult = Result<Value, RpcError>;

fn guard_ibd(node: &TokenNode) -> Result<(), RpcError> {
    if node.chain.is_initial_block_download() {
        return Err(RpcError::new(
            RPC_CLIENT_IN_INITIAL_DOWNLOAD,
            "Cannot perform token action while still in Initial Block Download",
        ));
    }
    Ok(())
}

fn parse_address(addr: &str) -> Result<Address, RpcError> {
    Address::from_string(addr)
        .map_err(|_| RpcError::new(RPC_INVALID_ADDRESS_OR_KEY, "Invalid address"))
}

fn parse_name(raw: &str) -> Result<String, RpcError> {
    let name = sanitize_name(raw);
    if name.len() < TOKENNAME_MINLEN || name.len() > TOKENNAME_MAXLEN {
        return Err(RpcError::new(
            RPC_INVALID_ADDRESS_OR_KEY,
            "Invalid token name",
        ));
    }
    Ok(name)
}

fn parse_amount(amount: u64) -> Result<u64, RpcError> {
    if amount < 1 || amount > TOKEN_VALUEMAX {
        return Err(RpcError::new(RPC_TYPE_ERROR, "Invalid token amount"));
    }
    Ok(amount)
}

/// A 40-hex-character checksum argument, or `None` when absent or
/// unusable (a bad checksum silently omits the side-output).
fn parse_checksum(checksum: Option<&str>) -> Option<[u8; 20]> {
    let s = checksum?;
    if s.len() != 40 {
        return None;
    }
    let bytes = hex::decode(s).ok()?;
    let mut digest = [0u8; 20];
    digest.copy_from_slice(&bytes);
    Some(digest)
}

fn owner_address(script_owner_hash: Option<[u8; 20]>) -> Value {
    match script_owner_hash {
        Some(pkh) => {
            json!(Address::from_public_key_hash(&pkh, Network::Mainnet).address_string)
        }
        None => Value::Null,
    }
}

/// `tokendecode "script"`: decode a token script, no side effects.
pub fn token_decode(script_hex: &str) -> RpcResult {
    if script_hex.is_empty() {
        return Err(RpcError::new(
            RPC_INVALID_ADDRESS_OR_KEY,
            "Invalid script length",
        ));
    }
    let script = Script::from_hex(script_hex)
        .map_err(|e| RpcError::new(RPC_INVALID_ADDRESS_OR_KEY, e.to_string()))?;
    let decoded = decode_token_script(&script)?;

    Ok(json!({
        "version": decoded.version,
        "type": decoded.token_type.to_wire(),
        "identifier": decoded.id,
        "name": decoded.name,
        "pubkey": owner_address(decoded.owner_key_hash),
    }))
}

/// `tokenmint "address" "name" amount ("checksum")`: mint a new token.
pub fn token_mint(
    node: &TokenNode,
    wallet: &dyn WalletAccess,
    view: &dyn UtxoView,
    address: &str,
    name: &str,
    amount: u64,
    checksum: Option<&str>,
) -> RpcResult {
    guard_ibd(node)?;

    let req = MintRequest {
        owner: parse_address(address)?,
        name: parse_name(name)?,
        amount: parse_amount(amount)?,
        checksum: parse_checksum(checksum),
    };

    let tx = create_mint_transaction(node, wallet, view, &req)?;
    wallet.broadcast_transaction(&tx)?;
    Ok(json!(tx.txid().to_hex()))
}

/// `tokensend "address" "name" amount`: send tokens.
pub fn token_send(
    node: &TokenNode,
    wallet: &dyn WalletAccess,
    view: &dyn UtxoView,
    address: &str,
    name: &str,
    amount: u64,
) -> RpcResult {
    guard_ibd(node)?;

    let req = SendRequest {
        dest: parse_address(address)?,
        name: parse_name(name)?,
        amount: parse_amount(amount)?,
    };

    let tx = create_send_transaction(node, wallet, view, &req)?;
    wallet.broadcast_transaction(&tx)?;
    Ok(json!(tx.txid().to_hex()))
}

/// `tokenbalance ("name")`: confirmed and unconfirmed balances.
pub fn token_balance(
    node: &TokenNode,
    wallet: &dyn WalletAccess,
    name: Option<&str>,
) -> RpcResult {
    let filter = match name {
        Some(raw) => Some(parse_name(raw)?),
        None => None,
    };

    let confirmed = confirmed_token_balances(wallet, filter.as_deref());
    let mut unconfirmed = unconfirmed_token_balances(node, wallet)?;
    if let Some(wanted) = &filter {
        unconfirmed.retain(|name, _| name == wanted);
    }

    let to_map = |balances: std::collections::HashMap<String, u64>| {
        let mut map = Map::new();
        let mut entries: Vec<_> = balances.into_iter().collect();
        entries.sort();
        for (name, amount) in entries {
            map.insert(name, json!(amount));
        }
        Value::Object(map)
    };

    Ok(json!({
        "confirmed": to_map(confirmed),
        "unconfirmed": to_map(unconfirmed),
    }))
}

/// `tokenlist`: every wallet token output with its context.
pub fn token_list(node: &TokenNode, wallet: &dyn WalletAccess) -> RpcResult {
    let tip = node.chain.height();
    let mut entries = Vec::new();

    for wtx in wallet.owned_transactions() {
        let txid = wtx.tx.txid();
        for (vout, output) in wtx.tx.outputs.iter().enumerate() {
            if !output.script_pubkey.is_pay_to_token() {
                continue;
            }
            if !wallet.is_mine(&output.script_pubkey) {
                continue;
            }
            let Ok(decoded) = decode_token_script(&output.script_pubkey) else {
                continue;
            };
            let confirmations = match wtx.block_height {
                Some(height) => tip - height + 1,
                None => 0,
            };
            let category = match decoded.token_type {
                TokenType::Issuance => "issuance",
                TokenType::Transfer => "transfer",
            };
            entries.push(json!({
                "token": decoded.name,
                "address": owner_address(decoded.owner_key_hash),
                "category": category,
                "amount": output.value,
                "confirmations": confirmations,
                "time": wtx.time,
                "block": wtx.block_height,
                "outpoint": format!("{}:{}", txid.to_hex(), vout),
            }));
        }
    }

    Ok(Value::Array(entries))
}

/// `tokenunspent`: unspent wallet token outputs.
pub fn token_unspent(wallet: &dyn WalletAccess, view: &dyn UtxoView) -> RpcResult {
    let mut entries = Vec::new();

    for wtx in wallet.owned_transactions() {
        let txid = wtx.tx.txid();
        for (vout, output) in wtx.tx.outputs.iter().enumerate() {
            if !output.script_pubkey.is_pay_to_token() {
                continue;
            }
            if !wallet.is_mine(&output.script_pubkey) {
                continue;
            }
            let outpoint = chroma_transaction::OutPoint::new(txid, vout as u32);
            if wallet.is_spent(&outpoint) {
                continue;
            }
            if view.access_coin(&outpoint).is_none() {
                continue;
            }
            let Ok(decoded) = decode_token_script(&output.script_pubkey) else {
                continue;
            };
            entries.push(json!({
                "token": decoded.name,
                "data": format!("{}:{}", txid.to_hex(), vout),
                "amount": output.value,
            }));
        }
    }

    Ok(Value::Array(entries))
}

/// `tokenissuances`: every known issuance, keyed by name.
pub fn token_issuances(node: &TokenNode) -> RpcResult {
    let mut issuances = Map::new();
    for token in node.registry.snapshot() {
        issuances.insert(
            token.name().to_string(),
            json!({
                "version": format!("{:02x}", token.version()),
                "type": format!("{:04x}", token.token_type().to_wire()),
                "identifier": format!("{:016x}", token.id()),
                "origintx": token.origin_tx().to_hex(),
            }),
        );
    }
    Ok(Value::Object(issuances))
}

/// The registry entry for `name`, or the standard unknown-token error.
fn known_token(node: &TokenNode, name: &str) -> Result<Token, RpcError> {
    node.registry
        .lookup_by_name(name)
        .ok_or_else(|| RpcError::new(RPC_INVALID_ADDRESS_OR_KEY, "Unknown token name"))
}

/// `tokeninfo "name"`: issuance details for one token.
pub fn token_info(node: &TokenNode, name: &str) -> RpcResult {
    let name = parse_name(name)?;
    let token = known_token(node, &name)?;

    let (origin_tx, _block_hash) =
        node.chain.get_transaction(&token.origin_tx()).ok_or_else(|| {
            RpcError::new(RPC_INVALID_ADDRESS_OR_KEY, "Origin transaction unavailable")
        })?;

    let mut origin = json!({ "tx": token.origin_tx().to_hex() });
    for output in &origin_tx.outputs {
        if !output.script_pubkey.is_pay_to_token() {
            continue;
        }
        if let Ok(decoded) = decode_token_script(&output.script_pubkey) {
            if decoded.name == name {
                origin["address"] = owner_address(decoded.owner_key_hash);
                origin["maxsupply"] = json!(output.value);
                break;
            }
        }
    }

    let mut info = json!({
        "version": format!("{:02x}", token.version()),
        "type": format!("{:04x}", token.token_type().to_wire()),
        "identifier": format!("{:016x}", token.id()),
        "origin": origin,
    });
    if let Some(digest) = origin_checksum(&origin_tx.outputs) {
        info["checksum"] = json!(hex::encode(digest));
    }

    Ok(json!({ name: info }))
}

/// `tokenchecksum "name"`: the issuance's checksum digest, or null.
pub fn token_checksum(node: &TokenNode, name: &str) -> RpcResult {
    let name = parse_name(name)?;
    let token = known_token(node, &name)?;

    let Some((origin_tx, _)) = node.chain.get_transaction(&token.origin_tx()) else {
        return Ok(Value::Null);
    };
    match origin_checksum(&origin_tx.outputs) {
        Some(digest) => Ok(json!(hex::encode(digest))),
        None => Ok(Value::Null),
    }
}

fn origin_checksum(outputs: &[chroma_transaction::TxOut]) -> Option<[u8; 20]> {
    outputs
        .iter()
        .find(|o| o.script_pubkey.is_checksum_data())
        .and_then(|o| decode_checksum_script(&o.script_pubkey).ok())
}

/// `tokenhistory "name"`: trace the wallet's newest UTXO of `name`
/// back to its issuance.
pub fn token_history_trace(
    node: &TokenNode,
    wallet: &dyn WalletAccess,
    view: &dyn UtxoView,
    name: &str,
) -> RpcResult {
    let name = parse_name(name)?;
    known_token(node, &name)?;

    // Newest unspent wallet UTXO carrying this token.
    let mut newest: Option<(i32, chroma_primitives::Hash)> = None;
    for wtx in wallet.owned_transactions() {
        let Some(height) = wtx.block_height else {
            continue;
        };
        let txid = wtx.tx.txid();
        for (vout, output) in wtx.tx.outputs.iter().enumerate() {
            if !output.script_pubkey.is_pay_to_token() {
                continue;
            }
            let outpoint = chroma_transaction::OutPoint::new(txid, vout as u32);
            if wallet.is_spent(&outpoint) || view.access_coin(&outpoint).is_none() {
                continue;
            }
            let Ok(decoded) = decode_token_script(&output.script_pubkey) else {
                continue;
            };
            if decoded.name != name {
                continue;
            }
            if newest.map(|(h, _)| height > h).unwrap_or(true) {
                newest = Some((height, txid));
            }
        }
    }

    let (_, start) = newest.ok_or_else(|| {
        RpcError::new(RPC_WALLET_ERROR, "No unspent token output to trace")
    })?;

    let trail = token_history(node.chain.as_ref(), &start, &name)?;
    Ok(Value::Array(
        trail.iter().map(|txid| json!(txid.to_hex())).collect(),
    ))
}

/// `tokenrebuild`: reset the registry and rescan the chain.
pub fn token_rebuild(node: &TokenNode, view: &dyn UtxoView) -> RpcResult {
    rebuild_token_index(node, view)?;
    Ok(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::build_token_script;
    use crate::testutil::*;
    use crate::token::TOKEN_CURRENT_VERSION;
    use chroma_primitives::Hash;
    use chroma_transaction::template::p2pkh;

    /// tokendecode returns the decoded fields and the owner address.
    #[test]
    fn test_decode_handler() {
        let owner = p2pkh::lock_to_key_hash(&[0x42; 20]);
        let script =
            build_token_script(TOKEN_CURRENT_VERSION, TokenType::Issuance, 17, "FOO", &owner)
                .unwrap();
        let value = token_decode(&script.to_hex()).unwrap();

        assert_eq!(value["version"], 1);
        assert_eq!(value["type"], 1);
        assert_eq!(value["identifier"], 17);
        assert_eq!(value["name"], "FOO");
        let expected = Address::from_public_key_hash(&[0x42; 20], Network::Mainnet);
        assert_eq!(value["pubkey"], expected.address_string);
    }

    /// tokendecode rejects empty and non-token scripts.
    #[test]
    fn test_decode_handler_errors() {
        assert_eq!(
            token_decode("").unwrap_err().code,
            RPC_INVALID_ADDRESS_OR_KEY
        );
        assert_eq!(
            token_decode("76a9").unwrap_err().code,
            RPC_INVALID_ADDRESS_OR_KEY
        );
    }

    /// tokenissuances formats fields as fixed-width hex.
    #[test]
    fn test_issuances_handler() {
        let h = Harness::new();
        h.node
            .registry
            .insert(Token::new(
                TokenType::Issuance,
                17,
                "FOO".into(),
                Hash::new([5u8; 32]),
            ))
            .unwrap();

        let value = token_issuances(&h.node).unwrap();
        let entry = &value["FOO"];
        assert_eq!(entry["version"], "01");
        assert_eq!(entry["type"], "0001");
        assert_eq!(entry["identifier"], "0000000000000011");
        assert_eq!(entry["origintx"], Hash::new([5u8; 32]).to_hex());
    }

    /// The mint handler guards IBD and argument validity.
    #[test]
    fn test_mint_handler_guards() {
        let h = Harness::new();
        let w = MockWallet::new();
        let addr = Address::from_public_key_hash(&[0x42; 20], Network::Mainnet);

        h.chain.set_ibd(true);
        let err = token_mint(&h.node, &w, &h.view, &addr.address_string, "FOO", 10, None)
            .unwrap_err();
        assert_eq!(err.code, RPC_CLIENT_IN_INITIAL_DOWNLOAD);
        h.chain.set_ibd(false);

        let err =
            token_mint(&h.node, &w, &h.view, "notanaddress", "FOO", 10, None).unwrap_err();
        assert_eq!(err.code, RPC_INVALID_ADDRESS_OR_KEY);

        let err = token_mint(&h.node, &w, &h.view, &addr.address_string, "F", 10, None)
            .unwrap_err();
        assert_eq!(err.code, RPC_INVALID_ADDRESS_OR_KEY);

        let err = token_mint(&h.node, &w, &h.view, &addr.address_string, "FOO", 0, None)
            .unwrap_err();
        assert_eq!(err.code, RPC_TYPE_ERROR);

        let err = token_mint(
            &h.node,
            &w,
            &h.view,
            &addr.address_string,
            "FOO",
            TOKEN_VALUEMAX + 1,
            None,
        )
        .unwrap_err();
        assert_eq!(err.code, RPC_TYPE_ERROR);
    }

    /// Checksum arguments must be exactly 40 hex characters.
    #[test]
    fn test_parse_checksum() {
        assert_eq!(parse_checksum(None), None);
        assert_eq!(parse_checksum(Some("zz")), None);
        assert_eq!(parse_checksum(Some(&"ab".repeat(19))), None);
        assert_eq!(parse_checksum(Some(&"gg".repeat(20))), None);
        assert_eq!(parse_checksum(Some(&"ab".repeat(20))), Some([0xab; 20]));
    }

    /// A full mint through the handler broadcasts and returns the txid.
    #[test]
    fn test_mint_handler_end_to_end() {
        let h = Harness::new();
        h.chain.set_tip(10);
        let w = MockWallet::new();
        w.fill_keypool(2);
        let script = w.add_key(chroma_primitives::ec::PrivateKey::new());
        let (funding_tx, _) =
            h.add_tx_with_outputs(vec![chroma_transaction::TxOut::new(10_000, script)], 5);
        w.add_wallet_tx(funding_tx, Some(5), 0);

        let addr = Address::from_public_key_hash(&[0x42; 20], Network::Mainnet);
        let value = token_mint(
            &h.node,
            &w,
            &h.view,
            &addr.address_string,
            " FO O ",
            100,
            None,
        )
        .expect("mint succeeds");

        let broadcasts = w.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        assert_eq!(value, json!(broadcasts[0].txid().to_hex()));
        // The sanitized name landed in the script.
        let decoded = decode_token_script(&broadcasts[0].outputs[0].script_pubkey).unwrap();
        assert_eq!(decoded.name, "FOO");
    }

    /// tokenbalance returns sorted confirmed and unconfirmed maps.
    #[test]
    fn test_balance_handler() {
        let h = Harness::new();
        h.chain.set_tip(10);
        let w = MockWallet::new();
        let script = w.add_key(chroma_primitives::ec::PrivateKey::new());

        let token_script = raw_token_script(TokenType::Transfer, 17, "FOO", &script);
        let (tx, _) = h.add_tx_with_outputs(
            vec![chroma_transaction::TxOut::new(70, token_script)],
            5,
        );
        w.add_wallet_tx(tx, Some(5), 0);

        let value = token_balance(&h.node, &w, None).unwrap();
        assert_eq!(value["confirmed"]["FOO"], 70);
        assert!(value["unconfirmed"].as_object().unwrap().is_empty());

        let filtered = token_balance(&h.node, &w, Some("BAR")).unwrap();
        assert!(filtered["confirmed"].as_object().unwrap().is_empty());
    }

    /// tokeninfo reports the origin output and checksum when present.
    #[test]
    fn test_info_and_checksum_handlers() {
        let h = Harness::new();
        let digest = [0x77u8; 20];
        let owner = p2pkh::lock_to_key_hash(&[0x42; 20]);
        let issuance = chroma_transaction::TxOut::new(
            500,
            build_token_script(TOKEN_CURRENT_VERSION, TokenType::Issuance, 17, "FOO", &owner)
                .unwrap(),
        );
        let checksum = chroma_transaction::TxOut::new(
            1000,
            crate::script::build_checksum_script(&digest),
        );
        let (origin_tx, _) = h.add_tx_with_outputs(vec![issuance, checksum], 2);

        h.node
            .registry
            .insert(Token::new(
                TokenType::Issuance,
                17,
                "FOO".into(),
                origin_tx.txid(),
            ))
            .unwrap();

        let info = token_info(&h.node, "FOO").unwrap();
        let entry = &info["FOO"];
        assert_eq!(entry["identifier"], "0000000000000011");
        assert_eq!(entry["origin"]["tx"], origin_tx.txid().to_hex());
        assert_eq!(entry["origin"]["maxsupply"], 500);
        assert_eq!(entry["checksum"], hex::encode(digest));

        let checksum_value = token_checksum(&h.node, "FOO").unwrap();
        assert_eq!(checksum_value, json!(hex::encode(digest)));

        let err = token_info(&h.node, "BAR").unwrap_err();
        assert_eq!(err.code, RPC_INVALID_ADDRESS_OR_KEY);
    }

    /// tokenrebuild resets and rescans.
    #[test]
    fn test_rebuild_handler() {
        let h = Harness::new();
        h.chain.add_block(0, Vec::new());
        let funding = h.add_funding_coin(1000, 0);
        let mint = h.issuance_tx(&[funding], 17, "FOO", 100);
        h.chain.add_block(1, vec![mint]);

        assert_eq!(token_rebuild(&h.node, &h.view).unwrap(), Value::Null);
        assert!(h.node.registry.contains_name("FOO"));
    }
}
