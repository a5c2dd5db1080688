//! End-to-end exercises of the token subsystem over in-memory
//! collaborators: mint, duplicate rejection, transfer with change,
//! confirmation gating, reorg undo, and rebuild determinism.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chroma_primitives::ec::{PrivateKey, PublicKey};
use chroma_primitives::hash::hash160;
use chroma_primitives::Hash;
use chroma_script::{Address, Network, Script};
use chroma_transaction::template::p2pkh;
use chroma_transaction::{OutPoint, Transaction, TxIn, TxOut};

use chroma_token::chain::{
    Block, BlockIndex, ChainAccess, ChainParams, Coin, MempoolAccess, RemovalReason, UtxoView,
};
use chroma_token::index::{rebuild_token_index, scan_for_token_metadata, undo_block_tokens};
use chroma_token::mempool::accept_token_transaction;
use chroma_token::rpc;
use chroma_token::store::{MemoryKv, TokenStore};
use chroma_token::verify::check_token;
use chroma_token::wallet::{
    confirmed_token_balances, create_mint_transaction, create_send_transaction, MintRequest,
    SendRequest, WalletAccess, WalletTx,
};
use chroma_token::{TokenError, TokenNode, TokenType};

// ---------------------------------------------------------------------------
// In-memory collaborators
// ---------------------------------------------------------------------------

#[derive(Default)]
struct TestChain {
    txs: Mutex<HashMap<Hash, (Transaction, Hash)>>,
    blocks: Mutex<HashMap<i32, Block>>,
    tip: Mutex<i32>,
}

impl ChainAccess for TestChain {
    fn get_transaction(&self, txid: &Hash) -> Option<(Transaction, Hash)> {
        self.txs.lock().unwrap().get(txid).cloned()
    }
    fn read_block_from_disk(&self, height: i32) -> Option<Block> {
        self.blocks.lock().unwrap().get(&height).cloned()
    }
    fn block_index(&self, height: i32) -> Option<BlockIndex> {
        self.blocks.lock().unwrap().get(&height).map(|b| BlockIndex {
            height: b.height,
            hash: b.hash,
        })
    }
    fn height(&self) -> i32 {
        *self.tip.lock().unwrap()
    }
    fn is_initial_block_download(&self) -> bool {
        false
    }
}

#[derive(Default)]
struct TestView {
    coins: Mutex<HashMap<OutPoint, Coin>>,
}

impl UtxoView for TestView {
    fn access_coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        self.coins.lock().unwrap().get(outpoint).cloned()
    }
}

#[derive(Default)]
struct TestPool {
    txs: Mutex<Vec<Transaction>>,
}

impl MempoolAccess for TestPool {
    fn entries(&self) -> Vec<Transaction> {
        self.txs.lock().unwrap().clone()
    }
    fn exists(&self, txid: &Hash) -> bool {
        self.txs.lock().unwrap().iter().any(|tx| tx.txid() == *txid)
    }
    fn spends_outpoint(&self, outpoint: &OutPoint) -> bool {
        self.txs
            .lock()
            .unwrap()
            .iter()
            .any(|tx| tx.inputs.iter().any(|i| i.prevout == *outpoint))
    }
    fn remove_recursive(&self, txid: &Hash, _reason: RemovalReason) {
        self.txs.lock().unwrap().retain(|tx| tx.txid() != *txid);
    }
}

#[derive(Default)]
struct TestWallet {
    keys: Mutex<HashMap<[u8; 20], PrivateKey>>,
    txs: Mutex<Vec<WalletTx>>,
    spent: Mutex<HashSet<OutPoint>>,
    keypool: Mutex<Vec<PrivateKey>>,
    broadcasts: Mutex<Vec<Transaction>>,
}

impl TestWallet {
    fn add_key(&self, key: PrivateKey) -> Script {
        let pkh = hash160(&key.pub_key().to_compressed());
        let script = p2pkh::lock_to_key_hash(&pkh);
        self.keys.lock().unwrap().insert(pkh, key);
        script
    }

    fn fill_keypool(&self, n: usize) {
        let mut pool = self.keypool.lock().unwrap();
        for _ in 0..n {
            pool.push(PrivateKey::new());
        }
    }

    fn track(&self, tx: &Transaction, block_height: Option<i32>) {
        let mut txs = self.txs.lock().unwrap();
        if let Some(existing) = txs.iter_mut().find(|w| w.tx.txid() == tx.txid()) {
            existing.block_height = block_height;
            return;
        }
        txs.push(WalletTx {
            tx: tx.clone(),
            block_height,
            time: 1_700_000_000,
        });
    }
}

impl WalletAccess for TestWallet {
    fn owned_transactions(&self) -> Vec<WalletTx> {
        self.txs.lock().unwrap().clone()
    }
    fn is_mine(&self, script: &Script) -> bool {
        match p2pkh::spendable_key_hash(script) {
            Some(pkh) => self.keys.lock().unwrap().contains_key(&pkh),
            None => false,
        }
    }
    fn is_spent(&self, outpoint: &OutPoint) -> bool {
        self.spent.lock().unwrap().contains(outpoint)
    }
    fn reserve_key(&self) -> Option<PublicKey> {
        let key = self.keypool.lock().unwrap().pop()?;
        let pub_key = key.pub_key();
        self.keys
            .lock()
            .unwrap()
            .insert(hash160(&pub_key.to_compressed()), key);
        Some(pub_key)
    }
    fn signing_key(&self, pkh: &[u8; 20]) -> Option<PrivateKey> {
        self.keys.lock().unwrap().get(pkh).cloned()
    }
    fn broadcast_transaction(&self, tx: &Transaction) -> Result<(), TokenError> {
        self.broadcasts.lock().unwrap().push(tx.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// The environment
// ---------------------------------------------------------------------------

struct Env {
    node: TokenNode,
    kv: Arc<MemoryKv>,
    chain: Arc<TestChain>,
    view: TestView,
    /// Every coin ever created, spent or not. Rescans validate historical
    /// transactions, so they need a view that still resolves inputs the
    /// live UTXO set has since dropped.
    archive: TestView,
    pool: Arc<TestPool>,
    wallet: TestWallet,
}

impl Env {
    fn new() -> Self {
        let kv = Arc::new(MemoryKv::new());
        let chain = Arc::new(TestChain::default());
        let pool = Arc::new(TestPool::default());
        let node = TokenNode::new(
            ChainParams {
                token_activation_height: 0,
            },
            TokenStore::new(kv.clone()),
            chain.clone(),
            pool.clone(),
        );
        let wallet = TestWallet::default();
        wallet.fill_keypool(8);

        let env = Env {
            node,
            kv,
            chain,
            view: TestView::default(),
            archive: TestView::default(),
            pool,
            wallet,
        };
        env.connect_block(Vec::new()); // genesis
        env
    }

    /// Validate and connect a block of transactions at the next height.
    fn connect_block(&self, txs: Vec<Transaction>) -> Block {
        let tip = self.chain.height();
        let height = if self.chain.blocks.lock().unwrap().is_empty() {
            0
        } else {
            tip + 1
        };
        let mut hash_bytes = [0u8; 32];
        hash_bytes[..4].copy_from_slice(&height.to_le_bytes());
        hash_bytes[31] = 0xb1;
        let hash = Hash::new(hash_bytes);
        let index = BlockIndex { height, hash };

        for tx in &txs {
            if tx.has_token_output() {
                check_token(&self.node, tx, &index, &self.view, false)
                    .expect("block transaction passes token rules");
            }
        }

        for tx in &txs {
            self.chain.txs.lock().unwrap().insert(tx.txid(), (tx.clone(), hash));
            // Spend the inputs, create the outputs.
            for input in &tx.inputs {
                self.view.coins.lock().unwrap().remove(&input.prevout);
                self.wallet.spent.lock().unwrap().insert(input.prevout);
            }
            for (vout, output) in tx.outputs.iter().enumerate() {
                let outpoint = OutPoint::new(tx.txid(), vout as u32);
                let coin = Coin {
                    output: output.clone(),
                    height,
                };
                self.view.coins.lock().unwrap().insert(outpoint, coin.clone());
                self.archive.coins.lock().unwrap().insert(outpoint, coin);
            }
            if self.wallet_relevant(tx) {
                self.wallet.track(tx, Some(height));
            }
            self.pool.remove_recursive(&tx.txid(), RemovalReason::Conflict);
        }

        let block = Block { hash, height, txs };
        self.chain.blocks.lock().unwrap().insert(height, block.clone());
        *self.chain.tip.lock().unwrap() = height;
        block
    }

    /// Disconnect the tip block: drop the coins it created and undo its
    /// issuances.
    fn disconnect_tip(&self) {
        let height = self.chain.height();
        let block = self.chain.blocks.lock().unwrap().remove(&height).unwrap();

        undo_block_tokens(&self.node, &block).expect("undo passes");

        for tx in &block.txs {
            for (vout, _) in tx.outputs.iter().enumerate() {
                self.view
                    .coins
                    .lock()
                    .unwrap()
                    .remove(&OutPoint::new(tx.txid(), vout as u32));
            }
            self.chain.txs.lock().unwrap().remove(&tx.txid());
        }
        *self.chain.tip.lock().unwrap() = height - 1;
    }

    fn wallet_relevant(&self, tx: &Transaction) -> bool {
        tx.outputs
            .iter()
            .any(|o| self.wallet.is_mine(&o.script_pubkey))
    }

    /// Fund the wallet with a confirmed coinbase-style coin.
    fn fund_wallet(&self, value: u64) {
        let script = self.wallet.add_key(PrivateKey::new());
        let mut tx = Transaction::new();
        tx.lock_time = self.chain.height() as u32 + 7_000_000; // unique txid
        tx.inputs.push(TxIn::new(OutPoint::new(Hash::default(), 0)));
        tx.outputs.push(TxOut::new(value, script));
        self.connect_block(vec![tx]);
    }

    fn wallet_address(&self) -> Address {
        let key = PrivateKey::new();
        let script = self.wallet.add_key(key);
        let pkh = script.public_key_hash().unwrap();
        Address::from_public_key_hash(&pkh, Network::Mainnet)
    }

    fn mint(&self, name: &str, amount: u64) -> Result<Transaction, TokenError> {
        let req = MintRequest {
            owner: self.wallet_address(),
            name: name.into(),
            amount,
            checksum: None,
        };
        let tx = create_mint_transaction(&self.node, &self.wallet, &self.view, &req)?;
        accept_token_transaction(&self.node, &tx, &self.view)?;
        self.pool.txs.lock().unwrap().push(tx.clone());
        self.wallet.track(&tx, None);
        Ok(tx)
    }

    fn send(&self, dest: Address, name: &str, amount: u64) -> Result<Transaction, TokenError> {
        let req = SendRequest {
            dest,
            name: name.into(),
            amount,
        };
        let tx = create_send_transaction(&self.node, &self.wallet, &self.view, &req)?;
        accept_token_transaction(&self.node, &tx, &self.view)?;
        self.pool.txs.lock().unwrap().push(tx.clone());
        self.wallet.track(&tx, None);
        Ok(tx)
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

/// Scenario 1: a funded wallet mints FOO and the registry records it.
#[test]
fn successful_mint() {
    let env = Env::new();
    env.fund_wallet(10_000);
    env.connect_block(Vec::new());
    env.connect_block(Vec::new()); // three confirmations on the funding

    let mint = env.mint("FOO", 100).expect("mint succeeds");
    assert_eq!(mint.inputs.len(), 1);
    assert_eq!(mint.outputs.len(), 2); // token + change
    assert_eq!(mint.outputs[0].value, 100);
    assert_eq!(mint.outputs[1].value, 9_900);

    env.connect_block(vec![mint.clone()]);

    let token = env.node.registry.lookup_by_name("FOO").expect("registered");
    assert_eq!(token.version(), 0x01);
    assert_eq!(token.token_type(), TokenType::Issuance);
    assert_eq!(token.id(), 17);
    assert_eq!(token.origin_tx(), mint.txid());

    let listing = rpc::token_issuances(&env.node).unwrap();
    assert_eq!(listing["FOO"]["identifier"], "0000000000000011");
}

/// Scenario 2: a second issuance of the same name is rejected at both
/// the pool and the validator, and the registry is untouched.
#[test]
fn duplicate_name_rejection() {
    let env = Env::new();
    env.fund_wallet(10_000);
    env.fund_wallet(10_000);
    env.connect_block(Vec::new());

    let mint = env.mint("FOO", 100).expect("first mint");
    env.connect_block(vec![mint]);

    let err = env.mint("FOO", 50).unwrap_err();
    assert!(matches!(err, TokenError::NameExists(_)));
    assert_eq!(env.node.registry.size(), 1);

    // A mempool-only duplicate is caught by the pool guard.
    let env2 = Env::new();
    env2.fund_wallet(10_000);
    env2.fund_wallet(10_000);
    env2.connect_block(Vec::new());
    env2.mint("BAR", 100).expect("pending mint");
    let err = env2.mint("BAR", 50).unwrap_err();
    assert!(matches!(err, TokenError::IssuanceExistsInMempool(_)));
}

/// Scenario 3: transfer 30 of 100 with colored change, balances update.
#[test]
fn transfer_with_change() {
    let env = Env::new();
    env.fund_wallet(10_000);
    env.connect_block(Vec::new());

    let mint = env.mint("FOO", 100).expect("mint");
    env.connect_block(vec![mint]);
    env.connect_block(Vec::new());

    let recipient = env.wallet_address();
    let transfer = env.send(recipient, "FOO", 30).expect("send succeeds");

    assert_eq!(transfer.inputs.len(), 1);
    assert_eq!(transfer.outputs.len(), 2);
    let out0 =
        chroma_token::script::decode_token_script(&transfer.outputs[0].script_pubkey).unwrap();
    let out1 =
        chroma_token::script::decode_token_script(&transfer.outputs[1].script_pubkey).unwrap();
    assert_eq!((out0.id, out0.name.as_str()), (17, "FOO"));
    assert_eq!((out1.id, out1.name.as_str()), (17, "FOO"));
    assert_eq!(transfer.outputs[0].value, 30);
    assert_eq!(transfer.outputs[1].value, 70);

    env.connect_block(vec![transfer]);

    // Both halves are in this wallet; the original 100 is spent.
    let balances = confirmed_token_balances(&env.wallet, Some("FOO"));
    assert_eq!(balances.get("FOO"), Some(&100));
}

/// Scenario 4: one confirmation is enough, zero is not.
#[test]
fn confirmation_gating() {
    let env = Env::new();
    env.fund_wallet(10_000);
    env.connect_block(Vec::new());

    let mint = env.mint("FOO", 100).expect("mint");
    env.connect_block(vec![mint]); // FOO confirmed in block N

    // Immediately afterwards the colored coin has exactly one
    // confirmation at the next height, so a send is accepted.
    let recipient = env.wallet_address();
    let transfer = env.send(recipient, "FOO", 30).expect("accepted at one confirmation");

    // A transaction spending an output that would only confirm in the
    // same block (zero confirmations) is rejected by the validator.
    let colored = OutPoint::new(transfer.txid(), 0);
    let mut chained = Transaction::new();
    chained.inputs.push(TxIn::new(colored));
    chained.outputs.push(transfer.outputs[0].clone());
    // Model the parent as confirming in the same block the child would.
    env.view.coins.lock().unwrap().insert(
        colored,
        Coin {
            output: transfer.outputs[0].clone(),
            height: env.chain.height() + 1,
        },
    );
    let err = accept_token_transaction(&env.node, &chained, &env.view).unwrap_err();
    assert!(matches!(err, TokenError::InsufficientConfirms));
}

/// Scenario 5: disconnecting the issuance block empties the registry
/// and the store; a rescan stays empty.
#[test]
fn reorg_undo() {
    let env = Env::new();
    env.fund_wallet(10_000);
    env.connect_block(Vec::new());

    let mint = env.mint("FOO", 100).expect("mint");
    env.connect_block(vec![mint]);
    assert_eq!(env.node.registry.size(), 1);

    env.disconnect_tip();
    assert_eq!(env.node.registry.size(), 0);
    assert!(env.node.registry.lookup_by_name("FOO").is_none());

    // The persisted record is gone too.
    let reloaded = chroma_token::registry::IssuanceRegistry::new(TokenStore::new(env.kv.clone()));
    assert_eq!(reloaded.load().unwrap(), 0);

    // A rescan of the surviving chain finds nothing.
    scan_for_token_metadata(&env.node, &env.archive, env.chain.height()).unwrap();
    assert_eq!(env.node.registry.size(), 0);
}

/// Scenario 6: rebuilding from a chain with three issuances reproduces
/// identifiers 17, 18, 19 in order.
#[test]
fn rebuild_determinism() {
    let env = Env::new();
    for name in ["FOO", "BAR", "BAZ"] {
        env.fund_wallet(10_000);
        env.connect_block(Vec::new());
        let mint = env.mint(name, 100).expect("mint");
        env.connect_block(vec![mint]);
    }

    let before: Vec<(u64, String)> = env
        .node
        .registry
        .snapshot()
        .iter()
        .map(|t| (t.id(), t.name().to_string()))
        .collect();
    assert_eq!(
        before,
        vec![
            (17, "FOO".to_string()),
            (18, "BAR".to_string()),
            (19, "BAZ".to_string())
        ]
    );

    rebuild_token_index(&env.node, &env.archive).expect("rebuild passes");

    let after: Vec<(u64, String)> = env
        .node
        .registry
        .snapshot()
        .iter()
        .map(|t| (t.id(), t.name().to_string()))
        .collect();
    assert_eq!(before, after);
}
