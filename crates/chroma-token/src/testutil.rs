//! In-memory collaborator doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use chroma_primitives::Hash;
use chroma_script::opcodes::*;
use chroma_script::scriptnum::encode_scriptnum;
use chroma_script::Script;
use chroma_transaction::template::p2pkh;
use chroma_transaction::{OutPoint, Transaction, TxIn, TxOut};

use crate::chain::{
    Block, BlockIndex, ChainAccess, ChainParams, Coin, MempoolAccess, RemovalReason, UtxoView,
};
use crate::node::TokenNode;
use crate::store::{MemoryKv, TokenStore};
use crate::token::TokenType;

/// Chain double: transactions, blocks, and a tip height.
#[derive(Default)]
pub struct MockChain {
    txs: Mutex<HashMap<Hash, (Transaction, Hash)>>,
    blocks: Mutex<HashMap<i32, Block>>,
    tip: Mutex<i32>,
    ibd: Mutex<bool>,
}

impl MockChain {
    pub fn add_tx(&self, tx: &Transaction, block_hash: Hash) {
        self.txs
            .lock()
            .unwrap()
            .insert(tx.txid(), (tx.clone(), block_hash));
    }

    pub fn add_block(&self, height: i32, txs: Vec<Transaction>) -> Block {
        let hash = Hash::new({
            let mut bytes = [0u8; 32];
            bytes[..4].copy_from_slice(&height.to_le_bytes());
            bytes[31] = 0xb1;
            bytes
        });
        for tx in &txs {
            self.add_tx(tx, hash);
        }
        let block = Block { hash, height, txs };
        self.blocks.lock().unwrap().insert(height, block.clone());
        let mut tip = self.tip.lock().unwrap();
        if height > *tip {
            *tip = height;
        }
        block
    }

    pub fn set_tip(&self, height: i32) {
        *self.tip.lock().unwrap() = height;
    }

    pub fn set_ibd(&self, ibd: bool) {
        *self.ibd.lock().unwrap() = ibd;
    }
}

impl ChainAccess for MockChain {
    fn get_transaction(&self, txid: &Hash) -> Option<(Transaction, Hash)> {
        self.txs.lock().unwrap().get(txid).cloned()
    }

    fn read_block_from_disk(&self, height: i32) -> Option<Block> {
        self.blocks.lock().unwrap().get(&height).cloned()
    }

    fn block_index(&self, height: i32) -> Option<BlockIndex> {
        self.blocks
            .lock()
            .unwrap()
            .get(&height)
            .map(|b| BlockIndex {
                height: b.height,
                hash: b.hash,
            })
    }

    fn height(&self) -> i32 {
        *self.tip.lock().unwrap()
    }

    fn is_initial_block_download(&self) -> bool {
        *self.ibd.lock().unwrap()
    }
}

/// UTXO view double.
#[derive(Default)]
pub struct MockView {
    coins: Mutex<HashMap<OutPoint, Coin>>,
}

impl MockView {
    pub fn add_coin(&self, outpoint: OutPoint, output: TxOut, height: i32) {
        self.coins
            .lock()
            .unwrap()
            .insert(outpoint, Coin { output, height });
    }
}

impl UtxoView for MockView {
    fn access_coin(&self, outpoint: &OutPoint) -> Option<Coin> {
        self.coins.lock().unwrap().get(outpoint).cloned()
    }
}

/// Mempool double recording recursive removals.
#[derive(Default)]
pub struct MockPool {
    txs: Mutex<Vec<Transaction>>,
    removed: Mutex<Vec<Hash>>,
}

impl MockPool {
    pub fn add(&self, tx: Transaction) {
        self.txs.lock().unwrap().push(tx);
    }

    pub fn removed(&self) -> Vec<Hash> {
        self.removed.lock().unwrap().clone()
    }
}

impl MempoolAccess for MockPool {
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
        self.removed.lock().unwrap().push(*txid);
    }
}

/// Wallet double: a keyring, owned transactions, and spent tracking.
#[derive(Default)]
pub struct MockWallet {
    keys: Mutex<HashMap<[u8; 20], chroma_primitives::ec::PrivateKey>>,
    txs: Mutex<Vec<crate::wallet::WalletTx>>,
    spent: Mutex<std::collections::HashSet<OutPoint>>,
    keypool: Mutex<Vec<chroma_primitives::ec::PrivateKey>>,
    broadcasts: Mutex<Vec<Transaction>>,
}

impl MockWallet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key and return the P2PKH script it can spend.
    pub fn add_key(&self, key: chroma_primitives::ec::PrivateKey) -> Script {
        let pkh = chroma_primitives::hash::hash160(&key.pub_key().to_compressed());
        let script = p2pkh::lock_to_key_hash(&pkh);
        self.keys.lock().unwrap().insert(pkh, key);
        script
    }

    /// Seed the keypool with `n` fresh keys.
    pub fn fill_keypool(&self, n: usize) {
        let mut pool = self.keypool.lock().unwrap();
        for _ in 0..n {
            pool.push(chroma_primitives::ec::PrivateKey::new());
        }
    }

    pub fn add_wallet_tx(&self, tx: Transaction, block_height: Option<i32>, time: u64) {
        self.txs.lock().unwrap().push(crate::wallet::WalletTx {
            tx,
            block_height,
            time,
        });
    }

    pub fn mark_spent(&self, outpoint: OutPoint) {
        self.spent.lock().unwrap().insert(outpoint);
    }

    pub fn broadcasts(&self) -> Vec<Transaction> {
        self.broadcasts.lock().unwrap().clone()
    }
}

impl crate::wallet::WalletAccess for MockWallet {
    fn owned_transactions(&self) -> Vec<crate::wallet::WalletTx> {
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

    fn reserve_key(&self) -> Option<chroma_primitives::ec::PublicKey> {
        let key = self.keypool.lock().unwrap().pop()?;
        let pub_key = key.pub_key();
        let pkh = chroma_primitives::hash::hash160(&pub_key.to_compressed());
        self.keys.lock().unwrap().insert(pkh, key);
        Some(pub_key)
    }

    fn signing_key(&self, pkh: &[u8; 20]) -> Option<chroma_primitives::ec::PrivateKey> {
        self.keys.lock().unwrap().get(pkh).cloned()
    }

    fn broadcast_transaction(&self, tx: &Transaction) -> Result<(), crate::TokenError> {
        self.broadcasts.lock().unwrap().push(tx.clone());
        Ok(())
    }
}

/// Build a token script from raw parts without the builder's validation,
/// so tests can express adversarial field values.
pub fn raw_token_script(token_type: TokenType, id: u64, name: &str, owner: &Script) -> Script {
    let id_bytes = encode_scriptnum(id).expect("test identifiers are encodable");
    let mut bytes = vec![
        OP_TOKEN,
        small_int_opcode(1).unwrap(),
        small_int_opcode(token_type.to_wire() as u8).unwrap(),
    ];
    bytes.push(id_bytes.len() as u8);
    bytes.extend_from_slice(&id_bytes);
    bytes.push(name.len() as u8);
    bytes.extend_from_slice(name.as_bytes());
    bytes.extend_from_slice(&[OP_DROP; 4]);
    bytes.extend_from_slice(owner.as_bytes());
    Script::from_bytes(&bytes)
}

/// Everything the validator tests need in one place.
pub struct Harness {
    pub node: TokenNode,
    pub chain: Arc<MockChain>,
    pub view: MockView,
    pub pool: Arc<MockPool>,
    counter: AtomicU32,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_activation(0)
    }

    pub fn with_activation(token_activation_height: i32) -> Self {
        let chain = Arc::new(MockChain::default());
        let pool = Arc::new(MockPool::default());
        let node = TokenNode::new(
            ChainParams {
                token_activation_height,
            },
            TokenStore::new(Arc::new(MemoryKv::new())),
            chain.clone(),
            pool.clone(),
        );
        Harness {
            node,
            chain,
            view: MockView::default(),
            pool,
            counter: AtomicU32::new(0),
        }
    }

    fn next_nonce(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }

    /// The P2PKH script every harness output pays to.
    pub fn owner_script(&self) -> Script {
        p2pkh::lock_to_key_hash(&[0xaa; 20])
    }

    /// Register a plain spendable coin at `height` and return its
    /// outpoint. The creating transaction is known to the chain fetcher.
    pub fn add_funding_coin(&self, value: u64, height: i32) -> OutPoint {
        let mut tx = Transaction::new();
        tx.lock_time = self.next_nonce();
        tx.inputs.push(TxIn::new(OutPoint::new(Hash::default(), 0)));
        tx.outputs.push(TxOut::new(value, self.owner_script()));
        self.chain.add_tx(&tx, Hash::default());
        let outpoint = OutPoint::new(tx.txid(), 0);
        self.view.add_coin(outpoint, tx.outputs[0].clone(), height);
        outpoint
    }

    /// A coin visible in the view whose transaction the chain cannot
    /// fetch.
    pub fn add_coin_without_tx(&self, value: u64, height: i32) -> OutPoint {
        let mut id = [0u8; 32];
        id[..4].copy_from_slice(&self.next_nonce().to_le_bytes());
        id[31] = 0x77;
        let outpoint = OutPoint::new(Hash::new(id), 0);
        self.view
            .add_coin(outpoint, TxOut::new(value, self.owner_script()), height);
        outpoint
    }

    /// An outpoint unknown to both the view and the chain.
    pub fn phantom_outpoint(&self) -> OutPoint {
        let mut id = [0u8; 32];
        id[..4].copy_from_slice(&self.next_nonce().to_le_bytes());
        id[31] = 0x99;
        OutPoint::new(Hash::new(id), 0)
    }

    /// A token output carrying an issuance script.
    pub fn issuance_output(&self, id: u64, name: &str, amount: u64) -> TxOut {
        TxOut::new(
            amount,
            raw_token_script(TokenType::Issuance, id, name, &self.owner_script()),
        )
    }

    /// A transaction spending `inputs` into one issuance output.
    pub fn issuance_tx(&self, inputs: &[OutPoint], id: u64, name: &str, amount: u64) -> Transaction {
        let mut tx = Transaction::new();
        for outpoint in inputs {
            tx.inputs.push(TxIn::new(*outpoint));
        }
        tx.outputs.push(self.issuance_output(id, name, amount));
        tx
    }

    /// A transaction spending `inputs` into one transfer output per
    /// amount.
    pub fn transfer_tx(
        &self,
        inputs: &[OutPoint],
        id: u64,
        name: &str,
        amounts: &[u64],
    ) -> Transaction {
        let mut tx = Transaction::new();
        for outpoint in inputs {
            tx.inputs.push(TxIn::new(*outpoint));
        }
        for &amount in amounts {
            tx.outputs.push(TxOut::new(
                amount,
                raw_token_script(TokenType::Transfer, id, name, &self.owner_script()),
            ));
        }
        tx
    }

    /// Create a confirmed transaction with the given outputs; the chain
    /// can fetch it and each output becomes a coin at `height`.
    pub fn add_tx_with_outputs(
        &self,
        outputs: Vec<TxOut>,
        height: i32,
    ) -> (Transaction, Vec<OutPoint>) {
        let mut tx = Transaction::new();
        tx.lock_time = self.next_nonce();
        tx.inputs.push(TxIn::new(OutPoint::new(Hash::default(), 0)));
        tx.outputs = outputs;
        let outpoints = self.confirm_tx(&tx, height);
        (tx, outpoints)
    }

    /// Record a transaction as confirmed at `height`: its outputs become
    /// coins and the chain can fetch it. Returns the new outpoints.
    pub fn confirm_tx(&self, tx: &Transaction, height: i32) -> Vec<OutPoint> {
        self.chain.add_tx(tx, Hash::default());
        let txid = tx.txid();
        tx.outputs
            .iter()
            .enumerate()
            .map(|(vout, output)| {
                let outpoint = OutPoint::new(txid, vout as u32);
                self.view.add_coin(outpoint, output.clone(), height);
                outpoint
            })
            .collect()
    }

    /// A block index for the block a transaction would confirm in.
    pub fn tip_at(&self, height: i32) -> BlockIndex {
        BlockIndex {
            height,
            hash: Hash::new([0xbb; 32]),
        }
    }
}
