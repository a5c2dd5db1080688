//! Pay-to-Public-Key-Hash lock, unlock, and verification.
//!
//! Token and checksum outputs end in the same 25-byte P2PKH tail as plain
//! value outputs, so one template covers every script the token wallet
//! spends: the signature hash commits to the full previous script, and
//! the key hash is taken from the trailing P2PKH template when the prefix
//! is token data.

use chroma_primitives::ec::{EcdsaSig, PrivateKey, PublicKey};
use chroma_primitives::hash::hash160;
use chroma_script::opcodes::*;
use chroma_script::{Address, Script};

use crate::sighash::{signature_hash, SIGHASH_ALL};
use crate::transaction::Transaction;
use crate::TransactionError;

/// Build a P2PKH locking script for an address.
pub fn lock(address: &Address) -> Script {
    lock_to_key_hash(&address.public_key_hash)
}

/// Build a P2PKH locking script for a raw 20-byte key hash.
pub fn lock_to_key_hash(pkh: &[u8; 20]) -> Script {
    let mut bytes = Vec::with_capacity(25);
    bytes.push(OP_DUP);
    bytes.push(OP_HASH160);
    bytes.push(OP_DATA_20);
    bytes.extend_from_slice(pkh);
    bytes.push(OP_EQUALVERIFY);
    bytes.push(OP_CHECKSIG);
    Script::from_bytes(&bytes)
}

/// The key hash an input spending `prev_script` must satisfy.
///
/// Plain P2PKH scripts carry it directly; token and checksum scripts
/// carry it in their trailing 25-byte P2PKH template.
pub fn spendable_key_hash(prev_script: &Script) -> Option<[u8; 20]> {
    if prev_script.is_p2pkh() {
        return prev_script.public_key_hash().ok();
    }
    let bytes = prev_script.as_bytes();
    if bytes.len() > 25 {
        let tail = Script::from_bytes(&bytes[bytes.len() - 25..]);
        if tail.is_p2pkh() {
            return tail.public_key_hash().ok();
        }
    }
    None
}

/// A P2PKH unlocker holding the signing key and sighash flag.
pub struct P2pkhUnlocker {
    private_key: PrivateKey,
    sighash_flag: u32,
}

/// Create an unlocker for `private_key`, defaulting to `SIGHASH_ALL`.
pub fn unlock(private_key: PrivateKey, sighash_flag: Option<u32>) -> P2pkhUnlocker {
    P2pkhUnlocker {
        private_key,
        sighash_flag: sighash_flag.unwrap_or(SIGHASH_ALL),
    }
}

impl P2pkhUnlocker {
    /// Sign one input and produce its unlocking script
    /// `<DER sig || flag byte> <compressed pubkey>`.
    ///
    /// `prev_script` and `prev_value` describe the output being spent.
    pub fn sign(
        &self,
        tx: &Transaction,
        input_index: usize,
        prev_script: &Script,
        prev_value: u64,
    ) -> Result<Script, TransactionError> {
        let digest = signature_hash(
            tx,
            input_index,
            prev_script.as_bytes(),
            self.sighash_flag,
            prev_value,
        )?;

        let signature = self
            .private_key
            .sign(&digest)
            .map_err(|e| TransactionError::SigningError(e.to_string()))?;

        let mut sig_buf = signature.to_der();
        sig_buf.push(self.sighash_flag as u8);
        let pub_key = self.private_key.pub_key().to_compressed();

        let mut script = Script::new();
        script.append_push_data(&sig_buf)?;
        script.append_push_data(&pub_key)?;
        Ok(script)
    }
}

/// Verify a signed input against the output it spends.
///
/// Parses `<sig> <pubkey>` out of the unlocking script, checks the public
/// key hashes to the script's spendable key hash, recomputes the digest
/// with the signature's embedded flag, and verifies the ECDSA signature.
pub fn verify_input(
    tx: &Transaction,
    input_index: usize,
    prev_script: &Script,
    prev_value: u64,
) -> Result<(), TransactionError> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        TransactionError::InvalidTransaction(format!(
            "input index {} out of range",
            input_index
        ))
    })?;
    let script_sig = input
        .script_sig
        .as_ref()
        .ok_or_else(|| TransactionError::VerifyError("input is unsigned".into()))?;

    let chunks = script_sig.chunks()?;
    let (sig_bytes, key_bytes) = match (chunks.first(), chunks.get(1)) {
        (Some(sig), Some(key)) if chunks.len() == 2 => {
            match (&sig.data, &key.data) {
                (Some(sig), Some(key)) => (sig.clone(), key.clone()),
                _ => {
                    return Err(TransactionError::VerifyError(
                        "unlocking script is not signature and key pushes".into(),
                    ))
                }
            }
        }
        _ => {
            return Err(TransactionError::VerifyError(
                "unlocking script is not two pushes".into(),
            ))
        }
    };

    let expected_pkh = spendable_key_hash(prev_script)
        .ok_or_else(|| TransactionError::VerifyError("previous script has no key hash".into()))?;
    if hash160(&key_bytes) != expected_pkh {
        return Err(TransactionError::VerifyError(
            "public key does not hash to previous script".into(),
        ));
    }

    if sig_bytes.is_empty() {
        return Err(TransactionError::VerifyError("empty signature".into()));
    }
    let flag = sig_bytes[sig_bytes.len() - 1] as u32;
    let signature = EcdsaSig::from_der(&sig_bytes[..sig_bytes.len() - 1])
        .map_err(|e| TransactionError::VerifyError(e.to_string()))?;
    let pub_key = PublicKey::from_bytes(&key_bytes)
        .map_err(|e| TransactionError::VerifyError(e.to_string()))?;

    let digest = signature_hash(tx, input_index, prev_script.as_bytes(), flag, prev_value)?;
    if !pub_key.verify(&digest, &signature) {
        return Err(TransactionError::VerifyError(
            "signature check failed".into(),
        ));
    }
    Ok(())
}
