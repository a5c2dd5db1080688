//! Signature hash computation.
//!
//! The chain commits to the value being spent, so the digest follows the
//! BIP-143 layout: hashed prevouts/sequences/outputs plus the outpoint,
//! script code, value, sequence, lock time, and flags of the input being
//! signed.

use chroma_primitives::hash::sha256d;
use chroma_primitives::wire::{VarInt, WireWriter};

use crate::transaction::Transaction;
use crate::TransactionError;

/// Sign all inputs and all outputs. The only flag the token wallet emits.
pub const SIGHASH_ALL: u32 = 0x01;

/// Compute the signature hash for one input.
///
/// `script_code` is the locking script of the output being spent (for a
/// token output, the full script including the token prefix) and `value`
/// is its amount.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    sighash_type: u32,
    value: u64,
) -> Result<[u8; 32], TransactionError> {
    if input_index >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_index,
            tx.inputs.len()
        )));
    }

    let input = &tx.inputs[input_index];

    let mut prevouts = WireWriter::with_capacity(tx.inputs.len() * 36);
    for txin in &tx.inputs {
        prevouts.write_bytes(txin.prevout.txid.as_bytes());
        prevouts.write_u32_le(txin.prevout.vout);
    }
    let hash_prevouts = sha256d(prevouts.as_bytes());

    let mut sequences = WireWriter::with_capacity(tx.inputs.len() * 4);
    for txin in &tx.inputs {
        sequences.write_u32_le(txin.sequence);
    }
    let hash_sequences = sha256d(sequences.as_bytes());

    let mut outputs = WireWriter::new();
    for txout in &tx.outputs {
        outputs.write_bytes(&txout.to_bytes());
    }
    let hash_outputs = sha256d(outputs.as_bytes());

    let mut preimage = WireWriter::with_capacity(256);
    preimage.write_u32_le(tx.version);
    preimage.write_bytes(&hash_prevouts);
    preimage.write_bytes(&hash_sequences);
    preimage.write_bytes(input.prevout.txid.as_bytes());
    preimage.write_u32_le(input.prevout.vout);
    preimage.write_varint(VarInt::from(script_code.len()));
    preimage.write_bytes(script_code);
    preimage.write_u64_le(value);
    preimage.write_u32_le(input.sequence);
    preimage.write_bytes(&hash_outputs);
    preimage.write_u32_le(tx.lock_time);
    preimage.write_u32_le(sighash_type);

    Ok(sha256d(preimage.as_bytes()))
}
