//! The transaction type and its wire codec.

use chroma_primitives::hash::sha256d;
use chroma_primitives::wire::{VarInt, WireReader, WireWriter};
use chroma_primitives::Hash;

use crate::input::TxIn;
use crate::output::TxOut;
use crate::TransactionError;

/// A chain transaction.
///
/// Wire format: version (4 bytes LE), varint input count, inputs, varint
/// output count, outputs, lock time (4 bytes LE).
#[derive(Clone, Debug, Default)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,
    /// Ordered inputs.
    pub inputs: Vec<TxIn>,
    /// Ordered outputs.
    pub outputs: Vec<TxOut>,
    /// Earliest block height (or timestamp) this transaction is valid at.
    pub lock_time: u32,
}

impl Transaction {
    /// Create an empty version-1 transaction.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    /// Parse a transaction from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::SerializationError(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes; trailing data is an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = WireReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a reader.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let input_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;
        let mut inputs = Vec::with_capacity(input_count.value() as usize);
        for _ in 0..input_count.value() {
            inputs.push(TxIn::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;
        let mut outputs = Vec::with_capacity(output_count.value() as usize);
        for _ in 0..output_count.value() {
            outputs.push(TxOut::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    /// Serialize to wire-format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = WireWriter::with_capacity(256);
        writer.write_u32_le(self.version);
        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }
        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }
        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    /// Serialize to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// The transaction id: sha256d of the serialized bytes.
    pub fn txid(&self) -> Hash {
        Hash::new(sha256d(&self.to_bytes()))
    }

    /// True if any output carries a token script.
    pub fn has_token_output(&self) -> bool {
        self.outputs.iter().any(|o| o.script_pubkey.is_pay_to_token())
    }
}
