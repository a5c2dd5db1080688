//! Transaction output.

use chroma_primitives::wire::{VarInt, WireReader, WireWriter};
use chroma_script::Script;

use crate::TransactionError;

/// A single transaction output: a value locked behind a script.
///
/// Wire format: value (8 bytes LE) + varint-prefixed locking script.
#[derive(Clone, Debug)]
pub struct TxOut {
    /// Amount of chain units locked by this output.
    pub value: u64,
    /// The locking script (scriptPubKey).
    pub script_pubkey: Script,
}

impl TxOut {
    /// Create an output paying `value` to `script_pubkey`.
    pub fn new(value: u64, script_pubkey: Script) -> Self {
        TxOut {
            value,
            script_pubkey,
        }
    }

    /// Deserialize an output from a reader.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let value = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading value: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;
        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;

        Ok(TxOut {
            value,
            script_pubkey: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this output into a writer.
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_u64_le(self.value);
        writer.write_varint(VarInt::from(self.script_pubkey.len()));
        writer.write_bytes(self.script_pubkey.as_bytes());
    }

    /// Serialize to a standalone byte vector (also the sighash form).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = WireWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}
