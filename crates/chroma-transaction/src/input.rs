//! Transaction input.

use chroma_primitives::wire::{VarInt, WireReader, WireWriter};
use chroma_primitives::Hash;
use chroma_script::Script;

use crate::outpoint::OutPoint;
use crate::TransactionError;

/// Sequence number marking a finalized input.
pub const DEFAULT_SEQUENCE: u32 = 0xffff_ffff;

/// A single transaction input spending a previous output.
///
/// Wire format: prevout txid (32 bytes LE) + prevout index (4 bytes LE) +
/// varint-prefixed unlocking script + sequence (4 bytes LE).
#[derive(Clone, Debug)]
pub struct TxIn {
    /// The output being spent.
    pub prevout: OutPoint,
    /// The unlocking script. `None` until the input is signed.
    pub script_sig: Option<Script>,
    /// Sequence number; defaults to finalized.
    pub sequence: u32,
}

impl TxIn {
    /// Create an unsigned input spending `prevout`.
    pub fn new(prevout: OutPoint) -> Self {
        TxIn {
            prevout,
            script_sig: None,
            sequence: DEFAULT_SEQUENCE,
        }
    }

    /// Deserialize an input from a reader.
    pub fn read_from(reader: &mut WireReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading prevout txid: {}", e))
        })?;
        let txid = Hash::from_bytes(txid_bytes)?;

        let vout = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading prevout index: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;
        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence: {}", e))
        })?;

        let script_sig = if script_bytes.is_empty() {
            None
        } else {
            Some(Script::from_bytes(script_bytes))
        };

        Ok(TxIn {
            prevout: OutPoint::new(txid, vout),
            script_sig,
            sequence,
        })
    }

    /// Serialize this input into a writer.
    pub fn write_to(&self, writer: &mut WireWriter) {
        writer.write_bytes(self.prevout.txid.as_bytes());
        writer.write_u32_le(self.prevout.vout);
        match &self.script_sig {
            Some(script) => {
                writer.write_varint(VarInt::from(script.len()));
                writer.write_bytes(script.as_bytes());
            }
            None => writer.write_varint(VarInt(0)),
        }
        writer.write_u32_le(self.sequence);
    }
}
