//! Push-data chunk parsing and encoding.
//!
//! A chunk is either a lone opcode or a data push carrying its payload.
//! Used to take apart unlocking scripts (signature + public key) and to
//! build pushes with the minimal prefix.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes) this is the length.
    pub op: u8,
    /// The pushed payload, if this chunk is a data push.
    pub data: Option<Vec<u8>>,
}

/// Decode raw script bytes into chunks.
///
/// Handles direct pushes and OP_PUSHDATA1/2/4; any other byte becomes a
/// lone opcode chunk. Fails on truncated pushes.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let op = bytes[pos];
        match op {
            OP_PUSHDATA1 => {
                if bytes.len() < pos + 2 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = bytes[pos + 1] as usize;
                pos += 2;
                if bytes.len() < pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                chunks.push(ScriptChunk {
                    op,
                    data: Some(bytes[pos..pos + length].to_vec()),
                });
                pos += length;
            }
            OP_PUSHDATA2 => {
                if bytes.len() < pos + 3 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = u16::from_le_bytes([bytes[pos + 1], bytes[pos + 2]]) as usize;
                pos += 3;
                if bytes.len() < pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                chunks.push(ScriptChunk {
                    op,
                    data: Some(bytes[pos..pos + length].to_vec()),
                });
                pos += length;
            }
            OP_PUSHDATA4 => {
                if bytes.len() < pos + 5 {
                    return Err(ScriptError::DataTooSmall);
                }
                let length = u32::from_le_bytes([
                    bytes[pos + 1],
                    bytes[pos + 2],
                    bytes[pos + 3],
                    bytes[pos + 4],
                ]) as usize;
                pos += 5;
                if bytes.len() < pos + length {
                    return Err(ScriptError::DataTooSmall);
                }
                chunks.push(ScriptChunk {
                    op,
                    data: Some(bytes[pos..pos + length].to_vec()),
                });
                pos += length;
            }
            OP_DATA_1..=OP_DATA_75 => {
                let length = op as usize;
                if bytes.len() < pos + 1 + length {
                    return Err(ScriptError::DataTooSmall);
                }
                chunks.push(ScriptChunk {
                    op,
                    data: Some(bytes[pos + 1..pos + 1 + length].to_vec()),
                });
                pos += 1 + length;
            }
            _ => {
                chunks.push(ScriptChunk { op, data: None });
                pos += 1;
            }
        }
    }

    Ok(chunks)
}

/// The push prefix for a payload of `data_len` bytes.
///
/// Direct push for up to 75 bytes, then OP_PUSHDATA1/2/4 as the length
/// grows.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= 75 {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xff {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xffff {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xffff_ffff {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig)
    }
}
