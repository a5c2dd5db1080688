//! Script opcode byte values.
//!
//! Only the opcodes the chroma protocol actually emits or matches on are
//! named here; everything else passes through scripts untouched as raw
//! bytes. `OP_TOKEN` repurposes the NOP10 upgrade slot for token-colored
//! outputs.

/// Push an empty array (also known as OP_FALSE).
pub const OP_0: u8 = 0x00;
/// Alias for `OP_0`.
pub const OP_FALSE: u8 = 0x00;
/// Direct push of 1 byte. Opcodes 0x01..=0x4b push that many bytes.
pub const OP_DATA_1: u8 = 0x01;
/// Direct push of 20 bytes (a hash160).
pub const OP_DATA_20: u8 = 0x14;
/// Direct push of up to 75 bytes (the largest direct push).
pub const OP_DATA_75: u8 = 0x4b;
/// Push with a 1-byte length prefix.
pub const OP_PUSHDATA1: u8 = 0x4c;
/// Push with a 2-byte little-endian length prefix.
pub const OP_PUSHDATA2: u8 = 0x4d;
/// Push with a 4-byte little-endian length prefix.
pub const OP_PUSHDATA4: u8 = 0x4e;
/// Push the number 1. OP_1..=OP_16 are the small-integer opcodes.
pub const OP_1: u8 = 0x51;
/// Push the number 2.
pub const OP_2: u8 = 0x52;
/// Push the number 16.
pub const OP_16: u8 = 0x60;
/// Mark the remainder of the script as unspendable data.
pub const OP_RETURN: u8 = 0x6a;
/// Remove the top stack item.
pub const OP_DROP: u8 = 0x75;
/// Duplicate the top stack item.
pub const OP_DUP: u8 = 0x76;
/// Fail unless the top two stack items are equal.
pub const OP_EQUALVERIFY: u8 = 0x88;
/// Hash160 the top stack item.
pub const OP_HASH160: u8 = 0xa9;
/// Verify an ECDSA signature.
pub const OP_CHECKSIG: u8 = 0xac;
/// Token marker, repurposed from the OP_NOP10 upgrade slot.
pub const OP_TOKEN: u8 = 0xb9;

/// The small-integer opcode for `n` in 1..=16, or `None` outside that range.
pub fn small_int_opcode(n: u8) -> Option<u8> {
    if (1..=16).contains(&n) {
        Some(OP_1 + n - 1)
    } else {
        None
    }
}

/// The integer value of a small-integer opcode, or `None` for any other byte.
pub fn small_int_value(op: u8) -> Option<u8> {
    if (OP_1..=OP_16).contains(&op) {
        Some(op - OP_1 + 1)
    } else {
        None
    }
}

/// True if `op` is one of OP_1..=OP_16.
pub fn is_small_int_op(op: u8) -> bool {
    (OP_1..=OP_16).contains(&op)
}
