//! Script templates for signing and verifying inputs.

pub mod p2pkh;
