/// Error types for primitive operations.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    /// Ran out of bytes while reading wire data.
    #[error("unexpected end of data")]
    UnexpectedEof,

    /// A hash had the wrong length or malformed hex.
    #[error("invalid hash: {0}")]
    InvalidHash(String),

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Hex decoding error.
    #[error(transparent)]
    HexDecode(#[from] hex::FromHexError),

    /// A private key scalar was malformed or out of range.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// A public key point was malformed.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A signature failed to parse or could not be produced.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A length-prefixed string exceeded the permitted size.
    #[error("string too long: {0} bytes")]
    StringTooLong(usize),
}
