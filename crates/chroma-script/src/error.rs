/// Error types for script operations.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Script is empty when a non-empty script was expected.
    #[error("script is empty")]
    EmptyScript,

    /// Script does not match the P2PKH template.
    #[error("not a P2PKH script")]
    NotP2pkh,

    /// Not enough bytes remain to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds the maximum encodable size.
    #[error("data too big")]
    DataTooBig,

    /// A script number was not minimally encoded.
    #[error("script number not minimally encoded: {0}")]
    NonMinimalNumber(String),

    /// A script number carried the negative sign bit.
    #[error("script number is negative")]
    NegativeNumber,

    /// A script number exceeded the encodable width.
    #[error("script number too large: {0} bytes")]
    NumberTooBig(usize),

    /// Invalid address string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid address length after Base58 decoding.
    #[error("invalid address length for '{0}'")]
    InvalidAddressLength(String),

    /// Address version byte is not recognized.
    #[error("address version not supported: {0}")]
    UnsupportedAddress(String),

    /// Base58Check checksum does not match.
    #[error("address checksum failed")]
    ChecksumFailed,
}
