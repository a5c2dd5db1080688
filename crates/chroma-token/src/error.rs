//! Token error taxonomy.
//!
//! Display strings keep the reason-string vocabulary the network has
//! always relayed, so peers and log scrapers see familiar categories.

use chroma_primitives::Hash;

/// Errors raised by the token subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    // -- parse ------------------------------------------------------------

    /// A token output script failed structural decoding.
    #[error("token-script-malformed: {0}")]
    TokenScriptMalformed(String),

    /// A checksum output script failed structural decoding.
    #[error("checksum-script-malformed")]
    ChecksumScriptMalformed,

    /// A token name failed sanitization or length rules.
    #[error("tokenname-invalid: {0}")]
    NameInvalid(String),

    /// The token version byte is not the current version.
    #[error("bad-token-version: {0:#04x}")]
    VersionUnsupported(u8),

    /// The token type field is not issuance or transfer.
    #[error("bad-token-type: {0:#06x}")]
    TypeInvalid(u16),

    // -- rules ------------------------------------------------------------

    /// More than one issuance output in a single transaction.
    #[error("multiple-token-issuances")]
    MultipleIssuances,

    /// An issuance reuses a name already in the registry.
    #[error("issuance-name-exists: {0}")]
    NameExists(String),

    /// An issuance reuses an identifier already in the registry.
    #[error("issuance-id-exists: {0}")]
    IdExists(u64),

    /// An issuance identifier falls outside the permitted range.
    #[error("issuance-id-out-of-range: {0}")]
    IdOutOfRange(u64),

    /// A transfer spends an input that is not a token output.
    #[error("token-prevout-invalid")]
    TransferPrevoutInvalid,

    /// An issuance spends an input that is a token output.
    #[error("issuance-prevout-not-standard")]
    IssuancePrevoutNotStandard,

    /// A transfer's previous token does not match the claimed pair.
    #[error("prevtoken-mismatch")]
    PrevTokenMismatch,

    /// An input has fewer confirmations than the token minimum.
    #[error("token-insufficient-confirms")]
    InsufficientConfirms,

    // -- context ----------------------------------------------------------

    /// A referenced previous transaction could not be fetched.
    #[error("token-prevtx-missing: {0}")]
    PrevTxMissing(Hash),

    /// The node is still in initial block download.
    #[error("initial-block-download")]
    InitialBlockDownload,

    /// The chain has not reached the token activation height.
    #[error("token-not-active-yet")]
    NotActiveYet,

    // -- mempool ----------------------------------------------------------

    /// Another unconfirmed transaction already issues this name.
    #[error("token-issuance-exists-mempool: {0}")]
    IssuanceExistsInMempool(String),

    /// An input outpoint is already spent by an unconfirmed transaction.
    #[error("token-input-used-mempool")]
    InputAlreadyUsedInMempool,

    // -- wallet -----------------------------------------------------------

    /// The wallet could not gather enough value.
    #[error("wallet-insufficient-balance")]
    InsufficientBalance,

    /// The wallet keypool has no more keys to reserve.
    #[error("wallet-keypool-exhausted")]
    KeypoolExhausted,

    /// Signing an input failed; carries the verifier's message verbatim.
    #[error("wallet-signing-failed: {0}")]
    SigningFailed(String),

    /// Relaying the finished transaction failed.
    #[error("wallet-broadcast-failed: {0}")]
    BroadcastFailed(String),

    // -- storage ----------------------------------------------------------

    /// Reading from the persistent store failed.
    #[error("token-db-read-failed: {0}")]
    ReadFailed(String),

    /// Writing to the persistent store failed.
    #[error("token-db-write-failed: {0}")]
    WriteFailed(String),
}
