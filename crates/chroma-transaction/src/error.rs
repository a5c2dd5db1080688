/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The byte stream did not form a valid transaction.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// A structural rule was violated (bad index, missing data).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// Signing an input failed.
    #[error("signing error: {0}")]
    SigningError(String),

    /// An input's signature did not verify against its previous output.
    #[error("signature verification failed: {0}")]
    VerifyError(String),

    /// Script error.
    #[error(transparent)]
    Script(#[from] chroma_script::ScriptError),

    /// Primitives error.
    #[error(transparent)]
    Primitives(#[from] chroma_primitives::PrimitivesError),
}
