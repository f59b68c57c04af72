//! Error types for the primitives crate.

/// Errors raised while decoding, verifying, or committing primitive values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrimitiveError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A signature did not verify against the claimed sender.
    #[error("invalid signature for sender {sender}")]
    InvalidSignature { sender: String },

    /// A Merkle tree operation was given inconsistent inputs.
    #[error("merkle error: {0}")]
    Merkle(String),
}

/// Convenience result type for primitive operations.
pub type PrimitiveResult<T> = core::result::Result<T, PrimitiveError>;
