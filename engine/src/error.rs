//! Error types for the runtime and the execution services.

use tessera_primitives::{Hash, MethodId, PrimitiveError};
use tessera_store::StoreError;

/// Failure raised inside a runtime method or hook.
///
/// A method failing this way only flips the transaction's status; the
/// transaction itself is still included in its block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// A state path was read that the caller never loaded.
    #[error("state path {} not loaded", hex_short(.0))]
    StateNotLoaded(Hash),

    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    #[error("invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: u64, got: u64 },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),

    #[error("corrupt state value: {0}")]
    CorruptState(String),

    #[error("unknown module: {0}")]
    UnknownModule(String),

    #[error("unknown method {module}.{method}")]
    UnknownMethod { module: String, method: String },

    #[error("unknown method id {0}")]
    UnknownMethodId(MethodId),
}

fn hex_short(hash: &Hash) -> String {
    tessera_primitives::short_hex(hash)
}

/// Convenience result type for runtime code.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised by the execution and tracing services.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("primitive error: {0}")]
    Primitive(#[from] PrimitiveError),

    /// A transaction hook rejected the transaction outright.
    #[error("hook {hook} rejected transaction: {reason}")]
    HookRejected { hook: &'static str, reason: RuntimeError },

    /// The transaction kept touching new state after every preload pass.
    #[error("state still incomplete after {passes} preload passes")]
    PreloadExhausted { passes: usize },

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
}

/// Convenience result type for engine services.
pub type EngineResult<T> = Result<T, EngineError>;
