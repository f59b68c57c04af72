//! Error types for proving.

use tessera_engine::RuntimeError;

#[derive(Debug, thiserror::Error)]
pub enum ProverError {
    /// The inputs do not satisfy a circuit's constraints.
    #[error("constraint violated in {circuit}: {reason}")]
    Constraint { circuit: &'static str, reason: String },

    /// Two attestations were presented for merging that do not chain.
    #[error("{task}: attestations are not adjacent ({left} / {right})")]
    NotReducible {
        task: &'static str,
        left: String,
        right: String,
    },

    #[error("{circuit}: proof does not verify")]
    InvalidProof { circuit: &'static str },

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("task payload serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("worker failed: {0}")]
    Worker(String),

    #[error("nothing to prove")]
    EmptyFlow,

    /// Reduction ended with more than one attestation left.
    #[error("reduction left {remaining} unmerged attestations")]
    Incomplete { remaining: usize },
}

impl ProverError {
    pub(crate) fn constraint(circuit: &'static str, reason: impl Into<String>) -> Self {
        ProverError::Constraint {
            circuit,
            reason: reason.into(),
        }
    }
}

pub type ProverResult<T> = Result<T, ProverError>;
