//! Error types for the sequencer.

use tessera_engine::EngineError;
use tessera_prover::ProverError;
use tessera_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    /// A proving cycle was asked to prove zero transactions.
    #[error("cannot create a block with zero transactions")]
    EmptyBlock,

    /// The mempool no longer held transactions that were just sequenced.
    #[error("failed to remove {count} sequenced transactions from the mempool")]
    TxRemovalFailed { count: usize },

    #[error("transaction rejected: {0}")]
    TxRejected(String),

    #[error("duplicate transaction {0}")]
    DuplicateTransaction(String),

    #[error("genesis state was already applied")]
    GenesisApplied,

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("prover error: {0}")]
    Prover(#[from] ProverError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("block storage error: {0}")]
    Storage(String),

    #[error("base layer error: {0}")]
    BaseLayer(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SequencerError {
    /// Invariant violations; retrying cannot help. A cycle whose
    /// attestations cannot be merged into one counts as such.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SequencerError::TxRemovalFailed { .. }
                | SequencerError::Prover(
                    ProverError::NotReducible { .. } | ProverError::Incomplete { .. }
                )
        )
    }
}

pub type SequencerResult<T> = Result<T, SequencerError>;
