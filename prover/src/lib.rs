//! `tessera-prover` — proving of traced transactions.
//!
//! - [`Prover`]: the proving capability, with [`CircuitProver`] checking
//!   circuit constraints and a [`ProofBackend`] producing artifacts
//! - [`task`] / [`tasks`]: map and map-reduce task definitions
//! - [`LocalTaskQueue`]: bounded in-process workers
//! - [`BlockTaskFlow`]: reduces one cycle's traces to a single attestation

pub mod error;
pub mod backend;
pub mod circuits;
pub mod prover;
pub mod task;
pub mod tasks;
pub mod queue;
pub mod flow;

pub use backend::{DigestBackend, PlaceholderBackend, ProofBackend, ProvingMode};
pub use error::{ProverError, ProverResult};
pub use flow::BlockTaskFlow;
pub use prover::{build_prover, CircuitProver, Prover};
pub use queue::LocalTaskQueue;
pub use task::{MapReduceTask, MappingTask, TaskPayload};
pub use tasks::{BlockProvingTask, PairingInput, RuntimeProvingTask, StateTransitionTask};
