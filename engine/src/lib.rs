//! `tessera-engine` — transaction execution and tracing.
//!
//! - [`runtime`]: modules, hooks, and the recording execution context
//! - [`validation`]: stateless admission checks for pending transactions
//! - [`execution`]: unproven block execution and metadata derivation
//! - [`trace_service`]: per-transaction proving inputs

pub mod error;
pub mod runtime;
pub mod validation;
pub mod execution;
pub mod trace;
pub mod trace_service;

pub use error::{EngineError, EngineResult, RuntimeError, RuntimeResult};
pub use execution::{
    apply_genesis_state, apply_state_transitions, execute_with_preload, ExecutedBlock,
    TransactionExecutionResult, TransactionExecutionService, TransactionOutcome,
};
pub use runtime::{
    FeeConfig, MethodExecution, MethodFee, MethodIdResolver, PreFilledState, Runtime,
    RuntimeContext, RuntimeModule, StateReader, TransactionHook,
};
pub use trace::{
    BlockExecutionData, BlockProverParameters, BlockTransactionPosition, RuntimeProofParameters,
    StateTransitionProofParameters, TransactionTrace,
};
pub use trace_service::TransactionTraceService;
pub use validation::{validate_transaction, DEFAULT_MAX_ARGS_LEN};
