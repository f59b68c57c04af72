//! Transaction execution against staged state.
//!
//! The runtime itself only reads memory. `execute_with_preload` bridges it
//! to an asynchronous [`CachedStateStore`]: execute, preload whatever
//! the attempt reported missing, and execute again until the transaction
//! completes. [`TransactionExecutionService`] builds unproven blocks and
//! the metadata describing their resulting state on top of that.

use std::collections::BTreeMap;
use std::sync::Arc;

use tessera_primitives::hash_list::ETERNAL_TRANSACTIONS_TAG;
use tessera_primitives::merkle::{hash_leaf, leaf_index};
use tessera_primitives::{
    short_hex, Hash, NetworkState, ProvableHashList, RollupMerkleTree, StateTransition,
    Transaction, UnprovenBlock, UnprovenBlockMetadata,
};
use tessera_store::{CachedMerkleStore, CachedStateStore};
use tracing::{debug, trace, warn};

use crate::error::{EngineError, EngineResult, RuntimeError};
use crate::runtime::{ExecutionAttempt, MethodExecution, Runtime};

/// Upper bound on execute/preload rounds for a single transaction.
pub const MAX_PRELOAD_PASSES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Executed(MethodExecution),
    Rejected { hook: &'static str, reason: RuntimeError },
}

/// Execute `tx` over `state`, preloading missing paths between attempts.
///
/// Nothing is written to `state` beyond preloaded reads.
pub async fn execute_with_preload(
    runtime: &Runtime,
    state: &CachedStateStore,
    tx: &Transaction,
    network_state: &NetworkState,
) -> EngineResult<TransactionOutcome> {
    let runtime_tx = tx.to_runtime_transaction();
    for pass in 1..=MAX_PRELOAD_PASSES {
        match runtime.try_execute(state, &runtime_tx, &tx.args, network_state)? {
            ExecutionAttempt::Complete(exec) => return Ok(TransactionOutcome::Executed(exec)),
            ExecutionAttempt::Rejected { hook, reason } => {
                return Ok(TransactionOutcome::Rejected { hook, reason })
            }
            ExecutionAttempt::NeedsState(paths) => {
                trace!(pass, missing = paths.len(), "preloading state for transaction");
                state.preload(&paths).await?;
            }
        }
    }
    Err(EngineError::PreloadExhausted {
        passes: MAX_PRELOAD_PASSES,
    })
}

/// Stage every write of `transitions` into `state`.
pub fn apply_state_transitions(state: &CachedStateStore, transitions: &[StateTransition]) {
    for st in transitions {
        if let Some(to) = &st.to {
            state.set(st.path, Some(to.clone()));
        }
    }
}

/// Set the leaves of `writes` in the tree over `merkle` and return the new root.
pub async fn apply_writes_to_tree(
    merkle: &CachedMerkleStore,
    writes: &BTreeMap<Hash, Vec<u8>>,
    tree_height: usize,
) -> EngineResult<Hash> {
    let paths: Vec<Hash> = writes.keys().copied().collect();
    merkle.preload_paths(&paths, tree_height).await?;

    let tree = RollupMerkleTree::new(merkle, tree_height)?;
    for (path, value) in writes {
        tree.set_leaf(leaf_index(path, tree_height), hash_leaf(path, value))?;
    }
    Ok(tree.root())
}

/// Stage initial state into both layers; returns the resulting root.
pub async fn apply_genesis_state(
    state: &CachedStateStore,
    merkle: &CachedMerkleStore,
    entries: &[(Hash, Vec<u8>)],
    tree_height: usize,
) -> EngineResult<Hash> {
    let mut writes = BTreeMap::new();
    for (path, value) in entries {
        state.set(*path, Some(value.clone()));
        writes.insert(*path, value.clone());
    }
    apply_writes_to_tree(merkle, &writes, tree_height).await
}

/// Execution record of one included transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionExecutionResult {
    pub tx: Transaction,
    pub status: bool,
    pub status_message: Option<String>,
    pub state_transitions: Vec<StateTransition>,
}

/// An unproven block together with what executing it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedBlock {
    pub block: UnprovenBlock,
    pub results: Vec<TransactionExecutionResult>,
    /// Transactions a hook rejected; not part of the block.
    pub rejected: Vec<Transaction>,
}

impl ExecutedBlock {
    /// Final value of every path written by the block.
    pub fn writes(&self) -> BTreeMap<Hash, Vec<u8>> {
        let mut out = BTreeMap::new();
        for result in &self.results {
            for st in &result.state_transitions {
                if let Some(to) = &st.to {
                    out.insert(st.path, to.clone());
                }
            }
        }
        out
    }
}

pub struct TransactionExecutionService {
    runtime: Arc<Runtime>,
    tree_height: usize,
}

impl TransactionExecutionService {
    pub fn new(runtime: Arc<Runtime>, tree_height: usize) -> Self {
        Self {
            runtime,
            tree_height,
        }
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    /// Execute `txs` in order on `state`, building the block that follows `metadata`.
    ///
    /// Writes of included transactions are staged into `state` as they
    /// execute, so later transactions see them.
    pub async fn create_unproven_block(
        &self,
        state: &CachedStateStore,
        txs: &[Transaction],
        metadata: &UnprovenBlockMetadata,
    ) -> EngineResult<ExecutedBlock> {
        let network_state = metadata.next_network_state();
        let mut included = Vec::with_capacity(txs.len());
        let mut results = Vec::with_capacity(txs.len());
        let mut rejected = Vec::new();

        for tx in txs {
            match execute_with_preload(&self.runtime, state, tx, &network_state).await? {
                TransactionOutcome::Executed(exec) => {
                    apply_state_transitions(state, &exec.state_transitions);
                    if !exec.status {
                        debug!(
                            tx = %short_hex(&tx.hash()),
                            reason = exec.status_message.as_deref().unwrap_or_default(),
                            "transaction method failed"
                        );
                    }
                    included.push(tx.clone());
                    results.push(TransactionExecutionResult {
                        tx: tx.clone(),
                        status: exec.status,
                        status_message: exec.status_message,
                        state_transitions: exec.state_transitions,
                    });
                }
                TransactionOutcome::Rejected { hook, reason } => {
                    warn!(tx = %short_hex(&tx.hash()), hook, %reason, "excluding rejected transaction");
                    rejected.push(tx.clone());
                }
            }
        }

        Ok(ExecutedBlock {
            block: UnprovenBlock::new(network_state, included),
            results,
            rejected,
        })
    }

    /// Apply the block's writes to `merkle` and describe the resulting state.
    pub async fn generate_metadata_for_next_block(
        &self,
        executed: &ExecutedBlock,
        merkle: &CachedMerkleStore,
        metadata: &UnprovenBlockMetadata,
    ) -> EngineResult<UnprovenBlockMetadata> {
        let resulting_state_root =
            apply_writes_to_tree(merkle, &executed.writes(), self.tree_height).await?;

        let mut eternal =
            ProvableHashList::from_commitment(ETERNAL_TRANSACTIONS_TAG, metadata.eternal_transactions_hash);
        for tx in &executed.block.transactions {
            eternal.push(&tx.hash());
        }

        Ok(UnprovenBlockMetadata {
            height: executed.block.height(),
            resulting_network_state: executed.block.network_state,
            resulting_state_root,
            block_transactions_hash: executed.block.transactions_hash,
            eternal_transactions_hash: eternal.commitment(),
        })
    }
}
