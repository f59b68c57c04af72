//! Per-transaction trace generation for the proving pipeline.
//!
//! Tracing re-executes a transaction against the caller's staged layers
//! and records, alongside the execution, the Merkle witnesses its state
//! transitions need. Both layers advance as a side effect, so the next
//! transaction's trace starts where this one ended. Durable stores are
//! never written here.

use std::sync::Arc;

use tessera_primitives::hash_list::STATE_TRANSITIONS_TAG;
use tessera_primitives::merkle::{leaf_index, MerkleTreeStore};
use tessera_primitives::{
    short_hex, BlockCommitment, Hash, MerkleWitness, NetworkState, ProvableHashList,
    ProvableStateTransition, RollupMerkleTree, StateTransition, StateTransitionCommitment,
    Transaction, DEFAULT_ST_BATCH_SIZE,
};
use tessera_store::{CachedMerkleStore, CachedStateStore};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::execution::{apply_state_transitions, execute_with_preload, TransactionOutcome};
use crate::runtime::Runtime;
use crate::trace::{
    BlockExecutionData, BlockProverParameters, BlockTransactionPosition, RuntimeProofParameters,
    StateTransitionProofParameters, TransactionTrace,
};

pub struct TransactionTraceService {
    runtime: Arc<Runtime>,
    tree_height: usize,
    batch_size: usize,
}

impl TransactionTraceService {
    pub fn new(runtime: Arc<Runtime>, tree_height: usize) -> Self {
        Self::with_batch_size(runtime, tree_height, DEFAULT_ST_BATCH_SIZE)
    }

    /// `batch_size` is clamped to at least one.
    pub fn with_batch_size(runtime: Arc<Runtime>, tree_height: usize, batch_size: usize) -> Self {
        Self {
            runtime,
            tree_height,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn tree_height(&self) -> usize {
        self.tree_height
    }

    /// Trace `tx` executing under `network_state`.
    ///
    /// `transactions` is the running transaction-sequence commitment of
    /// the proving cycle; the trace records it as the block step's input
    /// and then appends this transaction.
    pub async fn create_trace(
        &self,
        tx: &Transaction,
        state: &CachedStateStore,
        merkle: &CachedMerkleStore,
        network_state: &NetworkState,
        transactions: &mut ProvableHashList,
        position: BlockTransactionPosition,
    ) -> EngineResult<TransactionTrace> {
        let exec = match execute_with_preload(&self.runtime, state, tx, network_state).await? {
            TransactionOutcome::Executed(exec) => exec,
            TransactionOutcome::Rejected { hook, reason } => {
                return Err(EngineError::HookRejected { hook, reason })
            }
        };

        let provable: Vec<ProvableStateTransition> = exec
            .state_transitions
            .iter()
            .map(StateTransition::to_provable)
            .collect();
        let paths: Vec<Hash> = provable.iter().map(|st| st.path).collect();
        merkle.preload_paths(&paths, self.tree_height).await?;

        let tree = RollupMerkleTree::new(merkle, self.tree_height)?;
        let root_before = tree.root();
        let batches = self.build_batches(&tree, &provable)?;
        apply_state_transitions(state, &exec.state_transitions);

        let runtime_tx = tx.to_runtime_transaction();
        let block_prover = BlockProverParameters {
            public_input: BlockCommitment {
                state_root: root_before,
                transactions_hash: transactions.commitment(),
                network_state_hash: network_state.hash(),
            },
            execution_data: BlockExecutionData {
                transaction: runtime_tx,
                network_state: *network_state,
            },
            position,
        };
        transactions.push(&runtime_tx.hash());

        debug!(
            tx = %short_hex(&runtime_tx.hash()),
            ?position,
            transitions = provable.len(),
            batches = batches.len(),
            status = exec.status,
            "traced transaction"
        );

        Ok(TransactionTrace {
            state_transitions: batches,
            runtime: RuntimeProofParameters {
                transaction: runtime_tx,
                args: tx.args.clone(),
                network_state: *network_state,
                state: exec.pre_state.into_iter().collect(),
            },
            block_prover,
        })
    }

    /// Split `transitions` into padded batches, applying each to `tree`.
    ///
    /// Every witness is taken before its own transition is applied, so it
    /// proves the `from` value against the root that transition starts at.
    /// A transaction without transitions still yields one (all-dummy) batch.
    fn build_batches<S: MerkleTreeStore + ?Sized>(
        &self,
        tree: &RollupMerkleTree<'_, S>,
        transitions: &[ProvableStateTransition],
    ) -> EngineResult<Vec<StateTransitionProofParameters>> {
        let mut list = ProvableHashList::new(STATE_TRANSITIONS_TAG);
        let chunks: Vec<&[ProvableStateTransition]> = if transitions.is_empty() {
            vec![&[]]
        } else {
            transitions.chunks(self.batch_size).collect()
        };

        let mut batches = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let public_input = StateTransitionCommitment {
                state_root: tree.root(),
                state_transitions_hash: list.commitment(),
            };
            let mut batch = Vec::with_capacity(self.batch_size);
            let mut merkle_witnesses = Vec::with_capacity(self.batch_size);

            for st in chunk {
                let index = leaf_index(&st.path, self.tree_height);
                merkle_witnesses.push(tree.witness(index)?);
                if st.to.is_some {
                    tree.set_leaf(index, st.to.value)?;
                }
                list.push(&st.hash());
                batch.push(*st);
            }
            batch.resize(self.batch_size, ProvableStateTransition::dummy());
            merkle_witnesses.resize(self.batch_size, MerkleWitness::default());

            batches.push(StateTransitionProofParameters {
                public_input,
                batch,
                merkle_witnesses,
            });
        }
        Ok(batches)
    }
}
