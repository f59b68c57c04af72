//! Proving unproven blocks into computed blocks.
//!
//! A cycle traces every transaction of its blocks on one pair of staged
//! layers over the canonical stores, proves the traces into a single
//! attestation, and only then merges the layers down. A failed cycle
//! leaves canonical state exactly as it was.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tessera_engine::{BlockTransactionPosition, Runtime, TransactionTrace, TransactionTraceService};
use tessera_primitives::hash_list::TRANSACTIONS_TAG;
use tessera_primitives::{
    hash_to_hex, ComputedBlock, ProvableHashList, UnprovenBlockWithPreviousMetadata,
};
use tessera_prover::BlockTaskFlow;
use tessera_store::{AsyncMerkleTreeStore, AsyncStateStore, CachedMerkleStore, CachedStateStore};
use tracing::{debug, error, info, warn};

use crate::base_layer::BaseLayer;
use crate::error::{SequencerError, SequencerResult};
use crate::guard::ProductionGuard;
use crate::storage::{BlockStorage, UnprovenBlockQueue};

pub struct BlockProducer {
    queue: Arc<dyn UnprovenBlockQueue>,
    storage: Arc<dyn BlockStorage>,
    base_layer: Arc<dyn BaseLayer>,
    tracer: TransactionTraceService,
    flow: BlockTaskFlow,
    state: Arc<AsyncStateStore>,
    merkle: Arc<AsyncMerkleTreeStore>,
    tree_height: usize,
    in_progress: AtomicBool,
}

impl BlockProducer {
    /// `state` and `merkle` are the canonical stores.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        runtime: Arc<Runtime>,
        flow: BlockTaskFlow,
        queue: Arc<dyn UnprovenBlockQueue>,
        storage: Arc<dyn BlockStorage>,
        base_layer: Arc<dyn BaseLayer>,
        state: Arc<AsyncStateStore>,
        merkle: Arc<AsyncMerkleTreeStore>,
        tree_height: usize,
        st_batch_size: usize,
    ) -> Self {
        Self {
            queue,
            storage,
            base_layer,
            tracer: TransactionTraceService::with_batch_size(runtime, tree_height, st_batch_size),
            flow,
            state,
            merkle,
            tree_height,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Prove every pending unproven block and drop them from the queue.
    ///
    /// `Ok(None)` when nothing is pending or a cycle is already running.
    pub async fn produce_pending(&self) -> SequencerResult<Option<ComputedBlock>> {
        let pending = self.queue.pending_blocks().await?;
        if pending.is_empty() {
            return Ok(None);
        }
        let count = pending.len();
        let computed = self.create_block(pending).await?;
        if computed.is_some() {
            self.queue.drop_blocks(count).await?;
        }
        Ok(computed)
    }

    /// Run one proving cycle over `blocks`.
    ///
    /// `Ok(None)` if another cycle is in flight. Zero transactions across
    /// all blocks is [`SequencerError::EmptyBlock`].
    pub async fn create_block(
        &self,
        blocks: Vec<UnprovenBlockWithPreviousMetadata>,
    ) -> SequencerResult<Option<ComputedBlock>> {
        let Some(_guard) = ProductionGuard::try_acquire(&self.in_progress) else {
            debug!("block production already in progress");
            return Ok(None);
        };

        match self.compute_block(blocks).await {
            Ok(block) => Ok(Some(block)),
            Err(SequencerError::EmptyBlock) => {
                debug!("{}", SequencerError::EmptyBlock);
                Err(SequencerError::EmptyBlock)
            }
            Err(e) => {
                error!(error = %e, "block production failed");
                Err(e)
            }
        }
    }

    async fn compute_block(
        &self,
        blocks: Vec<UnprovenBlockWithPreviousMetadata>,
    ) -> SequencerResult<ComputedBlock> {
        let tx_count: usize = blocks.iter().map(|b| b.block.tx_count()).sum();
        if tx_count == 0 {
            return Err(SequencerError::EmptyBlock);
        }

        let state = CachedStateStore::new(self.state.clone());
        let merkle = CachedMerkleStore::over(self.merkle.clone());
        let traces = self.trace_blocks(&blocks, &state, &merkle).await?;

        let attestation = self.flow.prove(traces).await?;

        let (states, nodes) =
            futures::try_join!(state.merge_into_parent(), merkle.merge_into_parent())?;
        debug!(states, nodes, "canonical stores advanced");

        let computed = ComputedBlock {
            blocks: blocks.into_iter().map(|b| b.block).collect(),
            attestation,
        };
        self.storage.push_block(computed.clone()).await?;
        if let Err(e) = self.base_layer.block_produced(&computed).await {
            warn!(error = %e, "base layer did not accept computed block");
        }

        info!(
            id = %hash_to_hex(&computed.id()),
            height = ?computed.height(),
            blocks = computed.blocks.len(),
            txs = tx_count,
            "computed block produced"
        );
        Ok(computed)
    }

    /// One trace per transaction, threading both layers and the
    /// transaction-sequence commitment through every block in order.
    async fn trace_blocks(
        &self,
        blocks: &[UnprovenBlockWithPreviousMetadata],
        state: &CachedStateStore,
        merkle: &CachedMerkleStore,
    ) -> SequencerResult<Vec<TransactionTrace>> {
        let mut sequence = ProvableHashList::new(TRANSACTIONS_TAG);
        let mut traces = Vec::new();

        for entry in blocks {
            let block = &entry.block;
            let previous = entry.previous_or_genesis(self.tree_height);
            let len = block.tx_count();

            for (index, tx) in block.transactions.iter().enumerate() {
                let position = BlockTransactionPosition::from_index(index, len);
                let mut trace = self
                    .tracer
                    .create_trace(tx, state, merkle, &block.network_state, &mut sequence, position)
                    .await?;
                trace.inherit_network_state(&previous.resulting_network_state);
                traces.push(trace);
            }
            debug!(height = block.height(), txs = len, "block traced");
        }
        Ok(traces)
    }
}
