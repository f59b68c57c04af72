//! Sealing the mempool into unproven blocks.
//!
//! Production is single-flight: a call made while another is running
//! returns `None` immediately. Callers poll on an interval, so an
//! overlapping call just defers to the next tick.
//!
//! Each block executes on child layers over the long-lived unproven
//! layers. The children merge upward only after the block's transactions
//! have left the mempool, so a failed attempt leaves no trace.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tessera_engine::{ExecutedBlock, Runtime, TransactionExecutionService};
use tessera_primitives::{
    short_hex, Transaction, UnprovenBlock, UnprovenBlockMetadata,
    UnprovenBlockWithPreviousMetadata,
};
use tessera_store::{CachedMerkleStore, CachedStateStore};
use tracing::{debug, info, warn};

use crate::error::{SequencerError, SequencerResult};
use crate::events::{EventBus, ProducerEvent};
use crate::guard::ProductionGuard;
use crate::mempool::Mempool;
use crate::storage::UnprovenBlockQueue;

pub struct UnprovenBlockProducer {
    mempool: Arc<dyn Mempool>,
    queue: Arc<dyn UnprovenBlockQueue>,
    executor: TransactionExecutionService,
    state: Arc<CachedStateStore>,
    merkle: Arc<CachedMerkleStore>,
    events: EventBus,
    tree_height: usize,
    in_progress: AtomicBool,
}

impl UnprovenBlockProducer {
    /// `state` and `merkle` are the unproven layers blocks build upon.
    pub fn new(
        runtime: Arc<Runtime>,
        mempool: Arc<dyn Mempool>,
        queue: Arc<dyn UnprovenBlockQueue>,
        state: Arc<CachedStateStore>,
        merkle: Arc<CachedMerkleStore>,
        events: EventBus,
        tree_height: usize,
    ) -> Self {
        Self {
            mempool,
            queue,
            executor: TransactionExecutionService::new(runtime, tree_height),
            state,
            merkle,
            events,
            tree_height,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Seal the current mempool into the next unproven block.
    ///
    /// `Ok(None)` when production is already running, the mempool is
    /// empty, or every pending transaction was rejected.
    pub async fn try_produce_unproven_block(&self) -> SequencerResult<Option<UnprovenBlock>> {
        let Some(_guard) = ProductionGuard::try_acquire(&self.in_progress) else {
            debug!("unproven block production already in progress");
            return Ok(None);
        };

        let txs = self.mempool.get_txs().await?;
        if txs.is_empty() {
            debug!("mempool empty, no unproven block produced");
            return Ok(None);
        }

        let previous = self.queue.get_newest_metadata().await?;
        let metadata = previous.unwrap_or_else(|| UnprovenBlockMetadata::genesis(self.tree_height));

        let state = CachedStateStore::new(self.state.clone());
        let merkle = CachedMerkleStore::over(self.merkle.clone());
        let executed = self
            .executor
            .create_unproven_block(&state, &txs, &metadata)
            .await?;

        if executed.block.is_empty() {
            warn!(rejected = executed.rejected.len(), "every pending transaction was rejected");
            self.remove_from_mempool(&txs).await?;
            return Ok(None);
        }

        let next = self
            .executor
            .generate_metadata_for_next_block(&executed, &merkle, &metadata)
            .await?;

        self.remove_from_mempool(&txs).await?;

        let (states, nodes) =
            futures::try_join!(state.merge_into_parent(), merkle.merge_into_parent())?;
        debug!(states, nodes, "unproven layers advanced");

        let ExecutedBlock { block, rejected, .. } = executed;
        self.queue.push_metadata(next).await?;
        self.queue
            .push_block(UnprovenBlockWithPreviousMetadata {
                block: block.clone(),
                last_block_metadata: previous,
            })
            .await?;

        info!(
            height = block.height(),
            txs = block.tx_count(),
            rejected = rejected.len(),
            root = %short_hex(&next.resulting_state_root),
            "unproven block produced"
        );
        self.events.emit(ProducerEvent::UnprovenBlockProduced(block.clone()));
        Ok(Some(block))
    }

    /// Whole-snapshot removal: rejected transactions leave with the rest.
    async fn remove_from_mempool(&self, txs: &[Transaction]) -> SequencerResult<()> {
        if !self.mempool.remove_txs(txs).await? {
            return Err(SequencerError::TxRemovalFailed { count: txs.len() });
        }
        Ok(())
    }
}
