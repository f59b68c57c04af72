//! A sequencer assembled from its configuration.

use std::sync::Arc;

use tessera_engine::{apply_genesis_state, Runtime};
use tessera_primitives::{hash_to_hex, Hash, UnprovenBlockMetadata};
use tessera_prover::{build_prover, BlockTaskFlow, LocalTaskQueue};
use tessera_store::{
    CachedMerkleStore, CachedStateStore, InMemoryAsyncMerkleTreeStore, InMemoryStateStore,
};
use tracing::info;

use crate::base_layer::BaseLayer;
use crate::config::SequencerConfig;
use crate::error::{SequencerError, SequencerResult};
use crate::events::EventBus;
use crate::mempool::PrivateMempool;
use crate::producer::BlockProducer;
use crate::storage::{InMemoryBlockStorage, UnprovenBlockQueue};
use crate::trigger::BlockTrigger;
use crate::unproven::UnprovenBlockProducer;

/// In-memory sequencer: canonical stores, the unproven layers over them,
/// the mempool, storage, and both producers.
pub struct Sequencer {
    config: SequencerConfig,
    runtime: Arc<Runtime>,
    mempool: Arc<PrivateMempool>,
    storage: Arc<InMemoryBlockStorage>,
    state: Arc<InMemoryStateStore>,
    merkle: Arc<InMemoryAsyncMerkleTreeStore>,
    events: EventBus,
    unproven: Arc<UnprovenBlockProducer>,
    producer: Arc<BlockProducer>,
}

impl Sequencer {
    /// Runtime with the balances module and the configured fees.
    pub fn new(config: SequencerConfig, base_layer: Arc<dyn BaseLayer>) -> SequencerResult<Self> {
        let runtime = Arc::new(Runtime::with_defaults(config.fees.clone()));
        Self::with_runtime(config, runtime, base_layer)
    }

    pub fn with_runtime(
        config: SequencerConfig,
        runtime: Arc<Runtime>,
        base_layer: Arc<dyn BaseLayer>,
    ) -> SequencerResult<Self> {
        config.validate()?;

        let state = Arc::new(InMemoryStateStore::new());
        let merkle = Arc::new(InMemoryAsyncMerkleTreeStore::new());
        let unproven_state = Arc::new(CachedStateStore::new(state.clone()));
        let unproven_merkle = Arc::new(CachedMerkleStore::over(merkle.clone()));

        let mempool = Arc::new(PrivateMempool::new(runtime.clone(), config.max_args_len));
        let storage = Arc::new(InMemoryBlockStorage::new());
        let events = EventBus::new(config.event_capacity);

        let unproven = Arc::new(UnprovenBlockProducer::new(
            runtime.clone(),
            mempool.clone(),
            storage.clone(),
            unproven_state,
            unproven_merkle,
            events.clone(),
            config.tree_height,
        ));

        let flow = BlockTaskFlow::new(
            build_prover(config.proving_mode, runtime.clone()),
            LocalTaskQueue::new(config.worker_count),
        );
        let producer = Arc::new(BlockProducer::new(
            runtime.clone(),
            flow,
            storage.clone(),
            storage.clone(),
            base_layer,
            state.clone(),
            merkle.clone(),
            config.tree_height,
            config.st_batch_size,
        ));

        Ok(Self {
            config,
            runtime,
            mempool,
            storage,
            state,
            merkle,
            events,
            unproven,
            producer,
        })
    }

    /// Write initial state into the canonical stores and record the
    /// genesis metadata every later block builds on. Must precede the
    /// first block.
    pub async fn genesis(&self, entries: &[(Hash, Vec<u8>)]) -> SequencerResult<Hash> {
        if self.storage.get_newest_metadata().await?.is_some() {
            return Err(SequencerError::GenesisApplied);
        }

        let state = CachedStateStore::new(self.state.clone());
        let merkle = CachedMerkleStore::over(self.merkle.clone());
        let root = apply_genesis_state(&state, &merkle, entries, self.config.tree_height).await?;
        futures::try_join!(state.merge_into_parent(), merkle.merge_into_parent())?;

        self.storage
            .push_metadata(UnprovenBlockMetadata {
                resulting_state_root: root,
                ..UnprovenBlockMetadata::genesis(self.config.tree_height)
            })
            .await?;
        info!(entries = entries.len(), root = %hash_to_hex(&root), "genesis applied");
        Ok(root)
    }

    pub fn trigger(&self) -> BlockTrigger {
        BlockTrigger::new(
            self.unproven.clone(),
            self.producer.clone(),
            self.config.unproven_block_interval(),
            self.config.block_interval(),
        )
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn mempool(&self) -> &Arc<PrivateMempool> {
        &self.mempool
    }

    pub fn storage(&self) -> &Arc<InMemoryBlockStorage> {
        &self.storage
    }

    pub fn state(&self) -> &Arc<InMemoryStateStore> {
        &self.state
    }

    pub fn merkle(&self) -> &Arc<InMemoryAsyncMerkleTreeStore> {
        &self.merkle
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn unproven_producer(&self) -> &Arc<UnprovenBlockProducer> {
        &self.unproven
    }

    pub fn block_producer(&self) -> &Arc<BlockProducer> {
        &self.producer
    }
}
