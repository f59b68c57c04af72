//! Block and metadata storage collaborators.

use async_trait::async_trait;
use parking_lot::RwLock;
use tessera_primitives::{ComputedBlock, UnprovenBlockMetadata, UnprovenBlockWithPreviousMetadata};

use crate::error::{SequencerError, SequencerResult};

/// Unproven blocks awaiting proof, and the metadata log they extend.
#[async_trait]
pub trait UnprovenBlockQueue: Send + Sync {
    async fn push_metadata(&self, metadata: UnprovenBlockMetadata) -> SequencerResult<()>;

    /// Metadata of the highest block, if any block or genesis exists.
    async fn get_newest_metadata(&self) -> SequencerResult<Option<UnprovenBlockMetadata>>;

    async fn push_block(&self, block: UnprovenBlockWithPreviousMetadata) -> SequencerResult<()>;

    /// Oldest first.
    async fn pending_blocks(&self) -> SequencerResult<Vec<UnprovenBlockWithPreviousMetadata>>;

    /// Drop the `count` oldest pending blocks once they are proven.
    async fn drop_blocks(&self, count: usize) -> SequencerResult<()>;
}

#[async_trait]
pub trait BlockStorage: Send + Sync {
    async fn push_block(&self, block: ComputedBlock) -> SequencerResult<()>;

    async fn latest_block(&self) -> SequencerResult<Option<ComputedBlock>>;

    async fn block_count(&self) -> SequencerResult<usize>;
}

#[derive(Default)]
struct Inner {
    metadata: Vec<UnprovenBlockMetadata>,
    pending: Vec<UnprovenBlockWithPreviousMetadata>,
    blocks: Vec<ComputedBlock>,
}

/// Both storage roles, in memory.
#[derive(Default)]
pub struct InMemoryBlockStorage {
    inner: RwLock<Inner>,
}

impl InMemoryBlockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every metadata entry pushed so far, oldest first.
    pub fn metadata_log(&self) -> Vec<UnprovenBlockMetadata> {
        self.inner.read().metadata.clone()
    }
}

#[async_trait]
impl UnprovenBlockQueue for InMemoryBlockStorage {
    async fn push_metadata(&self, metadata: UnprovenBlockMetadata) -> SequencerResult<()> {
        let mut inner = self.inner.write();
        if let Some(newest) = inner.metadata.last() {
            if metadata.height <= newest.height {
                return Err(SequencerError::Storage(format!(
                    "metadata height {} does not extend newest height {}",
                    metadata.height, newest.height
                )));
            }
        }
        inner.metadata.push(metadata);
        Ok(())
    }

    async fn get_newest_metadata(&self) -> SequencerResult<Option<UnprovenBlockMetadata>> {
        Ok(self.inner.read().metadata.last().copied())
    }

    async fn push_block(&self, block: UnprovenBlockWithPreviousMetadata) -> SequencerResult<()> {
        self.inner.write().pending.push(block);
        Ok(())
    }

    async fn pending_blocks(&self) -> SequencerResult<Vec<UnprovenBlockWithPreviousMetadata>> {
        Ok(self.inner.read().pending.clone())
    }

    async fn drop_blocks(&self, count: usize) -> SequencerResult<()> {
        let mut inner = self.inner.write();
        if count > inner.pending.len() {
            return Err(SequencerError::Storage(format!(
                "cannot drop {count} of {} pending blocks",
                inner.pending.len()
            )));
        }
        inner.pending.drain(..count);
        Ok(())
    }
}

#[async_trait]
impl BlockStorage for InMemoryBlockStorage {
    async fn push_block(&self, block: ComputedBlock) -> SequencerResult<()> {
        self.inner.write().blocks.push(block);
        Ok(())
    }

    async fn latest_block(&self) -> SequencerResult<Option<ComputedBlock>> {
        Ok(self.inner.read().blocks.last().cloned())
    }

    async fn block_count(&self) -> SequencerResult<usize> {
        Ok(self.inner.read().blocks.len())
    }
}
