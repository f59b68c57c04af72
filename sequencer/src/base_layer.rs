//! Settlement-layer hand-off.

use async_trait::async_trait;
use tessera_primitives::{hash_to_hex, ComputedBlock};
use tracing::info;

use crate::error::SequencerResult;

/// Receives every computed block. Delivery and retries are the
/// implementation's concern.
#[async_trait]
pub trait BaseLayer: Send + Sync {
    async fn block_produced(&self, block: &ComputedBlock) -> SequencerResult<()>;
}

/// Logs computed blocks and drops them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBaseLayer;

#[async_trait]
impl BaseLayer for NoopBaseLayer {
    async fn block_produced(&self, block: &ComputedBlock) -> SequencerResult<()> {
        info!(
            id = %hash_to_hex(&block.id()),
            height = ?block.height(),
            txs = block.tx_count(),
            proof = %block.attestation.proof,
            "computed block handed to base layer"
        );
        Ok(())
    }
}
