//! Sequencer configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tessera_engine::{FeeConfig, DEFAULT_MAX_ARGS_LEN};
use tessera_primitives::merkle::MAX_TREE_HEIGHT;
use tessera_primitives::{DEFAULT_ST_BATCH_SIZE, DEFAULT_TREE_HEIGHT};
use tessera_prover::ProvingMode;

use crate::error::{SequencerError, SequencerResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerConfig {
    /// How often the mempool is sealed into an unproven block.
    pub unproven_block_interval_ms: u64,
    /// How often pending unproven blocks are proven.
    pub block_interval_ms: u64,
    pub proving_mode: ProvingMode,
    pub worker_count: usize,
    /// State transitions per state-transition proof.
    pub st_batch_size: usize,
    pub tree_height: usize,
    pub max_args_len: usize,
    pub event_capacity: usize,
    pub fees: FeeConfig,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            unproven_block_interval_ms: 1_000,
            block_interval_ms: 5_000,
            proving_mode: ProvingMode::Mock,
            worker_count: 4,
            st_batch_size: DEFAULT_ST_BATCH_SIZE,
            tree_height: DEFAULT_TREE_HEIGHT,
            max_args_len: DEFAULT_MAX_ARGS_LEN,
            event_capacity: 64,
            fees: FeeConfig::default(),
        }
    }
}

impl SequencerConfig {
    pub fn from_json_str(json: &str) -> SequencerResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SequencerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SequencerResult<()> {
        if self.st_batch_size == 0 {
            return Err(SequencerError::Config("st_batch_size must be positive".into()));
        }
        if self.worker_count == 0 {
            return Err(SequencerError::Config("worker_count must be positive".into()));
        }
        if !(2..=MAX_TREE_HEIGHT).contains(&self.tree_height) {
            return Err(SequencerError::Config(format!(
                "tree_height must be in 2..={MAX_TREE_HEIGHT}, got {}",
                self.tree_height
            )));
        }
        if self.event_capacity == 0 {
            return Err(SequencerError::Config("event_capacity must be positive".into()));
        }
        Ok(())
    }

    pub fn unproven_block_interval(&self) -> Duration {
        Duration::from_millis(self.unproven_block_interval_ms)
    }

    pub fn block_interval(&self) -> Duration {
        Duration::from_millis(self.block_interval_ms)
    }
}
