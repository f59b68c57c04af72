//! Timed driver for both producers.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::error::{SequencerError, SequencerResult};
use crate::producer::BlockProducer;
use crate::unproven::UnprovenBlockProducer;

/// Polls the unproven producer and the block producer on fixed
/// intervals until shutdown is signalled.
///
/// Failures are logged and retried on the next tick, except invariant
/// violations, which stop the trigger.
pub struct BlockTrigger {
    unproven: Arc<UnprovenBlockProducer>,
    producer: Arc<BlockProducer>,
    unproven_interval: Duration,
    block_interval: Duration,
}

impl BlockTrigger {
    pub fn new(
        unproven: Arc<UnprovenBlockProducer>,
        producer: Arc<BlockProducer>,
        unproven_interval: Duration,
        block_interval: Duration,
    ) -> Self {
        Self {
            unproven,
            producer,
            unproven_interval,
            block_interval,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> SequencerResult<()> {
        let mut unproven_tick = interval(self.unproven_interval);
        unproven_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut block_tick = interval(self.block_interval);
        block_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            unproven_ms = self.unproven_interval.as_millis() as u64,
            block_ms = self.block_interval.as_millis() as u64,
            "block trigger started"
        );
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("block trigger stopped");
                        return Ok(());
                    }
                }
                _ = unproven_tick.tick() => {
                    Self::handle(self.unproven.try_produce_unproven_block().await.map(|_| ()))?;
                }
                _ = block_tick.tick() => {
                    Self::handle(self.producer.produce_pending().await.map(|_| ()))?;
                }
            }
        }
    }

    fn handle(result: SequencerResult<()>) -> SequencerResult<()> {
        match result {
            Err(e) if e.is_fatal() => {
                error!(error = %e, "stopping block trigger");
                Err(e)
            }
            Err(SequencerError::EmptyBlock) | Ok(()) => Ok(()),
            Err(e) => {
                error!(error = %e, "production attempt failed, retrying next tick");
                Ok(())
            }
        }
    }
}
