//! Map-reduce proving of one cycle's transactions.
//!
//! Every transaction proves independently: its state-transition batches
//! and its runtime call map concurrently, the batches fold into one
//! state-transition attestation, and the block step pairs the two. Block
//! attestations are reduced as they arrive: each new one is merged with
//! any adjacent attestation already waiting, so the completion order of
//! the map tasks does not matter. Any failure aborts the whole run.

use std::sync::Arc;

use futures::future::try_join_all;
use futures::stream::{FuturesUnordered, StreamExt};
use tessera_engine::{StateTransitionProofParameters, TransactionTrace};
use tessera_primitives::{BlockAttestation, StateTransitionAttestation};
use tracing::{debug, info};

use crate::error::{ProverError, ProverResult};
use crate::prover::Prover;
use crate::queue::LocalTaskQueue;
use crate::task::{MapReduceTask, MappingTask};
use crate::tasks::{BlockProvingTask, PairingInput, RuntimeProvingTask, StateTransitionTask};

pub struct BlockTaskFlow {
    queue: LocalTaskQueue,
    state_transitions: Arc<StateTransitionTask>,
    runtime: Arc<RuntimeProvingTask>,
    block: Arc<BlockProvingTask>,
}

impl BlockTaskFlow {
    pub fn new(prover: Arc<dyn Prover>, queue: LocalTaskQueue) -> Self {
        Self {
            queue,
            state_transitions: Arc::new(StateTransitionTask::new(prover.clone())),
            runtime: Arc::new(RuntimeProvingTask::new(prover.clone())),
            block: Arc::new(BlockProvingTask::new(prover)),
        }
    }

    /// Prove `traces`, in cycle order, into one block attestation.
    pub async fn prove(&self, traces: Vec<TransactionTrace>) -> ProverResult<BlockAttestation> {
        if traces.is_empty() {
            return Err(ProverError::EmptyFlow);
        }
        futures::try_join!(
            self.state_transitions.prepare(),
            self.runtime.prepare(),
            self.block.prepare(),
        )?;

        let total = traces.len();
        let mut pending: FuturesUnordered<_> = traces
            .into_iter()
            .enumerate()
            .map(|(index, trace)| async move { (index, self.prove_transaction(trace).await) })
            .collect();

        let mut waiting: Vec<BlockAttestation> = Vec::new();
        while let Some((index, result)) = pending.next().await {
            let attestation = result?;
            debug!(index, total, "transaction proven");
            self.absorb(&mut waiting, attestation).await?;
        }

        match waiting.len() {
            1 => {
                let attestation = waiting.remove(0);
                info!(
                    transactions = total,
                    input = %attestation.public_input,
                    output = %attestation.public_output,
                    "block attestation complete"
                );
                Ok(attestation)
            }
            remaining => Err(ProverError::Incomplete { remaining }),
        }
    }

    /// Merge `attestation` with every adjacent attestation in `waiting`.
    async fn absorb(
        &self,
        waiting: &mut Vec<BlockAttestation>,
        mut attestation: BlockAttestation,
    ) -> ProverResult<()> {
        while let Some(pos) = waiting
            .iter()
            .position(|other| self.block.reducible(other, &attestation))
        {
            let other = waiting.swap_remove(pos);
            attestation = self
                .queue
                .reduce(self.block.clone(), other, attestation)
                .await?;
        }
        waiting.push(attestation);
        Ok(())
    }

    async fn prove_transaction(&self, trace: TransactionTrace) -> ProverResult<BlockAttestation> {
        let TransactionTrace {
            state_transitions,
            runtime,
            block_prover,
        } = trace;

        let (state_transitions, runtime) = futures::try_join!(
            self.prove_state_transitions(state_transitions),
            self.queue.map(self.runtime.clone(), runtime),
        )?;

        self.queue
            .map(
                self.block.clone(),
                PairingInput {
                    params: block_prover,
                    state_transitions,
                    runtime,
                },
            )
            .await
    }

    /// Batches of one transaction, folded left in order.
    async fn prove_state_transitions(
        &self,
        batches: Vec<StateTransitionProofParameters>,
    ) -> ProverResult<StateTransitionAttestation> {
        let proofs = try_join_all(
            batches
                .into_iter()
                .map(|batch| self.queue.map(self.state_transitions.clone(), batch)),
        )
        .await?;

        let mut proofs = proofs.into_iter();
        let mut acc = proofs.next().ok_or(ProverError::EmptyFlow)?;
        for next in proofs {
            if !self.state_transitions.reducible(&acc, &next) {
                return Err(ProverError::NotReducible {
                    task: self.state_transitions.name(),
                    left: format!("{:?}", acc.public_output),
                    right: format!("{:?}", next.public_input),
                });
            }
            acc = self
                .queue
                .reduce(self.state_transitions.clone(), acc, next)
                .await?;
        }
        Ok(acc)
    }
}
