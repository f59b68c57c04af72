//! The proving tasks of one block.
//!
//! | task | map | reduce |
//! |---|---|---|
//! | [`StateTransitionTask`] | one padded batch | consecutive batches of a transaction |
//! | [`RuntimeProvingTask`] | one method call over its pinned pre-state | |
//! | [`BlockProvingTask`] | one transaction's paired ST + runtime attestations | adjacent block attestations |

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tessera_engine::{BlockProverParameters, RuntimeProofParameters, StateTransitionProofParameters};
use tessera_primitives::attestation::Chained;
use tessera_primitives::{
    reducible, reduction_order, Attestation, BlockAttestation, ReductionOrder, RuntimeAttestation,
    StateTransitionAttestation,
};
use tracing::trace;

use crate::error::{ProverError, ProverResult};
use crate::prover::Prover;
use crate::task::{MapReduceTask, MappingTask};

/// Orders `a` and `b` for a merge, or reports them as not adjacent.
fn ordered<C: Chained + std::fmt::Debug>(
    task: &'static str,
    a: Attestation<C, C>,
    b: Attestation<C, C>,
) -> ProverResult<(Attestation<C, C>, Attestation<C, C>)> {
    match reduction_order(&a, &b) {
        Some(ReductionOrder::Forward) => Ok((a, b)),
        Some(ReductionOrder::Reverse) => {
            trace!(task, "reducing in reverse order");
            Ok((b, a))
        }
        None => Err(ProverError::NotReducible {
            task,
            left: format!("{:?}", a.public_output),
            right: format!("{:?}", b.public_input),
        }),
    }
}

pub struct StateTransitionTask {
    prover: Arc<dyn Prover>,
}

impl StateTransitionTask {
    pub fn new(prover: Arc<dyn Prover>) -> Self {
        Self { prover }
    }
}

#[async_trait]
impl MappingTask for StateTransitionTask {
    type Input = StateTransitionProofParameters;
    type Output = StateTransitionAttestation;

    fn name(&self) -> &'static str {
        "state-transition"
    }

    async fn prepare(&self) -> ProverResult<()> {
        self.prover.prepare().await
    }

    async fn map(&self, input: Self::Input) -> ProverResult<Self::Output> {
        self.prover.prove_state_transition(&input).await
    }
}

#[async_trait]
impl MapReduceTask for StateTransitionTask {
    fn reducible(&self, a: &Self::Output, b: &Self::Output) -> bool {
        reducible(a, b)
    }

    async fn reduce(&self, a: Self::Output, b: Self::Output) -> ProverResult<Self::Output> {
        let (first, second) = ordered(self.name(), a, b)?;
        self.prover.merge_state_transitions(&first, &second).await
    }
}

pub struct RuntimeProvingTask {
    prover: Arc<dyn Prover>,
}

impl RuntimeProvingTask {
    pub fn new(prover: Arc<dyn Prover>) -> Self {
        Self { prover }
    }
}

#[async_trait]
impl MappingTask for RuntimeProvingTask {
    type Input = RuntimeProofParameters;
    type Output = RuntimeAttestation;

    fn name(&self) -> &'static str {
        "runtime"
    }

    async fn prepare(&self) -> ProverResult<()> {
        self.prover.prepare().await
    }

    async fn map(&self, input: Self::Input) -> ProverResult<Self::Output> {
        self.prover.prove_runtime(&input).await
    }
}

/// Input of a block step: both attestations of the same transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingInput {
    pub params: BlockProverParameters,
    pub state_transitions: StateTransitionAttestation,
    pub runtime: RuntimeAttestation,
}

pub struct BlockProvingTask {
    prover: Arc<dyn Prover>,
}

impl BlockProvingTask {
    pub fn new(prover: Arc<dyn Prover>) -> Self {
        Self { prover }
    }
}

#[async_trait]
impl MappingTask for BlockProvingTask {
    type Input = PairingInput;
    type Output = BlockAttestation;

    fn name(&self) -> &'static str {
        "block"
    }

    async fn prepare(&self) -> ProverResult<()> {
        self.prover.prepare().await
    }

    async fn map(&self, input: Self::Input) -> ProverResult<Self::Output> {
        self.prover
            .prove_block_step(&input.params, &input.state_transitions, &input.runtime)
            .await
    }
}

#[async_trait]
impl MapReduceTask for BlockProvingTask {
    fn reducible(&self, a: &Self::Output, b: &Self::Output) -> bool {
        reducible(a, b)
    }

    async fn reduce(&self, a: Self::Output, b: Self::Output) -> ProverResult<Self::Output> {
        let (first, second) = ordered(self.name(), a, b)?;
        self.prover.merge_attestations(&first, &second).await
    }
}
