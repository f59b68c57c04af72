mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use tessera_engine::{BlockProverParameters, RuntimeProofParameters, StateTransitionProofParameters};
use tessera_primitives::{
    BlockAttestation, BlockCommitment, NetworkState, ProofArtifact, RuntimeAttestation,
    StateTransitionAttestation, ZERO_HASH,
};
use tessera_prover::{
    build_prover, BlockTaskFlow, LocalTaskQueue, Prover, ProverError, ProverResult, ProvingMode,
};

fn flow(mode: ProvingMode) -> BlockTaskFlow {
    BlockTaskFlow::new(build_prover(mode, runtime()), LocalTaskQueue::new(4))
}

fn expected_input(block: &TracedBlock) -> BlockCommitment {
    BlockCommitment {
        state_root: block.genesis_root,
        transactions_hash: ZERO_HASH,
        network_state_hash: NetworkState::empty().hash(),
    }
}

fn expected_output(block: &TracedBlock) -> BlockCommitment {
    BlockCommitment {
        state_root: block.final_root,
        transactions_hash: block.transactions_hash,
        network_state_hash: block.network_state.hash(),
    }
}

#[tokio::test]
async fn test_three_transactions_aggregate_into_one() {
    let block = three_transfers(4).await;
    let attestation = flow(ProvingMode::Mock).prove(block.traces.clone()).await.unwrap();

    assert_eq!(attestation.public_input, expected_input(&block));
    assert_eq!(attestation.public_output, expected_output(&block));
    assert_eq!(attestation.proof, ProofArtifact::Placeholder);
}

#[tokio::test]
async fn test_digest_mode_produces_bytes() {
    let block = three_transfers(4).await;
    let attestation = flow(ProvingMode::Digest).prove(block.traces).await.unwrap();
    assert!(matches!(attestation.proof, ProofArtifact::Bytes(ref b) if b.len() == 64));
}

#[tokio::test]
async fn test_many_batches_per_transaction() {
    let block = three_transfers(1).await;
    assert!(block.traces.iter().all(|t| t.state_transitions.len() == 6));
    let attestation = flow(ProvingMode::Digest).prove(block.traces.clone()).await.unwrap();
    assert_eq!(attestation.public_output, expected_output(&block));
}

/// Delays each block step by a per-nonce amount to force a completion order.
struct DelayedProver {
    inner: Arc<dyn Prover>,
    delays_ms: Vec<u64>,
}

#[async_trait]
impl Prover for DelayedProver {
    fn mode(&self) -> ProvingMode {
        self.inner.mode()
    }

    async fn prepare(&self) -> ProverResult<()> {
        self.inner.prepare().await
    }

    async fn prove_state_transition(
        &self,
        params: &StateTransitionProofParameters,
    ) -> ProverResult<StateTransitionAttestation> {
        self.inner.prove_state_transition(params).await
    }

    async fn merge_state_transitions(
        &self,
        a: &StateTransitionAttestation,
        b: &StateTransitionAttestation,
    ) -> ProverResult<StateTransitionAttestation> {
        self.inner.merge_state_transitions(a, b).await
    }

    async fn prove_runtime(&self, params: &RuntimeProofParameters) -> ProverResult<RuntimeAttestation> {
        self.inner.prove_runtime(params).await
    }

    async fn prove_block_step(
        &self,
        params: &BlockProverParameters,
        st: &StateTransitionAttestation,
        runtime: &RuntimeAttestation,
    ) -> ProverResult<BlockAttestation> {
        let delay = self.delays_ms[params.execution_data.transaction.nonce as usize];
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.inner.prove_block_step(params, st, runtime).await
    }

    async fn merge_attestations(
        &self,
        a: &BlockAttestation,
        b: &BlockAttestation,
    ) -> ProverResult<BlockAttestation> {
        self.inner.merge_attestations(a, b).await
    }
}

#[tokio::test]
async fn test_completion_order_does_not_matter() {
    let block = three_transfers(4).await;
    for delays_ms in [vec![0, 20, 40], vec![40, 20, 0], vec![20, 0, 40], vec![40, 0, 20]] {
        let prover = Arc::new(DelayedProver {
            inner: build_prover(ProvingMode::Digest, runtime()),
            delays_ms: delays_ms.clone(),
        });
        let attestation = BlockTaskFlow::new(prover, LocalTaskQueue::new(4))
            .prove(block.traces.clone())
            .await
            .unwrap();
        assert_eq!(attestation.public_input, expected_input(&block), "delays {delays_ms:?}");
        assert_eq!(attestation.public_output, expected_output(&block), "delays {delays_ms:?}");
    }
}

#[tokio::test]
async fn test_gap_in_sequence_cannot_reduce() {
    let block = three_transfers(4).await;
    let traces = vec![block.traces[0].clone(), block.traces[2].clone()];
    let err = flow(ProvingMode::Mock).prove(traces).await.unwrap_err();
    assert!(matches!(err, ProverError::Incomplete { remaining: 2 }));
}

#[tokio::test]
async fn test_tampered_runtime_input_fails_the_run() {
    let block = three_transfers(4).await;
    let mut traces = block.traces;
    traces[1].runtime.args = tessera_engine::runtime::balances::transfer_args(&[0u8; 32], 20);
    let err = flow(ProvingMode::Mock).prove(traces).await.unwrap_err();
    assert!(matches!(err, ProverError::Constraint { circuit: "runtime", .. }));
}

#[tokio::test]
async fn test_first_transaction_without_inherited_state_fails() {
    let block = three_transfers(4).await;
    let mut traces = block.traces;
    // Pretend the block step of the opening transaction saw its own
    // network state instead of the previous block's.
    let own = block.network_state;
    traces[0].block_prover.execution_data.network_state = own;
    traces[0].block_prover.public_input.network_state_hash = own.hash();
    let err = flow(ProvingMode::Mock).prove(traces).await.unwrap_err();
    assert!(matches!(err, ProverError::Constraint { circuit: "block-step", .. }));
}

#[tokio::test]
async fn test_nothing_to_prove() {
    let err = flow(ProvingMode::Mock).prove(vec![]).await.unwrap_err();
    assert!(matches!(err, ProverError::EmptyFlow));
}
