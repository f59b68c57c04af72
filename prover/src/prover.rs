//! The `Prover` capability.
//!
//! [`CircuitProver`] checks every circuit's constraints itself and hands
//! the satisfied instance to a [`ProofBackend`] for the artifact. Which
//! backend is used is fixed when the prover is built.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tessera_engine::{
    BlockProverParameters, Runtime, RuntimeProofParameters, StateTransitionProofParameters,
};
use tessera_primitives::attestation::Chained;
use tessera_primitives::{
    Attestation, BlockAttestation, Hash, RuntimeAttestation, StateTransitionAttestation,
};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::backend::{DigestBackend, PlaceholderBackend, ProofBackend, ProvingMode};
use crate::circuits::{
    block_merge_circuit, block_step_circuit, merge_circuit, runtime_circuit,
    state_transition_circuit, BLOCK_MERGE_CIRCUIT, BLOCK_STEP_CIRCUIT, RUNTIME_CIRCUIT,
    STATE_TRANSITION_CIRCUIT, STATE_TRANSITION_MERGE_CIRCUIT,
};
use crate::error::{ProverError, ProverResult};

/// Deterministic proof generation. No method mutates external state.
#[async_trait]
pub trait Prover: Send + Sync {
    fn mode(&self) -> ProvingMode;

    /// One-time setup; repeated calls are no-ops.
    async fn prepare(&self) -> ProverResult<()>;

    async fn prove_state_transition(
        &self,
        params: &StateTransitionProofParameters,
    ) -> ProverResult<StateTransitionAttestation>;

    /// Fold two consecutive batch attestations of the same transaction.
    async fn merge_state_transitions(
        &self,
        a: &StateTransitionAttestation,
        b: &StateTransitionAttestation,
    ) -> ProverResult<StateTransitionAttestation>;

    async fn prove_runtime(&self, params: &RuntimeProofParameters) -> ProverResult<RuntimeAttestation>;

    async fn prove_block_step(
        &self,
        params: &BlockProverParameters,
        st: &StateTransitionAttestation,
        runtime: &RuntimeAttestation,
    ) -> ProverResult<BlockAttestation>;

    /// Compose `a` then `b`; `a`'s output must be `b`'s input.
    async fn merge_attestations(
        &self,
        a: &BlockAttestation,
        b: &BlockAttestation,
    ) -> ProverResult<BlockAttestation>;
}

/// Build the prover for `mode`.
pub fn build_prover(mode: ProvingMode, runtime: Arc<Runtime>) -> Arc<dyn Prover> {
    match mode {
        ProvingMode::Mock => Arc::new(CircuitProver::new(runtime, PlaceholderBackend)),
        ProvingMode::Digest => Arc::new(CircuitProver::new(runtime, DigestBackend)),
    }
}

pub struct CircuitProver<B> {
    runtime: Arc<Runtime>,
    backend: B,
    prepared: OnceCell<()>,
}

impl<B: ProofBackend> CircuitProver<B> {
    pub fn new(runtime: Arc<Runtime>, backend: B) -> Self {
        Self {
            runtime,
            backend,
            prepared: OnceCell::new(),
        }
    }

    fn public_io<I: Serialize, O: Serialize>(input: &I, output: &O) -> ProverResult<Vec<u8>> {
        Ok(serde_json::to_vec(&(input, output))?)
    }

    fn witness_digest<W: Serialize + ?Sized>(witness: &W) -> ProverResult<Hash> {
        Ok(*blake3::hash(&serde_json::to_vec(witness)?).as_bytes())
    }

    fn attest<I: Serialize, O: Serialize, W: Serialize + ?Sized>(
        &self,
        circuit: &'static str,
        public_input: I,
        public_output: O,
        witness: &W,
    ) -> ProverResult<Attestation<I, O>> {
        let io = Self::public_io(&public_input, &public_output)?;
        let proof = self.backend.prove(circuit, &io, &Self::witness_digest(witness)?);
        Ok(Attestation {
            public_input,
            public_output,
            proof,
        })
    }

    fn check_proof<I: Serialize, O: Serialize>(
        &self,
        circuit: &'static str,
        attestation: &Attestation<I, O>,
    ) -> ProverResult<()> {
        let io = Self::public_io(&attestation.public_input, &attestation.public_output)?;
        if self.backend.verify(circuit, &io, &attestation.proof) {
            Ok(())
        } else {
            Err(ProverError::InvalidProof { circuit })
        }
    }

    /// Children of a merge are either leaf proofs or earlier merges.
    fn check_child<C: Serialize>(
        &self,
        circuits: [&'static str; 2],
        attestation: &Attestation<C, C>,
    ) -> ProverResult<()> {
        if self.check_proof(circuits[0], attestation).is_ok() {
            return Ok(());
        }
        self.check_proof(circuits[1], attestation)
    }

    fn merge<C: Chained + Copy + Serialize>(
        &self,
        circuit: &'static str,
        leaf_circuit: &'static str,
        a: &Attestation<C, C>,
        b: &Attestation<C, C>,
        composed: Result<(C, C), String>,
    ) -> ProverResult<Attestation<C, C>> {
        self.check_child([leaf_circuit, circuit], a)?;
        self.check_child([leaf_circuit, circuit], b)?;
        let (input, output) = composed.map_err(|reason| ProverError::constraint(circuit, reason))?;
        self.attest(circuit, input, output, &(&a.proof, &b.proof))
    }
}

#[async_trait]
impl<B: ProofBackend> Prover for CircuitProver<B> {
    fn mode(&self) -> ProvingMode {
        self.backend.mode()
    }

    async fn prepare(&self) -> ProverResult<()> {
        self.prepared
            .get_or_init(|| async {
                info!(mode = %self.backend.mode(), "circuits prepared");
            })
            .await;
        Ok(())
    }

    async fn prove_state_transition(
        &self,
        params: &StateTransitionProofParameters,
    ) -> ProverResult<StateTransitionAttestation> {
        let output = state_transition_circuit(params)
            .map_err(|reason| ProverError::constraint(STATE_TRANSITION_CIRCUIT, reason))?;
        self.attest(STATE_TRANSITION_CIRCUIT, params.public_input, output, params)
    }

    async fn merge_state_transitions(
        &self,
        a: &StateTransitionAttestation,
        b: &StateTransitionAttestation,
    ) -> ProverResult<StateTransitionAttestation> {
        self.merge(
            STATE_TRANSITION_MERGE_CIRCUIT,
            STATE_TRANSITION_CIRCUIT,
            a,
            b,
            merge_circuit(a, b),
        )
    }

    async fn prove_runtime(&self, params: &RuntimeProofParameters) -> ProverResult<RuntimeAttestation> {
        let output = runtime_circuit(&self.runtime, params)
            .map_err(|reason| ProverError::constraint(RUNTIME_CIRCUIT, reason))?;
        self.attest(RUNTIME_CIRCUIT, (), output, params)
    }

    async fn prove_block_step(
        &self,
        params: &BlockProverParameters,
        st: &StateTransitionAttestation,
        runtime: &RuntimeAttestation,
    ) -> ProverResult<BlockAttestation> {
        self.check_child([STATE_TRANSITION_CIRCUIT, STATE_TRANSITION_MERGE_CIRCUIT], st)?;
        self.check_proof(RUNTIME_CIRCUIT, runtime)?;
        let output = block_step_circuit(params, st, runtime)
            .map_err(|reason| ProverError::constraint(BLOCK_STEP_CIRCUIT, reason))?;
        debug!(position = ?params.position, output = %output, "block step proven");
        self.attest(
            BLOCK_STEP_CIRCUIT,
            params.public_input,
            output,
            &(params, &st.proof, &runtime.proof),
        )
    }

    async fn merge_attestations(
        &self,
        a: &BlockAttestation,
        b: &BlockAttestation,
    ) -> ProverResult<BlockAttestation> {
        self.merge(
            BLOCK_MERGE_CIRCUIT,
            BLOCK_STEP_CIRCUIT,
            a,
            b,
            block_merge_circuit(a, b),
        )
    }
}
