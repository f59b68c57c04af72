//! Circuit simulation.
//!
//! Each function checks one circuit's constraints against its private
//! inputs and returns the public output an honest proof would commit to.
//! Nothing here touches a store: every input arrives fully materialized.

use tessera_engine::runtime::ExecutionAttempt;
use tessera_engine::{
    BlockProverParameters, BlockTransactionPosition, Runtime, RuntimeProofParameters,
    StateTransitionProofParameters,
};
use tessera_primitives::attestation::Chained;
use tessera_primitives::hash_list::{STATE_TRANSITIONS_TAG, TRANSACTIONS_TAG};
use tessera_primitives::merkle::leaf_index;
use tessera_primitives::state_transition::state_transitions_hash;
use tessera_primitives::transaction::args_hash;
use tessera_primitives::{
    short_hex, Attestation, BlockAttestation, BlockCommitment, MethodPublicOutput,
    ProvableHashList, RuntimeAttestation, StateTransition, StateTransitionAttestation,
    StateTransitionCommitment, ZERO_HASH,
};

pub const STATE_TRANSITION_CIRCUIT: &str = "state-transition";
pub const STATE_TRANSITION_MERGE_CIRCUIT: &str = "state-transition-merge";
pub const RUNTIME_CIRCUIT: &str = "runtime";
pub const BLOCK_STEP_CIRCUIT: &str = "block-step";
pub const BLOCK_MERGE_CIRCUIT: &str = "block-merge";

/// Apply one batch of transitions to the input root.
pub fn state_transition_circuit(
    params: &StateTransitionProofParameters,
) -> Result<StateTransitionCommitment, String> {
    if params.batch.len() != params.merkle_witnesses.len() {
        return Err(format!(
            "{} transitions but {} witnesses",
            params.batch.len(),
            params.merkle_witnesses.len()
        ));
    }

    let mut root = params.public_input.state_root;
    let mut list = ProvableHashList::from_commitment(
        STATE_TRANSITIONS_TAG,
        params.public_input.state_transitions_hash,
    );

    for (i, (st, witness)) in params.batch.iter().zip(&params.merkle_witnesses).enumerate() {
        if st.is_dummy() {
            continue;
        }
        let height = witness.siblings.len() + 1;
        if witness.is_left.len() != witness.siblings.len()
            || witness.calculate_index() != leaf_index(&st.path, height)
        {
            return Err(format!("witness {i} is not for path {}", short_hex(&st.path)));
        }
        if st.from.is_some && !witness.check_membership(&root, &st.from.value) {
            return Err(format!(
                "transition {i} on {} does not start from the current root",
                short_hex(&st.path)
            ));
        }
        if st.to.is_some {
            root = witness.compute_root(&st.to.value);
        }
        list.push(&st.hash());
    }

    Ok(StateTransitionCommitment {
        state_root: root,
        state_transitions_hash: list.commitment(),
    })
}

/// Re-execute the method over its pinned pre-state.
pub fn runtime_circuit(
    runtime: &Runtime,
    params: &RuntimeProofParameters,
) -> Result<MethodPublicOutput, String> {
    if args_hash(&params.args) != params.transaction.args_hash {
        return Err("arguments do not match the transaction".into());
    }

    let attempt = runtime
        .try_execute(
            &params.pre_state(),
            &params.transaction,
            &params.args,
            &params.network_state,
        )
        .map_err(|e| e.to_string())?;

    match attempt {
        ExecutionAttempt::Complete(exec) => {
            let provable: Vec<_> = exec
                .state_transitions
                .iter()
                .map(StateTransition::to_provable)
                .collect();
            Ok(MethodPublicOutput {
                state_transitions_hash: state_transitions_hash(&provable),
                transaction_hash: params.transaction.hash(),
                network_state_hash: params.network_state.hash(),
                status: exec.status,
            })
        }
        ExecutionAttempt::Rejected { hook, reason } => {
            Err(format!("hook {hook} rejected the transaction: {reason}"))
        }
        ExecutionAttempt::NeedsState(paths) => {
            Err(format!("pre-state is missing {} paths", paths.len()))
        }
    }
}

/// Tie a transaction's state-transition and runtime attestations into
/// one step of the block.
///
/// The network state the step checks the runtime against is the
/// execution data's own, advanced by one block when the transaction opens
/// a block. That is what lets the first transaction of a block carry the
/// previous block's network state and still be checked against the one
/// it actually executed under.
pub fn block_step_circuit(
    params: &BlockProverParameters,
    st: &StateTransitionAttestation,
    runtime: &RuntimeAttestation,
) -> Result<BlockCommitment, String> {
    let input = &params.public_input;
    let execution = &params.execution_data;

    if input.network_state_hash != execution.network_state.hash() {
        return Err("execution network state does not match the public input".into());
    }
    let network_state = match params.position {
        BlockTransactionPosition::First => execution.network_state.next_block(input.state_root),
        _ => execution.network_state,
    };
    let out = &runtime.public_output;
    if out.network_state_hash != network_state.hash() {
        return Err("runtime executed under a different network state".into());
    }

    let tx_hash = execution.transaction.hash();
    if out.transaction_hash != tx_hash {
        return Err("runtime attestation is for a different transaction".into());
    }

    if st.public_input.state_root != input.state_root {
        return Err("state transitions do not start at the block root".into());
    }
    if st.public_input.state_transitions_hash != ZERO_HASH {
        return Err("state transitions do not start with an empty list".into());
    }
    if st.public_output.state_transitions_hash != out.state_transitions_hash {
        return Err("state transitions differ from the ones the runtime produced".into());
    }

    let mut transactions = ProvableHashList::from_commitment(TRANSACTIONS_TAG, input.transactions_hash);
    transactions.push(&tx_hash);

    Ok(BlockCommitment {
        state_root: st.public_output.state_root,
        transactions_hash: transactions.commitment(),
        network_state_hash: network_state.hash(),
    })
}

/// Compose `a` then `b`; `a` must end where `b` starts.
pub fn merge_circuit<C: Chained + Copy>(
    a: &Attestation<C, C>,
    b: &Attestation<C, C>,
) -> Result<(C, C), String> {
    if !a.precedes(b) {
        return Err("attestations are not adjacent".into());
    }
    Ok((a.public_input, b.public_output))
}

/// Block merges additionally require the network state to carry over.
pub fn block_merge_circuit(
    a: &BlockAttestation,
    b: &BlockAttestation,
) -> Result<(BlockCommitment, BlockCommitment), String> {
    if a.public_output.network_state_hash != b.public_input.network_state_hash {
        return Err(format!(
            "network state breaks between {} and {}",
            a.public_output, b.public_input
        ));
    }
    merge_circuit(a, b)
}
