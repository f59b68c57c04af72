//! Proving inputs recorded for one transaction.
//!
//! A [`TransactionTrace`] is everything the proving pipeline needs to
//! re-derive the three per-transaction attestations without touching a
//! store: state-transition batches with their witnesses, the runtime call
//! with its pinned pre-state, and the block-step parameters linking both.
//! Every type here serializes so that traces can cross a worker boundary.

use serde::{Deserialize, Serialize};
use tessera_primitives::{
    BlockCommitment, Hash, MerkleWitness, NetworkState, ProvableStateTransition,
    RuntimeTransaction, StateTransitionCommitment,
};

use crate::runtime::PreFilledState;

/// Where a transaction sits inside its unproven block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockTransactionPosition {
    First,
    Middle,
    Last,
}

impl BlockTransactionPosition {
    /// Position of transaction `index` in a block of `len`.
    ///
    /// A single-transaction block reports `First`: continuity with the
    /// previous block matters more than marking the end.
    pub fn from_index(index: usize, len: usize) -> Self {
        if index == 0 {
            BlockTransactionPosition::First
        } else if index + 1 == len {
            BlockTransactionPosition::Last
        } else {
            BlockTransactionPosition::Middle
        }
    }

    pub fn is_first(self) -> bool {
        self == BlockTransactionPosition::First
    }
}

/// One fixed-size batch of provable state transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransitionProofParameters {
    /// Root and list hash before the batch.
    pub public_input: StateTransitionCommitment,
    /// Exactly the configured batch size, padded with dummies.
    pub batch: Vec<ProvableStateTransition>,
    /// One witness per batch entry, taken against the root the entry sees.
    pub merkle_witnesses: Vec<MerkleWitness>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeProofParameters {
    pub transaction: RuntimeTransaction,
    pub args: Vec<u8>,
    pub network_state: NetworkState,
    /// Every path the execution read, with its value beforehand.
    pub state: Vec<(Hash, Option<Vec<u8>>)>,
}

impl RuntimeProofParameters {
    /// Read-only snapshot a runtime prover may execute against.
    pub fn pre_state(&self) -> PreFilledState {
        PreFilledState::from_entries(self.state.clone())
    }
}

/// Context the block step executes the transaction under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockExecutionData {
    pub transaction: RuntimeTransaction,
    pub network_state: NetworkState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockProverParameters {
    pub public_input: BlockCommitment,
    pub execution_data: BlockExecutionData,
    pub position: BlockTransactionPosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTrace {
    pub state_transitions: Vec<StateTransitionProofParameters>,
    pub runtime: RuntimeProofParameters,
    pub block_prover: BlockProverParameters,
}

impl TransactionTrace {
    pub fn position(&self) -> BlockTransactionPosition {
        self.block_prover.position
    }

    /// Make the first transaction of a block start from the previous
    /// block's network state.
    ///
    /// The block step then derives the block's own network state itself,
    /// so continuity across blocks is checked rather than assumed. Traces
    /// in any other position are left alone.
    pub fn inherit_network_state(&mut self, previous: &NetworkState) {
        if !self.position().is_first() {
            return;
        }
        self.block_prover.execution_data.network_state = *previous;
        self.block_prover.public_input.network_state_hash = previous.hash();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_primitives::{MethodId, ZERO_HASH};

    fn trace(position: BlockTransactionPosition, ns: NetworkState) -> TransactionTrace {
        let tx = RuntimeTransaction {
            method_id: MethodId(1),
            sender: [1u8; 32],
            nonce: 0,
            args_hash: ZERO_HASH,
        };
        TransactionTrace {
            state_transitions: vec![],
            runtime: RuntimeProofParameters {
                transaction: tx,
                args: vec![],
                network_state: ns,
                state: vec![],
            },
            block_prover: BlockProverParameters {
                public_input: BlockCommitment {
                    state_root: ZERO_HASH,
                    transactions_hash: ZERO_HASH,
                    network_state_hash: ns.hash(),
                },
                execution_data: BlockExecutionData {
                    transaction: tx,
                    network_state: ns,
                },
                position,
            },
        }
    }

    #[test]
    fn test_positions() {
        use BlockTransactionPosition::*;
        assert_eq!(BlockTransactionPosition::from_index(0, 1), First);
        assert_eq!(BlockTransactionPosition::from_index(0, 3), First);
        assert_eq!(BlockTransactionPosition::from_index(1, 3), Middle);
        assert_eq!(BlockTransactionPosition::from_index(2, 3), Last);
        assert_eq!(BlockTransactionPosition::from_index(1, 2), Last);
    }

    #[test]
    fn test_inherit_only_applies_to_first() {
        let block_ns = NetworkState::empty().next_block([5u8; 32]);
        let previous = NetworkState::empty();

        let mut first = trace(BlockTransactionPosition::First, block_ns);
        first.inherit_network_state(&previous);
        assert_eq!(first.block_prover.execution_data.network_state, previous);
        assert_eq!(first.block_prover.public_input.network_state_hash, previous.hash());
        // The runtime still executes under the block's own network state.
        assert_eq!(first.runtime.network_state, block_ns);

        let mut middle = trace(BlockTransactionPosition::Middle, block_ns);
        middle.inherit_network_state(&previous);
        assert_eq!(middle.block_prover.execution_data.network_state, block_ns);
    }

    #[test]
    fn test_trace_survives_json() {
        let original = trace(BlockTransactionPosition::Last, NetworkState::empty());
        let json = serde_json::to_string(&original).unwrap();
        let back: TransactionTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
    }
}
