//! Attestations and their public inputs/outputs.
//!
//! An [`Attestation`] pairs a public input with a public output and an
//! opaque proof artifact. The sequencer never looks inside the artifact;
//! it only reasons about the public values, most importantly whether two
//! attestations chain together (adjacency) and may be merged.

use serde::{Deserialize, Serialize};

use crate::types::{short_hex, Hash, ZERO_HASH};

/// Marker carried by attestations produced without a proving backend.
pub const MOCK_PROOF: &str = "mock-proof";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofArtifact {
    /// No cryptographic proof; public values are trusted as-is.
    Placeholder,
    Bytes(Vec<u8>),
}

impl core::fmt::Display for ProofArtifact {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProofArtifact::Placeholder => f.write_str(MOCK_PROOF),
            ProofArtifact::Bytes(bytes) => write!(f, "proof({} bytes)", bytes.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attestation<I, O> {
    pub public_input: I,
    pub public_output: O,
    pub proof: ProofArtifact,
}

impl<I, O> Attestation<I, O> {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.proof, ProofArtifact::Placeholder)
    }
}

/// Public values of a state-transition attestation, both before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransitionCommitment {
    pub state_root: Hash,
    pub state_transitions_hash: Hash,
}

/// Public output of a runtime (method execution) attestation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodPublicOutput {
    pub state_transitions_hash: Hash,
    pub transaction_hash: Hash,
    pub network_state_hash: Hash,
    /// Whether the method itself succeeded (hooks always must).
    pub status: bool,
}

/// Public values of a block-level attestation, both before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCommitment {
    pub state_root: Hash,
    pub transactions_hash: Hash,
    pub network_state_hash: Hash,
}

impl core::fmt::Display for BlockCommitment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "root={} txs={} ns={}",
            short_hex(&self.state_root),
            short_hex(&self.transactions_hash),
            short_hex(&self.network_state_hash)
        )
    }
}

pub type StateTransitionAttestation =
    Attestation<StateTransitionCommitment, StateTransitionCommitment>;
pub type RuntimeAttestation = Attestation<(), MethodPublicOutput>;
pub type BlockAttestation = Attestation<BlockCommitment, BlockCommitment>;

/// Commitments that can follow one another.
pub trait Chained {
    /// True when `next` starts exactly where `self` ends.
    fn continues_into(&self, next: &Self) -> bool;
}

impl Chained for StateTransitionCommitment {
    fn continues_into(&self, next: &Self) -> bool {
        self.state_root == next.state_root
            && self.state_transitions_hash == next.state_transitions_hash
    }
}

impl Chained for BlockCommitment {
    fn continues_into(&self, next: &Self) -> bool {
        self.state_root == next.state_root && self.transactions_hash == next.transactions_hash
    }
}

/// Direction in which two attestations chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionOrder {
    /// The first argument precedes the second.
    Forward,
    /// The second argument precedes the first.
    Reverse,
}

impl<C: Chained> Attestation<C, C> {
    pub fn precedes(&self, next: &Self) -> bool {
        self.public_output.continues_into(&next.public_input)
    }
}

/// Forward adjacency is tried before reverse.
pub fn reduction_order<C: Chained>(
    a: &Attestation<C, C>,
    b: &Attestation<C, C>,
) -> Option<ReductionOrder> {
    if a.precedes(b) {
        Some(ReductionOrder::Forward)
    } else if b.precedes(a) {
        Some(ReductionOrder::Reverse)
    } else {
        None
    }
}

pub fn reducible<C: Chained>(a: &Attestation<C, C>, b: &Attestation<C, C>) -> bool {
    reduction_order(a, b).is_some()
}

impl StateTransitionCommitment {
    /// Input of the first batch of a transaction starting at `state_root`.
    pub fn starting_at(state_root: Hash) -> Self {
        Self {
            state_root,
            state_transitions_hash: ZERO_HASH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(root_in: u8, tx_in: u8, root_out: u8, tx_out: u8) -> BlockAttestation {
        let commit = |root: u8, txs: u8| BlockCommitment {
            state_root: [root; 32],
            transactions_hash: [txs; 32],
            network_state_hash: ZERO_HASH,
        };
        Attestation {
            public_input: commit(root_in, tx_in),
            public_output: commit(root_out, tx_out),
            proof: ProofArtifact::Placeholder,
        }
    }

    #[test]
    fn test_forward_and_reverse_order() {
        let a = block(1, 1, 2, 2);
        let b = block(2, 2, 3, 3);
        assert_eq!(reduction_order(&a, &b), Some(ReductionOrder::Forward));
        assert_eq!(reduction_order(&b, &a), Some(ReductionOrder::Reverse));
        assert!(reducible(&a, &b) && reducible(&b, &a));
    }

    #[test]
    fn test_unrelated_not_reducible() {
        let a = block(1, 1, 2, 2);
        let b = block(5, 5, 6, 6);
        assert!(!reducible(&a, &b));
        assert!(!reducible(&b, &a));
    }

    #[test]
    fn test_root_match_alone_is_not_adjacency() {
        let a = block(1, 1, 2, 2);
        let b = block(2, 9, 3, 3);
        assert!(!reducible(&a, &b));
    }

    #[test]
    fn test_placeholder_display() {
        assert_eq!(ProofArtifact::Placeholder.to_string(), MOCK_PROOF);
        assert!(block(0, 0, 0, 0).is_placeholder());
    }
}
