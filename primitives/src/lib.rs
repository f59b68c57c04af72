//! `tessera-primitives` — foundational types for the Tessera sequencer.
//!
//! This crate provides the canonical value types (transactions, network
//! state, blocks, state transitions, attestations), the deterministic
//! codec and hashing used for every commitment, and the fixed-height
//! Merkle tree that defines the state root.

pub mod types;
pub mod error;
pub mod crypto;
pub mod codec;
pub mod hash_list;
pub mod merkle;
pub mod network;
pub mod transaction;
pub mod state_transition;
pub mod attestation;
pub mod block;

// Re-export commonly used types at the crate root for convenience.
pub use types::{
    hash_to_hex, short_hex, Address, BlockHeight, Hash, MethodId, DEFAULT_ST_BATCH_SIZE,
    DEFAULT_TREE_HEIGHT, ZERO_ADDRESS, ZERO_HASH,
};
pub use error::{PrimitiveError, PrimitiveResult};
pub use hash_list::ProvableHashList;
pub use merkle::{
    InMemoryMerkleTreeStorage, MerkleTreeStore, MerkleWitness, NodeKey, RollupMerkleTree,
};
pub use network::NetworkState;
pub use transaction::{RuntimeTransaction, Transaction};
pub use state_transition::{ProvableOption, ProvableStateTransition, StateTransition};
pub use attestation::{
    reducible, reduction_order, Attestation, BlockAttestation, BlockCommitment,
    MethodPublicOutput, ProofArtifact, ReductionOrder, RuntimeAttestation,
    StateTransitionAttestation, StateTransitionCommitment,
};
pub use block::{ComputedBlock, UnprovenBlock, UnprovenBlockMetadata, UnprovenBlockWithPreviousMetadata};
