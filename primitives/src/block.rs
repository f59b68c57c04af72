//! Unproven and computed blocks.
//!
//! An [`UnprovenBlock`] is the sequenced batch of transactions; its
//! [`UnprovenBlockMetadata`] describes the state that results from it and
//! seeds the next block. A [`ComputedBlock`] bundles the unproven blocks
//! of one proving cycle with their aggregated attestation.

use serde::{Deserialize, Serialize};

use crate::attestation::BlockAttestation;
use crate::crypto::hash_sha256;
use crate::hash_list::{commit_all, TRANSACTIONS_TAG};
use crate::merkle::empty_root;
use crate::network::NetworkState;
use crate::transaction::Transaction;
use crate::types::{BlockHeight, Hash, ZERO_HASH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprovenBlock {
    /// Network state every transaction of the block executed under.
    pub network_state: NetworkState,
    pub transactions: Vec<Transaction>,
    /// Commitment over the ordered transaction hashes.
    pub transactions_hash: Hash,
}

impl UnprovenBlock {
    pub fn new(network_state: NetworkState, transactions: Vec<Transaction>) -> Self {
        let hashes: Vec<Hash> = transactions.iter().map(Transaction::hash).collect();
        Self {
            network_state,
            transactions_hash: commit_all(TRANSACTIONS_TAG, hashes.iter()),
            transactions,
        }
    }

    pub fn height(&self) -> BlockHeight {
        self.network_state.block_height
    }

    /// Returns the number of transactions in this block.
    pub fn tx_count(&self) -> usize {
        self.transactions.len()
    }

    /// Returns true if this block has no transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprovenBlockMetadata {
    pub height: BlockHeight,
    pub resulting_network_state: NetworkState,
    pub resulting_state_root: Hash,
    pub block_transactions_hash: Hash,
    /// Running commitment over every transaction ever sequenced.
    pub eternal_transactions_hash: Hash,
}

impl UnprovenBlockMetadata {
    /// Metadata standing in for the block before the first one.
    pub fn genesis(tree_height: usize) -> Self {
        Self {
            height: 0,
            resulting_network_state: NetworkState::empty(),
            resulting_state_root: empty_root(tree_height),
            block_transactions_hash: ZERO_HASH,
            eternal_transactions_hash: ZERO_HASH,
        }
    }

    /// Network state the next block executes under.
    pub fn next_network_state(&self) -> NetworkState {
        self.resulting_network_state
            .next_block(self.resulting_state_root)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnprovenBlockWithPreviousMetadata {
    pub block: UnprovenBlock,
    /// `None` for the first block of the chain.
    pub last_block_metadata: Option<UnprovenBlockMetadata>,
}

impl UnprovenBlockWithPreviousMetadata {
    pub fn previous_or_genesis(&self, tree_height: usize) -> UnprovenBlockMetadata {
        self.last_block_metadata
            .unwrap_or_else(|| UnprovenBlockMetadata::genesis(tree_height))
    }
}

/// Unproven blocks of one proving cycle plus their aggregated attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedBlock {
    pub blocks: Vec<UnprovenBlock>,
    pub attestation: BlockAttestation,
}

impl ComputedBlock {
    /// SHA-256 identifier over the included blocks and the attested output.
    pub fn id(&self) -> Hash {
        let mut data = Vec::with_capacity(self.blocks.len() * 40 + 96);
        for block in &self.blocks {
            data.extend_from_slice(&block.height().to_le_bytes());
            data.extend_from_slice(&block.transactions_hash);
        }
        let output = &self.attestation.public_output;
        data.extend_from_slice(&output.state_root);
        data.extend_from_slice(&output.transactions_hash);
        data.extend_from_slice(&output.network_state_hash);
        hash_sha256(&data)
    }

    pub fn tx_count(&self) -> usize {
        self.blocks.iter().map(UnprovenBlock::tx_count).sum()
    }

    /// Height of the newest block in the cycle.
    pub fn height(&self) -> Option<BlockHeight> {
        self.blocks.last().map(UnprovenBlock::height)
    }
}
