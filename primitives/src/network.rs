//! Chain-wide context visible to every transaction of a block.

use serde::{Deserialize, Serialize};

use crate::codec::encode_network_state;
use crate::crypto::hash_tagged;
use crate::types::{BlockHeight, Hash, ZERO_HASH};

const NETWORK_STATE_TAG: &[u8] = b"tessera/network-state";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkState {
    pub block_height: BlockHeight,
    pub previous_state_root: Hash,
}

impl NetworkState {
    /// Network state before any block exists.
    pub fn empty() -> Self {
        Self {
            block_height: 0,
            previous_state_root: ZERO_HASH,
        }
    }

    /// Network state of the block following this one, which ended at `state_root`.
    pub fn next_block(&self, state_root: Hash) -> Self {
        Self {
            block_height: self.block_height + 1,
            previous_state_root: state_root,
        }
    }

    pub fn hash(&self) -> Hash {
        hash_tagged(NETWORK_STATE_TAG, &[&encode_network_state(self)])
    }
}

impl Default for NetworkState {
    fn default() -> Self {
        Self::empty()
    }
}
