//! State transitions recorded during execution.
//!
//! A [`StateTransition`] is one read or write of a state path together
//! with the value observed before it. Its provable form replaces values
//! by Merkle leaf hashes so that a prover can check it against a tree
//! witness.

use serde::{Deserialize, Serialize};

use crate::codec::encode_provable_state_transition;
use crate::crypto::hash_tagged;
use crate::hash_list::{ProvableHashList, STATE_TRANSITIONS_TAG};
use crate::merkle::leaf_value;
use crate::types::{Hash, ZERO_HASH};

const STATE_TRANSITION_TAG: &[u8] = b"tessera/state-transition";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub path: Hash,
    /// Value at `path` before the transition, `None` if absent.
    pub from: Option<Vec<u8>>,
    /// New value, or `None` for a read-only transition.
    pub to: Option<Vec<u8>>,
}

impl StateTransition {
    pub fn read(path: Hash, from: Option<Vec<u8>>) -> Self {
        Self { path, from, to: None }
    }

    pub fn write(path: Hash, from: Option<Vec<u8>>, to: Vec<u8>) -> Self {
        Self {
            path,
            from,
            to: Some(to),
        }
    }

    pub fn is_write(&self) -> bool {
        self.to.is_some()
    }

    pub fn to_provable(&self) -> ProvableStateTransition {
        ProvableStateTransition {
            path: self.path,
            from: ProvableOption::some(leaf_value(&self.path, self.from.as_deref())),
            to: match &self.to {
                Some(to) => ProvableOption::some(leaf_value(&self.path, Some(to))),
                None => ProvableOption::none(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvableOption {
    pub is_some: bool,
    pub value: Hash,
}

impl ProvableOption {
    pub fn some(value: Hash) -> Self {
        Self {
            is_some: true,
            value,
        }
    }

    pub fn none() -> Self {
        Self {
            is_some: false,
            value: ZERO_HASH,
        }
    }
}

/// A state transition as a prover sees it.
///
/// `from.is_some == false` skips the pre-state check entirely, which only
/// the dummy padding transition uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvableStateTransition {
    pub path: Hash,
    pub from: ProvableOption,
    pub to: ProvableOption,
}

impl ProvableStateTransition {
    /// No-op transition used to pad batches to a fixed size.
    pub fn dummy() -> Self {
        Self {
            path: ZERO_HASH,
            from: ProvableOption::none(),
            to: ProvableOption::none(),
        }
    }

    pub fn is_dummy(&self) -> bool {
        *self == Self::dummy()
    }

    pub fn hash(&self) -> Hash {
        hash_tagged(STATE_TRANSITION_TAG, &[&encode_provable_state_transition(self)])
    }
}

/// Commitment over a list of state transitions, dummies excluded.
pub fn state_transitions_hash(transitions: &[ProvableStateTransition]) -> Hash {
    let mut list = ProvableHashList::new(STATE_TRANSITIONS_TAG);
    for st in transitions.iter().filter(|st| !st.is_dummy()) {
        list.push(&st.hash());
    }
    list.commitment()
}
