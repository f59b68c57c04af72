//! Execution context handed to runtime methods and hooks.
//!
//! `RuntimeContext` is the runtime's only window onto state. It answers
//! reads synchronously from a [`StateReader`], buffers writes for the
//! current transaction, and records every access as a `StateTransition`.
//! The first value read from the reader for each path is kept as the
//! transaction's pre-state so the same execution can later be replayed
//! against a pinned snapshot.

use std::collections::{BTreeMap, BTreeSet};

use tessera_primitives::crypto::hash_tagged;
use tessera_primitives::types::{u64_from_le_bytes, u64_to_le_bytes};
use tessera_primitives::{Hash, NetworkState, RuntimeTransaction, StateTransition};
use tessera_store::{Cached, CachedStateStore};

use crate::error::{RuntimeError, RuntimeResult};

const STATE_PATH_TAG: &[u8] = b"tessera/state-path";

/// Hash a readable state key into its Merkle path.
pub fn state_path(key: &[u8]) -> Hash {
    hash_tagged(STATE_PATH_TAG, &[key])
}

/// Synchronous, memory-only view of state.
pub trait StateReader: Send + Sync {
    fn read(&self, path: &Hash) -> Cached<Vec<u8>>;
}

impl StateReader for CachedStateStore {
    fn read(&self, path: &Hash) -> Cached<Vec<u8>> {
        self.get_cached(path)
    }
}

/// Pinned pre-state of one transaction.
///
/// Paths outside the snapshot read as not loaded, so a replay can never
/// observe state the original execution did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreFilledState {
    entries: BTreeMap<Hash, Option<Vec<u8>>>,
}

impl PreFilledState {
    pub fn new(entries: BTreeMap<Hash, Option<Vec<u8>>>) -> Self {
        Self { entries }
    }

    /// Entries in path order, as carried by task inputs.
    pub fn to_entries(&self) -> Vec<(Hash, Option<Vec<u8>>)> {
        self.entries
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    pub fn from_entries(entries: Vec<(Hash, Option<Vec<u8>>)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StateReader for PreFilledState {
    fn read(&self, path: &Hash) -> Cached<Vec<u8>> {
        match self.entries.get(path) {
            Some(Some(value)) => Cached::Found(value.clone()),
            Some(None) => Cached::Absent,
            None => Cached::NotCached,
        }
    }
}

/// Position inside the recorded effects, used to roll back a failed method.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    transitions: usize,
    writes: BTreeMap<Hash, Vec<u8>>,
}

pub struct RuntimeContext<'a> {
    reader: &'a dyn StateReader,
    network_state: NetworkState,
    transaction: RuntimeTransaction,
    module: &'a str,
    method: &'a str,
    writes: BTreeMap<Hash, Vec<u8>>,
    transitions: Vec<StateTransition>,
    pre_state: BTreeMap<Hash, Option<Vec<u8>>>,
    missing: BTreeSet<Hash>,
}

impl<'a> RuntimeContext<'a> {
    pub fn new(
        reader: &'a dyn StateReader,
        network_state: NetworkState,
        transaction: RuntimeTransaction,
        module: &'a str,
        method: &'a str,
    ) -> Self {
        Self {
            reader,
            network_state,
            transaction,
            module,
            method,
            writes: BTreeMap::new(),
            transitions: Vec::new(),
            pre_state: BTreeMap::new(),
            missing: BTreeSet::new(),
        }
    }

    pub fn network_state(&self) -> &NetworkState {
        &self.network_state
    }

    pub fn transaction(&self) -> &RuntimeTransaction {
        &self.transaction
    }

    pub fn sender(&self) -> &Hash {
        &self.transaction.sender
    }

    /// `(module, method)` being executed.
    pub fn method(&self) -> (&str, &str) {
        (self.module, self.method)
    }

    fn current(&mut self, path: &Hash) -> RuntimeResult<Option<Vec<u8>>> {
        if let Some(value) = self.writes.get(path) {
            return Ok(Some(value.clone()));
        }
        if let Some(value) = self.pre_state.get(path) {
            return Ok(value.clone());
        }
        let value = match self.reader.read(path) {
            Cached::Found(value) => Some(value),
            Cached::Absent => None,
            Cached::NotCached => {
                self.missing.insert(*path);
                return Err(RuntimeError::StateNotLoaded(*path));
            }
        };
        self.pre_state.insert(*path, value.clone());
        Ok(value)
    }

    pub fn get(&mut self, path: &Hash) -> RuntimeResult<Option<Vec<u8>>> {
        let value = self.current(path)?;
        self.transitions
            .push(StateTransition::read(*path, value.clone()));
        Ok(value)
    }

    pub fn set(&mut self, path: &Hash, value: Vec<u8>) -> RuntimeResult<()> {
        let from = self.current(path)?;
        self.transitions
            .push(StateTransition::write(*path, from, value.clone()));
        self.writes.insert(*path, value);
        Ok(())
    }

    /// Read a u64 stored little-endian. Returns 0 if the path is absent.
    pub fn get_u64(&mut self, path: &Hash) -> RuntimeResult<u64> {
        match self.get(path)? {
            Some(bytes) => u64_from_le_bytes(&bytes)
                .ok_or_else(|| RuntimeError::CorruptState("expected u64".into())),
            None => Ok(0),
        }
    }

    pub fn set_u64(&mut self, path: &Hash, value: u64) -> RuntimeResult<()> {
        self.set(path, u64_to_le_bytes(value).to_vec())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            transitions: self.transitions.len(),
            writes: self.writes.clone(),
        }
    }

    /// Drop every transition and write recorded after `checkpoint`.
    ///
    /// The pre-state and the missing set are kept: what was read stays read.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.transitions.truncate(checkpoint.transitions);
        self.writes = checkpoint.writes;
    }

    pub fn clear_transitions(&mut self) {
        self.transitions.clear();
        self.writes.clear();
    }

    pub fn has_missing(&self) -> bool {
        !self.missing.is_empty()
    }

    pub(crate) fn into_parts(self) -> ContextParts {
        ContextParts {
            transitions: self.transitions,
            pre_state: self.pre_state,
            missing: self.missing.into_iter().collect(),
        }
    }
}

pub(crate) struct ContextParts {
    pub transitions: Vec<StateTransition>,
    pub pre_state: BTreeMap<Hash, Option<Vec<u8>>>,
    pub missing: Vec<Hash>,
}
