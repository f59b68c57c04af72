//! Asynchronous key-value store abstraction.
//!
//! `AsyncStore` is the interface every durable backend (and every staged
//! layer stacked on top of one) exposes. Reads and writes are suspension
//! points, so a backend may sit behind I/O. Writing `None` deletes the key.
//!
//! Implementations:
//! - `InMemoryStore` (this module): `BTreeMap` behind a lock, for tests and
//!   single-process deployments
//! - `LayeredStore` (see `layered`): a staged write-back cache over any parent

use std::collections::BTreeMap;
use std::fmt::Debug;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StoreResult;

/// Bound for store keys. Ordered so overlays iterate deterministically.
pub trait StoreKey: Clone + Ord + Debug + Send + Sync + 'static {}
impl<T: Clone + Ord + Debug + Send + Sync + 'static> StoreKey for T {}

/// Bound for store values.
pub trait StoreValue: Clone + Debug + Send + Sync + 'static {}
impl<T: Clone + Debug + Send + Sync + 'static> StoreValue for T {}

/// Abstraction over an asynchronous key-value store.
#[async_trait]
pub trait AsyncStore<K: StoreKey, V: StoreValue>: Send + Sync {
    /// Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &K) -> StoreResult<Option<V>>;

    /// Set (`Some`) or delete (`None`) a key.
    async fn put(&self, key: K, value: Option<V>) -> StoreResult<()>;

    /// Default implementation reads keys one after another; backends may batch.
    async fn get_many(&self, keys: &[K]) -> StoreResult<Vec<Option<V>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.get(key).await?);
        }
        Ok(out)
    }
}

/// In-memory store backed by `BTreeMap`.
#[derive(Debug)]
pub struct InMemoryStore<K, V> {
    data: RwLock<BTreeMap<K, V>>,
}

impl<K: StoreKey, V: StoreValue> InMemoryStore<K, V> {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Create a store pre-populated with data.
    pub fn with_data(data: BTreeMap<K, V>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.data.write().insert(key, value);
    }

    /// Synchronous read, for tests and tooling.
    pub fn get_sync(&self, key: &K) -> Option<V> {
        self.data.read().get(key).cloned()
    }

    /// Returns the number of entries in the store.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Copy of the full contents.
    pub fn snapshot(&self) -> BTreeMap<K, V> {
        self.data.read().clone()
    }
}

impl<K: StoreKey, V: StoreValue> Default for InMemoryStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: StoreKey, V: StoreValue> AsyncStore<K, V> for InMemoryStore<K, V> {
    async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn put(&self, key: K, value: Option<V>) -> StoreResult<()> {
        let mut data = self.data.write();
        match value {
            Some(v) => {
                data.insert(key, v);
            }
            None => {
                data.remove(&key);
            }
        }
        Ok(())
    }
}
