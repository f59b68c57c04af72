//! Staged write-back layer over an asynchronous store.
//!
//! A `LayeredStore` buffers speculative writes for one block (or one
//! proving cycle) on top of a parent store:
//! - reads check the overlay first, then fall through to the parent
//! - writes land in the overlay and in the write-set of the current
//!   staging period
//! - `merge_into_parent` pushes the write-set to the parent and clears it
//!
//! The parent is never written before an explicit merge, so discarding a
//! layer (or calling `begin_staging`) throws speculative work away without
//! touching durable state. Layers implement [`AsyncStore`] themselves and
//! can be stacked.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{AsyncStore, StoreKey, StoreValue};

/// Result of looking up a key in the overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cached<V> {
    /// Key is known to hold this value.
    Found(V),
    /// Key is known to be absent (deleted, or absent when loaded).
    Absent,
    /// Key has not been loaded; caller must consult the parent.
    NotCached,
}

impl<V> Cached<V> {
    /// Value if cached, treating unknown keys as absent.
    pub fn into_option(self) -> Option<V> {
        match self {
            Cached::Found(v) => Some(v),
            Cached::Absent | Cached::NotCached => None,
        }
    }
}

#[derive(Debug)]
struct Layer<K, V> {
    /// Every key this layer knows about: loaded from the parent or written.
    overlay: BTreeMap<K, Option<V>>,
    /// Writes of the current staging period, in key order.
    write_set: BTreeMap<K, Option<V>>,
}

pub struct LayeredStore<K, V> {
    parent: Arc<dyn AsyncStore<K, V>>,
    inner: Mutex<Layer<K, V>>,
}

impl<K: StoreKey, V: StoreValue> LayeredStore<K, V> {
    pub fn new(parent: Arc<dyn AsyncStore<K, V>>) -> Self {
        Self {
            parent,
            inner: Mutex::new(Layer {
                overlay: BTreeMap::new(),
                write_set: BTreeMap::new(),
            }),
        }
    }

    pub fn parent(&self) -> &Arc<dyn AsyncStore<K, V>> {
        &self.parent
    }

    /// Look up a key in the overlay only.
    pub fn get_cached(&self, key: &K) -> Cached<V> {
        match self.inner.lock().overlay.get(key) {
            Some(Some(value)) => Cached::Found(value.clone()),
            Some(None) => Cached::Absent,
            None => Cached::NotCached,
        }
    }

    /// Stage a write (`None` deletes).
    pub fn set(&self, key: K, value: Option<V>) {
        let mut inner = self.inner.lock();
        inner.overlay.insert(key.clone(), value.clone());
        inner.write_set.insert(key, value);
    }

    /// Load `keys` from the parent into the overlay so later synchronous
    /// reads can be served from memory. Already known keys are skipped.
    pub async fn preload(&self, keys: &[K]) -> StoreResult<()> {
        let missing: Vec<K> = {
            let inner = self.inner.lock();
            let mut seen = Vec::new();
            for key in keys {
                if !inner.overlay.contains_key(key) && !seen.contains(key) {
                    seen.push(key.clone());
                }
            }
            seen
        };
        if missing.is_empty() {
            return Ok(());
        }

        let values = try_join_all(missing.iter().map(|key| self.parent.get(key))).await?;

        let mut inner = self.inner.lock();
        for (key, value) in missing.into_iter().zip(values) {
            // A write staged while the reads were in flight wins.
            inner.overlay.entry(key).or_insert(value);
        }
        Ok(())
    }

    /// Start a new staging period, discarding writes not yet merged.
    pub fn begin_staging(&self) {
        let mut inner = self.inner.lock();
        let Layer { overlay, write_set } = &mut *inner;
        for key in write_set.keys() {
            overlay.remove(key);
        }
        let discarded = write_set.len();
        write_set.clear();
        if discarded > 0 {
            debug!(discarded, "discarded un-merged staged writes");
        }
    }

    /// Write every staged entry to the parent, then clear the write-set.
    ///
    /// Writes are issued concurrently and awaited together. On failure the
    /// write-set is left intact. Returns the number of merged entries.
    pub async fn merge_into_parent(&self) -> StoreResult<usize> {
        let staged: Vec<(K, Option<V>)> = {
            let inner = self.inner.lock();
            inner
                .write_set
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        if staged.is_empty() {
            return Ok(0);
        }

        let pending = staged.len();
        try_join_all(
            staged
                .iter()
                .map(|(key, value)| self.parent.put(key.clone(), value.clone())),
        )
        .await
        .map_err(|e| StoreError::MergeFailed {
            pending,
            reason: e.to_string(),
        })?;

        let mut inner = self.inner.lock();
        for (key, _) in &staged {
            inner.write_set.remove(key);
        }
        debug!(merged = pending, "merged staged writes into parent");
        Ok(pending)
    }

    /// Number of writes in the current staging period.
    pub fn staged_len(&self) -> usize {
        self.inner.lock().write_set.len()
    }
}

#[async_trait]
impl<K: StoreKey, V: StoreValue> AsyncStore<K, V> for LayeredStore<K, V> {
    async fn get(&self, key: &K) -> StoreResult<Option<V>> {
        match self.get_cached(key) {
            Cached::Found(value) => Ok(Some(value)),
            Cached::Absent => Ok(None),
            Cached::NotCached => {
                let value = self.parent.get(key).await?;
                let mut inner = self.inner.lock();
                let entry = inner.overlay.entry(key.clone()).or_insert(value);
                Ok(entry.clone())
            }
        }
    }

    /// Staged, not written through.
    async fn put(&self, key: K, value: Option<V>) -> StoreResult<()> {
        self.set(key, value);
        Ok(())
    }
}
