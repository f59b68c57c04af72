//! Staged Merkle node storage.
//!
//! `CachedMerkleStore` lets a `RollupMerkleTree` run synchronously over an
//! asynchronous node backend: callers preload the path of every leaf they
//! are about to touch, after which all node reads are overlay hits.

use std::sync::Arc;

use tessera_primitives::merkle::{leaf_index, path_node_keys, MerkleTreeStore};
use tessera_primitives::{Hash, NodeKey};
use tracing::trace;

use crate::error::StoreResult;
use crate::layered::LayeredStore;
use crate::store::{AsyncStore, InMemoryStore};

/// Durable node store addressed by tree position.
pub type AsyncMerkleTreeStore = dyn AsyncStore<NodeKey, Hash>;

/// In-memory durable node store.
pub type InMemoryAsyncMerkleTreeStore = InMemoryStore<NodeKey, Hash>;

/// Staged layer over a node store.
pub type CachedMerkleStore = LayeredStore<NodeKey, Hash>;

impl CachedMerkleStore {
    pub fn over(parent: Arc<AsyncMerkleTreeStore>) -> Self {
        LayeredStore::new(parent)
    }

    /// Load the full path and sibling set of leaf `index` from the parent.
    pub async fn preload_key(&self, index: u64, height: usize) -> StoreResult<()> {
        trace!(index, "preloading merkle path");
        self.preload(&path_node_keys(index, height)).await
    }

    /// Preload the leaves that the given state paths map to.
    ///
    /// The root is always loaded, so `root()` is correct even when `paths`
    /// is empty.
    pub async fn preload_paths(&self, paths: &[Hash], height: usize) -> StoreResult<()> {
        let mut keys = Vec::with_capacity(1 + paths.len() * 2 * height);
        keys.push(root_key(height));
        for path in paths {
            keys.extend(path_node_keys(leaf_index(path, height), height));
        }
        self.preload(&keys).await
    }
}

fn root_key(height: usize) -> NodeKey {
    NodeKey::new(height.saturating_sub(1) as u32, 0)
}

impl MerkleTreeStore for CachedMerkleStore {
    /// Serves overlay hits only; unknown nodes read as empty subtrees.
    fn get_node(&self, key: &NodeKey) -> Option<Hash> {
        self.get_cached(key).into_option()
    }

    fn set_node(&self, key: NodeKey, value: Hash) {
        self.set(key, Some(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_primitives::merkle::{empty_root, hash_leaf, RollupMerkleTree};

    const HEIGHT: usize = 16;

    #[tokio::test]
    async fn test_tree_over_cached_store_persists_after_merge() {
        let durable = Arc::new(InMemoryAsyncMerkleTreeStore::new());
        let staged = CachedMerkleStore::over(durable.clone());

        let path = [3u8; 32];
        let index = leaf_index(&path, HEIGHT);
        staged.preload_key(index, HEIGHT).await.unwrap();

        let root = {
            let tree = RollupMerkleTree::new(&staged, HEIGHT).unwrap();
            tree.set_leaf(index, hash_leaf(&path, b"v")).unwrap();
            tree.root()
        };
        assert_ne!(root, empty_root(HEIGHT));
        assert!(durable.is_empty());

        staged.merge_into_parent().await.unwrap();

        let fresh = CachedMerkleStore::over(durable.clone());
        fresh.preload_key(index, HEIGHT).await.unwrap();
        let tree = RollupMerkleTree::new(&fresh, HEIGHT).unwrap();
        assert_eq!(tree.root(), root);
    }

    #[tokio::test]
    async fn test_root_is_loaded_without_any_paths() {
        let durable = Arc::new(InMemoryAsyncMerkleTreeStore::new());
        let writer = CachedMerkleStore::over(durable.clone());
        writer.preload_paths(&[[5u8; 32]], HEIGHT).await.unwrap();
        let root = {
            let tree = RollupMerkleTree::new(&writer, HEIGHT).unwrap();
            tree.set_leaf(leaf_index(&[5u8; 32], HEIGHT), [5u8; 32]).unwrap();
            tree.root()
        };
        writer.merge_into_parent().await.unwrap();

        let reader = CachedMerkleStore::over(durable);
        reader.preload_paths(&[], HEIGHT).await.unwrap();
        let tree = RollupMerkleTree::new(&reader, HEIGHT).unwrap();
        assert_eq!(tree.root(), root);
        assert_ne!(tree.root(), empty_root(HEIGHT));
    }

    #[tokio::test]
    async fn test_preloaded_witness_matches_durable_root() {
        let durable = Arc::new(InMemoryAsyncMerkleTreeStore::new());
        let writer = CachedMerkleStore::over(durable.clone());
        writer.preload_paths(&[[1u8; 32], [2u8; 32]], HEIGHT).await.unwrap();
        {
            let tree = RollupMerkleTree::new(&writer, HEIGHT).unwrap();
            tree.set_leaf(leaf_index(&[1u8; 32], HEIGHT), [1u8; 32]).unwrap();
            tree.set_leaf(leaf_index(&[2u8; 32], HEIGHT), [2u8; 32]).unwrap();
        }
        writer.merge_into_parent().await.unwrap();

        let reader = CachedMerkleStore::over(durable);
        let index = leaf_index(&[2u8; 32], HEIGHT);
        reader.preload_key(index, HEIGHT).await.unwrap();
        let tree = RollupMerkleTree::new(&reader, HEIGHT).unwrap();
        let witness = tree.witness(index).unwrap();
        assert!(witness.check_membership(&tree.root(), &[2u8; 32]));
    }
}
