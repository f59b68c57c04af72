//! Fixed-height Merkle tree over an external node store.
//!
//! The state root committed by every block is the root of this tree. Each
//! state path maps to one leaf; absent leaves hash to `ZERO_HASH`, and an
//! all-empty subtree at level `l` hashes to the precomputed zero hash for
//! that level, so the store only ever holds nodes that were written.
//!
//! Nodes are addressed by [`NodeKey`] (`level` 0 is the leaf level, the
//! root lives at `(height - 1, 0)`). The tree never caches nodes itself:
//! reads and writes go straight to a [`MerkleTreeStore`], which lets a
//! layered cache sit in front of the canonical node storage.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::crypto::hash_blake3;
use crate::error::{PrimitiveError, PrimitiveResult};
use crate::types::{Hash, ZERO_HASH};

/// Domain separator for leaf nodes (prevents second-preimage attacks).
const LEAF_PREFIX: u8 = 0x00;
/// Domain separator for internal nodes.
const INTERNAL_PREFIX: u8 = 0x01;

/// Largest supported height: leaf indices must fit in a `u64`.
pub const MAX_TREE_HEIGHT: usize = 64;

/// Position of a node inside the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub level: u32,
    pub index: u64,
}

impl NodeKey {
    pub fn new(level: u32, index: u64) -> Self {
        Self { level, index }
    }

    /// Sibling of this node on the same level.
    pub fn sibling(self) -> Self {
        Self {
            level: self.level,
            index: self.index ^ 1,
        }
    }
}

/// Synchronous node storage used by [`RollupMerkleTree`].
///
/// Implementations must answer from memory; asynchronous backends are
/// expected to preload the nodes a computation needs beforehand.
pub trait MerkleTreeStore: Send + Sync {
    fn get_node(&self, key: &NodeKey) -> Option<Hash>;
    fn set_node(&self, key: NodeKey, value: Hash);
}

/// Node storage backed by an in-memory map.
#[derive(Debug, Default)]
pub struct InMemoryMerkleTreeStorage {
    nodes: Mutex<BTreeMap<NodeKey, Hash>>,
}

impl InMemoryMerkleTreeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of explicitly stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.lock().is_empty()
    }
}

impl MerkleTreeStore for InMemoryMerkleTreeStorage {
    fn get_node(&self, key: &NodeKey) -> Option<Hash> {
        self.nodes.lock().get(key).copied()
    }

    fn set_node(&self, key: NodeKey, value: Hash) {
        self.nodes.lock().insert(key, value);
    }
}

/// Hash a leaf: H(LEAF_PREFIX || path || value_len_le32 || value)
pub fn hash_leaf(path: &Hash, value: &[u8]) -> Hash {
    let value_len = (value.len() as u32).to_le_bytes();
    let mut data = Vec::with_capacity(1 + 32 + 4 + value.len());
    data.push(LEAF_PREFIX);
    data.extend_from_slice(path);
    data.extend_from_slice(&value_len);
    data.extend_from_slice(value);
    hash_blake3(&data)
}

/// Leaf value for an optional state entry. Absent entries are `ZERO_HASH`.
pub fn leaf_value(path: &Hash, value: Option<&[u8]>) -> Hash {
    match value {
        Some(v) => hash_leaf(path, v),
        None => ZERO_HASH,
    }
}

/// Hash an internal node: H(INTERNAL_PREFIX || left || right)
pub fn hash_internal(left: &Hash, right: &Hash) -> Hash {
    let mut data = [0u8; 1 + 32 + 32];
    data[0] = INTERNAL_PREFIX;
    data[1..33].copy_from_slice(left);
    data[33..65].copy_from_slice(right);
    hash_blake3(&data)
}

/// Hashes of all-empty subtrees, indexed by level.
pub fn zero_hashes(height: usize) -> Vec<Hash> {
    let mut zeros = Vec::with_capacity(height);
    let mut current = ZERO_HASH;
    for _ in 0..height {
        zeros.push(current);
        current = hash_internal(&current, &current);
    }
    zeros
}

/// Root of a tree of the given height with no leaves set.
pub fn empty_root(height: usize) -> Hash {
    zero_hashes(height).last().copied().unwrap_or(ZERO_HASH)
}

/// Number of leaves in a tree of the given height.
pub fn leaf_count(height: usize) -> u64 {
    1u64 << (height.saturating_sub(1) as u32)
}

/// Leaf index of a state path: its first 8 bytes (LE) reduced to the tree width.
pub fn leaf_index(path: &Hash, height: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&path[..8]);
    let raw = u64::from_le_bytes(buf);
    raw & (leaf_count(height) - 1)
}

/// Every node touched when updating or proving `index`: the path to the
/// root plus each sibling along it.
pub fn path_node_keys(index: u64, height: usize) -> Vec<NodeKey> {
    let mut keys = Vec::with_capacity(2 * height);
    let mut idx = index;
    for level in 0..height as u32 {
        let key = NodeKey::new(level, idx);
        keys.push(key);
        if (level as usize) + 1 < height {
            keys.push(key.sibling());
        }
        idx /= 2;
    }
    keys
}

/// Membership witness for a single leaf. The default (empty) witness pads
/// dummy state transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleWitness {
    /// Sibling hashes from the leaf level up to just below the root.
    pub siblings: Vec<Hash>,
    /// `true` when the node on the path is the left child at that level.
    pub is_left: Vec<bool>,
}

impl MerkleWitness {
    /// Root obtained by hashing `leaf` up along this witness.
    pub fn compute_root(&self, leaf: &Hash) -> Hash {
        let mut current = *leaf;
        for (sibling, is_left) in self.siblings.iter().zip(self.is_left.iter()) {
            current = if *is_left {
                hash_internal(&current, sibling)
            } else {
                hash_internal(sibling, &current)
            };
        }
        current
    }

    /// Leaf index encoded by the direction bits.
    pub fn calculate_index(&self) -> u64 {
        self.is_left
            .iter()
            .enumerate()
            .fold(0u64, |acc, (level, left)| {
                if *left {
                    acc
                } else {
                    acc | (1u64 << level)
                }
            })
    }

    pub fn check_membership(&self, root: &Hash, leaf: &Hash) -> bool {
        self.compute_root(leaf) == *root
    }
}

/// Fixed-height Merkle tree reading and writing nodes through `S`.
pub struct RollupMerkleTree<'a, S: MerkleTreeStore + ?Sized> {
    store: &'a S,
    height: usize,
    zeros: Vec<Hash>,
}

impl<'a, S: MerkleTreeStore + ?Sized> RollupMerkleTree<'a, S> {
    pub fn new(store: &'a S, height: usize) -> PrimitiveResult<Self> {
        if height == 0 || height > MAX_TREE_HEIGHT {
            return Err(PrimitiveError::Merkle(format!(
                "tree height must be in 1..={MAX_TREE_HEIGHT}, got {height}"
            )));
        }
        Ok(Self {
            store,
            height,
            zeros: zero_hashes(height),
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn node(&self, level: u32, index: u64) -> Hash {
        self.store
            .get_node(&NodeKey::new(level, index))
            .unwrap_or(self.zeros[level as usize])
    }

    pub fn root(&self) -> Hash {
        self.node(self.height as u32 - 1, 0)
    }

    pub fn get_leaf(&self, index: u64) -> Hash {
        self.node(0, index)
    }

    /// Set the leaf at `index` and rehash the path up to the root.
    pub fn set_leaf(&self, index: u64, leaf: Hash) -> PrimitiveResult<()> {
        self.check_index(index)?;
        self.store.set_node(NodeKey::new(0, index), leaf);

        let mut current = leaf;
        let mut idx = index;
        for level in 1..self.height as u32 {
            let sibling = self.node(level - 1, idx ^ 1);
            current = if idx % 2 == 0 {
                hash_internal(&current, &sibling)
            } else {
                hash_internal(&sibling, &current)
            };
            idx /= 2;
            self.store.set_node(NodeKey::new(level, idx), current);
        }
        Ok(())
    }

    pub fn witness(&self, index: u64) -> PrimitiveResult<MerkleWitness> {
        self.check_index(index)?;
        let depth = self.height - 1;
        let mut siblings = Vec::with_capacity(depth);
        let mut is_left = Vec::with_capacity(depth);
        let mut idx = index;
        for level in 0..depth as u32 {
            siblings.push(self.node(level, idx ^ 1));
            is_left.push(idx % 2 == 0);
            idx /= 2;
        }
        Ok(MerkleWitness { siblings, is_left })
    }

    fn check_index(&self, index: u64) -> PrimitiveResult<()> {
        if index >= leaf_count(self.height) {
            return Err(PrimitiveError::Merkle(format!(
                "leaf index {index} out of range for height {}",
                self.height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree_root_matches_zero_hashes() {
        let store = InMemoryMerkleTreeStorage::new();
        let tree = RollupMerkleTree::new(&store, 8).unwrap();
        assert_eq!(tree.root(), empty_root(8));
        assert_ne!(tree.root(), ZERO_HASH);
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_leaf_changes_root_and_witness_verifies() {
        let store = InMemoryMerkleTreeStorage::new();
        let tree = RollupMerkleTree::new(&store, 8).unwrap();

        let leaf = hash_leaf(&[7u8; 32], b"value");
        tree.set_leaf(5, leaf).unwrap();
        let root = tree.root();
        assert_ne!(root, empty_root(8));

        let witness = tree.witness(5).unwrap();
        assert_eq!(witness.calculate_index(), 5);
        assert!(witness.check_membership(&root, &leaf));
        assert!(!witness.check_membership(&root, &ZERO_HASH));
    }

    #[test]
    fn test_insertion_order_independence() {
        let a = InMemoryMerkleTreeStorage::new();
        let b = InMemoryMerkleTreeStorage::new();
        let t1 = RollupMerkleTree::new(&a, 16).unwrap();
        let t2 = RollupMerkleTree::new(&b, 16).unwrap();

        t1.set_leaf(1, [1u8; 32]).unwrap();
        t1.set_leaf(300, [2u8; 32]).unwrap();
        t2.set_leaf(300, [2u8; 32]).unwrap();
        t2.set_leaf(1, [1u8; 32]).unwrap();

        assert_eq!(t1.root(), t2.root());
    }

    #[test]
    fn test_witness_then_update_yields_new_root() {
        let store = InMemoryMerkleTreeStorage::new();
        let tree = RollupMerkleTree::new(&store, 10).unwrap();
        tree.set_leaf(3, [1u8; 32]).unwrap();

        let witness = tree.witness(3).unwrap();
        let expected = witness.compute_root(&[2u8; 32]);
        tree.set_leaf(3, [2u8; 32]).unwrap();
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn test_index_out_of_range() {
        let store = InMemoryMerkleTreeStorage::new();
        let tree = RollupMerkleTree::new(&store, 4).unwrap();
        assert!(tree.set_leaf(8, ZERO_HASH).is_err());
        assert!(tree.witness(7).is_ok());
    }

    #[test]
    fn test_invalid_height() {
        let store = InMemoryMerkleTreeStorage::new();
        assert!(RollupMerkleTree::new(&store, 0).is_err());
        assert!(RollupMerkleTree::new(&store, 65).is_err());
        assert!(RollupMerkleTree::new(&store, 64).is_ok());
    }

    #[test]
    fn test_leaf_index_is_bounded() {
        let path = [0xffu8; 32];
        assert_eq!(leaf_index(&path, 4), 7);
        assert_eq!(leaf_index(&path, 64), (1u64 << 63) - 1);
    }

    #[test]
    fn test_path_node_keys_cover_witness() {
        let keys = path_node_keys(5, 4);
        assert!(keys.contains(&NodeKey::new(0, 5)));
        assert!(keys.contains(&NodeKey::new(0, 4)));
        assert!(keys.contains(&NodeKey::new(1, 3)));
        assert!(keys.contains(&NodeKey::new(3, 0)));
        assert!(!keys.contains(&NodeKey::new(3, 1)));
    }

    #[test]
    fn test_leaf_value_absent_is_zero() {
        assert_eq!(leaf_value(&[1u8; 32], None), ZERO_HASH);
        assert_ne!(leaf_value(&[1u8; 32], Some(b"")), ZERO_HASH);
    }
}
