//! Append-only hash-chain commitments.
//!
//! A `ProvableHashList` commits to an ordered sequence of hashes with a
//! single running value: `c' = H(tag || c || element)`, starting from
//! `ZERO_HASH`. Distinct tags keep the different lists (per-block
//! transactions, the eternal transaction chain, state transitions) from
//! ever producing interchangeable commitments.

use crate::crypto::hash_tagged;
use crate::types::{Hash, ZERO_HASH};

/// Tag for per-block and per-cycle transaction lists.
pub const TRANSACTIONS_TAG: &[u8] = b"tessera/transactions";
/// Tag for the chain-wide eternal transaction list.
pub const ETERNAL_TRANSACTIONS_TAG: &[u8] = b"tessera/eternal-transactions";
/// Tag for state-transition lists.
pub const STATE_TRANSITIONS_TAG: &[u8] = b"tessera/state-transitions";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvableHashList {
    tag: &'static [u8],
    commitment: Hash,
}

impl ProvableHashList {
    /// Empty list with the given domain tag.
    pub fn new(tag: &'static [u8]) -> Self {
        Self::from_commitment(tag, ZERO_HASH)
    }

    /// Continue a list from an existing commitment.
    pub fn from_commitment(tag: &'static [u8], commitment: Hash) -> Self {
        Self { tag, commitment }
    }

    pub fn push(&mut self, element: &Hash) -> Hash {
        self.commitment = hash_tagged(self.tag, &[&self.commitment, element]);
        self.commitment
    }

    pub fn commitment(&self) -> Hash {
        self.commitment
    }
}

/// Commitment of `elements` pushed in order onto an empty list.
pub fn commit_all<'a>(tag: &'static [u8], elements: impl IntoIterator<Item = &'a Hash>) -> Hash {
    let mut list = ProvableHashList::new(tag);
    for element in elements {
        list.push(element);
    }
    list.commitment()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_list_is_zero() {
        assert_eq!(ProvableHashList::new(TRANSACTIONS_TAG).commitment(), ZERO_HASH);
    }

    #[test]
    fn test_order_sensitive() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_ne!(
            commit_all(TRANSACTIONS_TAG, [&a, &b]),
            commit_all(TRANSACTIONS_TAG, [&b, &a])
        );
    }

    #[test]
    fn test_continuation_matches_single_pass() {
        let elems = [[1u8; 32], [2u8; 32], [3u8; 32]];
        let mut first = ProvableHashList::new(TRANSACTIONS_TAG);
        first.push(&elems[0]);

        let mut resumed = ProvableHashList::from_commitment(TRANSACTIONS_TAG, first.commitment());
        resumed.push(&elems[1]);
        resumed.push(&elems[2]);

        assert_eq!(resumed.commitment(), commit_all(TRANSACTIONS_TAG, elems.iter()));
    }

    #[test]
    fn test_tags_separate_domains() {
        let a = [1u8; 32];
        assert_ne!(
            commit_all(TRANSACTIONS_TAG, [&a]),
            commit_all(ETERNAL_TRANSACTIONS_TAG, [&a])
        );
    }
}
