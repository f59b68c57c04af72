//! Core type aliases and constants for the Tessera sequencer.
//!
//! These types are shared by the stores, the runtime, the prover, and the
//! block producers.

use serde::{Deserialize, Serialize};

use crate::crypto::hash_tagged;

/// 32-byte hash used for state roots, state paths, and commitments.
pub type Hash = [u8; 32];

/// 32-byte address identifying an account (its Ed25519 public key).
pub type Address = [u8; 32];

/// Block height (monotonically increasing, genesis is 0).
pub type BlockHeight = u64;

/// A zero-valued hash (32 zero bytes).
pub const ZERO_HASH: Hash = [0u8; 32];

/// A zero-valued address (32 zero bytes).
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// Default height of the state Merkle tree (leaf level included).
pub const DEFAULT_TREE_HEIGHT: usize = 64;

/// Default number of state transitions per proving batch.
pub const DEFAULT_ST_BATCH_SIZE: usize = 4;

/// Identifier of a runtime method, derived from `"<module>.<method>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodId(pub u64);

impl MethodId {
    /// Derive the identifier of `<module>.<method>`.
    pub fn from_names(module: &str, method: &str) -> Self {
        let digest = hash_tagged(b"tessera/method-id", &[module.as_bytes(), method.as_bytes()]);
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&digest[..8]);
        Self(u64::from_le_bytes(buf))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for MethodId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Convert a `Hash` to a hex string for display purposes.
pub fn hash_to_hex(hash: &Hash) -> String {
    format!("0x{}", hex::encode(hash))
}

/// Short form of a hash for log lines (first 4 bytes).
pub fn short_hex(hash: &Hash) -> String {
    hex::encode(&hash[..4])
}

/// Encode a u64 as little-endian bytes.
pub fn u64_to_le_bytes(v: u64) -> [u8; 8] {
    v.to_le_bytes()
}

/// Decode a u64 from little-endian bytes.
pub fn u64_from_le_bytes(bytes: &[u8]) -> Option<u64> {
    if bytes.len() < 8 {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    Some(u64::from_le_bytes(buf))
}

/// Concatenate byte slices into a single Vec.
pub fn concat_bytes(slices: &[&[u8]]) -> Vec<u8> {
    let total: usize = slices.iter().map(|s| s.len()).sum();
    let mut out = Vec::with_capacity(total);
    for s in slices {
        out.extend_from_slice(s);
    }
    out
}
