//! `tessera-store` — asynchronous stores and staged write-back layers.
//!
//! Block execution never writes durable state directly. It runs against a
//! [`LayeredStore`] whose writes are merged into the parent store only once
//! the surrounding cycle has succeeded. The same layering serves both the
//! state store (path → value) and the Merkle node store (node key → hash).

pub mod error;
pub mod store;
pub mod layered;
pub mod merkle;

use tessera_primitives::Hash;

pub use error::{StoreError, StoreResult};
pub use store::{AsyncStore, InMemoryStore, StoreKey, StoreValue};
pub use layered::{Cached, LayeredStore};
pub use merkle::{AsyncMerkleTreeStore, CachedMerkleStore, InMemoryAsyncMerkleTreeStore};

/// Durable state store addressed by state path.
pub type AsyncStateStore = dyn AsyncStore<Hash, Vec<u8>>;

/// In-memory durable state store.
pub type InMemoryStateStore = InMemoryStore<Hash, Vec<u8>>;

/// Staged layer over a state store.
pub type CachedStateStore = LayeredStore<Hash, Vec<u8>>;
