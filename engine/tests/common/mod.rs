//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use tessera_engine::runtime::balances::{genesis_balances, transfer_args, MODULE_NAME, TRANSFER};
use tessera_engine::{apply_genesis_state, FeeConfig, Runtime};
use tessera_primitives::{Address, Hash, MethodId, Transaction};
use tessera_store::{
    CachedMerkleStore, CachedStateStore, InMemoryAsyncMerkleTreeStore, InMemoryStateStore,
};

pub const TREE_HEIGHT: usize = 32;

pub fn key(seed: u8) -> SigningKey {
    SigningKey::from_bytes(&[seed; 32])
}

pub fn address(key: &SigningKey) -> Address {
    key.verifying_key().to_bytes()
}

pub fn transfer(from: &SigningKey, nonce: u64, to: Address, amount: u64) -> Transaction {
    Transaction::new_signed(
        MethodId::from_names(MODULE_NAME, TRANSFER),
        nonce,
        transfer_args(&to, amount),
        from,
    )
}

pub fn runtime() -> Arc<Runtime> {
    Arc::new(Runtime::with_defaults(FeeConfig::default()))
}

/// Durable stores seeded with funded accounts.
pub struct Chain {
    pub state: Arc<InMemoryStateStore>,
    pub merkle: Arc<InMemoryAsyncMerkleTreeStore>,
    pub genesis_root: Hash,
}

impl Chain {
    pub async fn funded(accounts: &[(Address, u64)]) -> Self {
        let state = Arc::new(InMemoryStateStore::new());
        let merkle = Arc::new(InMemoryAsyncMerkleTreeStore::new());
        let staged_state = CachedStateStore::new(state.clone());
        let staged_merkle = CachedMerkleStore::over(merkle.clone());
        let genesis_root = apply_genesis_state(
            &staged_state,
            &staged_merkle,
            &genesis_balances(accounts),
            TREE_HEIGHT,
        )
        .await
        .expect("genesis");
        staged_state.merge_into_parent().await.expect("merge state");
        staged_merkle.merge_into_parent().await.expect("merge merkle");
        Self {
            state,
            merkle,
            genesis_root,
        }
    }

    pub fn stage(&self) -> (CachedStateStore, CachedMerkleStore) {
        (
            CachedStateStore::new(self.state.clone()),
            CachedMerkleStore::over(self.merkle.clone()),
        )
    }
}
