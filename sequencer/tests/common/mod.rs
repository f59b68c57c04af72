//! Shared fixtures for sequencer integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use tessera_engine::runtime::balances::{
    balance_path, genesis_balances, transfer_args, MODULE_NAME, TRANSFER,
};
use tessera_primitives::types::u64_from_le_bytes;
use tessera_primitives::{Address, MethodId, Transaction};
use tessera_sequencer::{NoopBaseLayer, Sequencer, SequencerConfig};

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

pub fn config() -> SequencerConfig {
    SequencerConfig {
        unproven_block_interval_ms: 10,
        block_interval_ms: 25,
        worker_count: 2,
        st_batch_size: 2,
        ..SequencerConfig::default()
    }
}

/// A sequencer with genesis applied and `funded` accounts.
pub async fn sequencer(funded: &[(Address, u64)]) -> Sequencer {
    let sequencer = Sequencer::new(config(), Arc::new(NoopBaseLayer)).expect("valid config");
    sequencer
        .genesis(&genesis_balances(funded))
        .await
        .expect("genesis");
    sequencer
}

/// Balance of `addr` in the canonical state store.
pub fn canonical_balance(sequencer: &Sequencer, addr: &Address) -> u64 {
    sequencer
        .state()
        .get_sync(&balance_path(addr))
        .and_then(|bytes| u64_from_le_bytes(&bytes))
        .unwrap_or(0)
}
