//! Shared fixtures for prover integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use tessera_engine::runtime::balances::{genesis_balances, transfer_args, MODULE_NAME, TRANSFER};
use tessera_engine::{
    apply_genesis_state, BlockTransactionPosition, FeeConfig, Runtime, TransactionTrace,
    TransactionTraceService,
};
use tessera_primitives::hash_list::TRANSACTIONS_TAG;
use tessera_primitives::{
    Address, Hash, MethodId, NetworkState, ProvableHashList, Transaction, UnprovenBlockMetadata,
};
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

/// Traces of one block, first transaction already inheriting the
/// previous block's network state.
pub struct TracedBlock {
    pub traces: Vec<TransactionTrace>,
    pub genesis_root: Hash,
    pub final_root: Hash,
    pub transactions_hash: Hash,
    pub network_state: NetworkState,
}

pub async fn trace_block(txs: &[Transaction], funded: &[(Address, u64)], batch_size: usize) -> TracedBlock {
    let state = CachedStateStore::new(Arc::new(InMemoryStateStore::new()));
    let merkle = CachedMerkleStore::over(Arc::new(InMemoryAsyncMerkleTreeStore::new()));
    let genesis_root = apply_genesis_state(&state, &merkle, &genesis_balances(funded), TREE_HEIGHT)
        .await
        .expect("genesis");

    let previous = UnprovenBlockMetadata {
        resulting_state_root: genesis_root,
        ..UnprovenBlockMetadata::genesis(TREE_HEIGHT)
    };
    let network_state = previous.next_network_state();

    let tracer = TransactionTraceService::with_batch_size(runtime(), TREE_HEIGHT, batch_size);
    let mut sequence = ProvableHashList::new(TRANSACTIONS_TAG);
    let mut traces = Vec::with_capacity(txs.len());
    for (i, tx) in txs.iter().enumerate() {
        let position = BlockTransactionPosition::from_index(i, txs.len());
        let mut trace = tracer
            .create_trace(tx, &state, &merkle, &network_state, &mut sequence, position)
            .await
            .expect("trace");
        trace.inherit_network_state(&previous.resulting_network_state);
        traces.push(trace);
    }

    let final_root = tessera_primitives::RollupMerkleTree::new(&merkle, TREE_HEIGHT)
        .expect("tree")
        .root();
    TracedBlock {
        traces,
        genesis_root,
        final_root,
        transactions_hash: sequence.commitment(),
        network_state,
    }
}

/// Alice pays Bob three times.
pub async fn three_transfers(batch_size: usize) -> TracedBlock {
    let (alice, bob) = (key(1), key(2));
    let txs = vec![
        transfer(&alice, 0, address(&bob), 10),
        transfer(&alice, 1, address(&bob), 20),
        transfer(&alice, 2, address(&bob), 30),
    ];
    trace_block(&txs, &[(address(&alice), 1_000)], batch_size).await
}
