mod common;

use common::*;
use tessera_engine::{
    validate_transaction, BlockTransactionPosition, TransactionExecutionService,
    TransactionTraceService, DEFAULT_MAX_ARGS_LEN,
};
use tessera_primitives::hash_list::TRANSACTIONS_TAG;
use tessera_primitives::{ProvableHashList, RollupMerkleTree, UnprovenBlockMetadata};

#[tokio::test]
async fn test_traces_reproduce_unproven_metadata() {
    let (alice, bob) = (key(1), key(2));
    let chain = Chain::funded(&[(address(&alice), 1_000), (address(&bob), 50)]).await;
    let runtime = runtime();

    let txs = vec![
        transfer(&alice, 0, address(&bob), 100),
        transfer(&bob, 0, address(&alice), 120),
        transfer(&alice, 1, [7u8; 32], 1),
    ];
    for tx in &txs {
        validate_transaction(tx, &runtime, DEFAULT_MAX_ARGS_LEN).unwrap();
    }

    let mut genesis = UnprovenBlockMetadata::genesis(TREE_HEIGHT);
    genesis.resulting_state_root = chain.genesis_root;

    // Unproven execution on one pair of layers.
    let executor = TransactionExecutionService::new(runtime.clone(), TREE_HEIGHT);
    let (state, merkle) = chain.stage();
    let executed = executor.create_unproven_block(&state, &txs, &genesis).await.unwrap();
    let metadata = executor
        .generate_metadata_for_next_block(&executed, &merkle, &genesis)
        .await
        .unwrap();
    assert_eq!(executed.block.transactions, txs);
    assert!(executed.results.iter().all(|r| r.status));

    // Tracing on a fresh pair of layers must land on the same commitments.
    let tracer = TransactionTraceService::with_batch_size(runtime, TREE_HEIGHT, 3);
    let (state, merkle) = chain.stage();
    let mut sequence = ProvableHashList::new(TRANSACTIONS_TAG);
    let mut traces = Vec::new();
    for (i, tx) in executed.block.transactions.iter().enumerate() {
        let position = BlockTransactionPosition::from_index(i, txs.len());
        let trace = tracer
            .create_trace(tx, &state, &merkle, &executed.block.network_state, &mut sequence, position)
            .await
            .unwrap();
        traces.push(trace);
    }

    assert_eq!(sequence.commitment(), executed.block.transactions_hash);
    let root = RollupMerkleTree::new(&merkle, TREE_HEIGHT).unwrap().root();
    assert_eq!(root, metadata.resulting_state_root);

    assert_eq!(traces[0].block_prover.public_input.state_root, chain.genesis_root);
    for pair in traces.windows(2) {
        let next_batches = &pair[1].state_transitions;
        assert_eq!(
            pair[1].block_prover.public_input.state_root,
            next_batches[0].public_input.state_root
        );
        assert_ne!(
            pair[0].block_prover.public_input.transactions_hash,
            pair[1].block_prover.public_input.transactions_hash
        );
    }
    assert_eq!(traces[2].position(), BlockTransactionPosition::Last);

    // Nothing durable changed.
    assert!(chain
        .state
        .get_sync(&tessera_engine::runtime::balances::balance_path(&[7u8; 32]))
        .is_none());
}

#[tokio::test]
async fn test_failed_method_is_still_traced() {
    let alice = key(1);
    let chain = Chain::funded(&[(address(&alice), 10)]).await;
    let tracer = TransactionTraceService::new(runtime(), TREE_HEIGHT);
    let (state, merkle) = chain.stage();
    let mut sequence = ProvableHashList::new(TRANSACTIONS_TAG);
    let ns = UnprovenBlockMetadata {
        resulting_state_root: chain.genesis_root,
        ..UnprovenBlockMetadata::genesis(TREE_HEIGHT)
    }
    .next_network_state();

    let trace = tracer
        .create_trace(
            &transfer(&alice, 0, [7u8; 32], 500),
            &state,
            &merkle,
            &ns,
            &mut sequence,
            BlockTransactionPosition::First,
        )
        .await
        .unwrap();

    // Only the nonce hook's read and write survive the failed transfer.
    let real: Vec<_> = trace
        .state_transitions
        .iter()
        .flat_map(|b| b.batch.iter())
        .filter(|st| !st.is_dummy())
        .collect();
    assert_eq!(real.len(), 2);
    assert_eq!(trace.state_transitions.len(), 1);
}
