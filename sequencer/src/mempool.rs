//! Pending transaction pool.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tessera_engine::{validate_transaction, EngineError, Runtime};
use tessera_primitives::codec::decode_transaction;
use tessera_primitives::{short_hex, Hash, Transaction};
use tracing::{debug, trace};

use crate::error::{SequencerError, SequencerResult};

#[async_trait]
pub trait Mempool: Send + Sync {
    /// Validate and enqueue `tx`, returning its hash.
    async fn add(&self, tx: Transaction) -> SequencerResult<Hash>;

    /// Snapshot of pending transactions in arrival order.
    async fn get_txs(&self) -> SequencerResult<Vec<Transaction>>;

    /// Remove every transaction in `txs`, or none of them.
    ///
    /// Returns `false`, changing nothing, if any of them is not pending.
    async fn remove_txs(&self, txs: &[Transaction]) -> SequencerResult<bool>;

    async fn len(&self) -> SequencerResult<usize>;
}

#[derive(Default)]
struct Pool {
    txs: Vec<Transaction>,
    hashes: HashSet<Hash>,
}

/// In-memory mempool fed directly by the operator's clients.
pub struct PrivateMempool {
    runtime: Arc<Runtime>,
    max_args_len: usize,
    pool: Mutex<Pool>,
}

impl PrivateMempool {
    pub fn new(runtime: Arc<Runtime>, max_args_len: usize) -> Self {
        Self {
            runtime,
            max_args_len,
            pool: Mutex::new(Pool::default()),
        }
    }

    /// Decode a transaction from its wire form and add it.
    pub async fn submit_encoded(&self, bytes: &[u8]) -> SequencerResult<Hash> {
        let tx = decode_transaction(bytes).map_err(|e| SequencerError::TxRejected(e.to_string()))?;
        self.add(tx).await
    }
}

#[async_trait]
impl Mempool for PrivateMempool {
    async fn add(&self, tx: Transaction) -> SequencerResult<Hash> {
        validate_transaction(&tx, &self.runtime, self.max_args_len).map_err(|e| match e {
            EngineError::InvalidTransaction(reason) => SequencerError::TxRejected(reason),
            other => SequencerError::TxRejected(other.to_string()),
        })?;

        let hash = tx.hash();
        let mut pool = self.pool.lock();
        if !pool.hashes.insert(hash) {
            return Err(SequencerError::DuplicateTransaction(short_hex(&hash)));
        }
        pool.txs.push(tx);
        trace!(tx = %short_hex(&hash), pending = pool.txs.len(), "transaction added");
        Ok(hash)
    }

    async fn get_txs(&self) -> SequencerResult<Vec<Transaction>> {
        Ok(self.pool.lock().txs.clone())
    }

    async fn remove_txs(&self, txs: &[Transaction]) -> SequencerResult<bool> {
        let remove: HashSet<Hash> = txs.iter().map(Transaction::hash).collect();
        let mut pool = self.pool.lock();
        if remove.len() != txs.len() || !remove.iter().all(|h| pool.hashes.contains(h)) {
            debug!(requested = txs.len(), "mempool removal refused");
            return Ok(false);
        }
        pool.txs.retain(|tx| !remove.contains(&tx.hash()));
        pool.hashes.retain(|h| !remove.contains(h));
        Ok(true)
    }

    async fn len(&self) -> SequencerResult<usize> {
        Ok(self.pool.lock().txs.len())
    }
}
