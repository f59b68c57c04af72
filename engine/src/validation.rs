//! Stateless transaction validation.
//!
//! These checks run when a transaction enters the mempool, before it can
//! ever be sequenced. They never read state: nonce and balance checks are
//! the runtime hooks' job at execution time.

use tessera_primitives::Transaction;

use crate::error::{EngineError, EngineResult};
use crate::runtime::Runtime;

/// Default upper bound on encoded method arguments.
pub const DEFAULT_MAX_ARGS_LEN: usize = 16 * 1024;

/// Checks:
/// - argument payload no larger than `max_args_len`
/// - method id known to the runtime
/// - signature valid for the sender
pub fn validate_transaction(
    tx: &Transaction,
    runtime: &Runtime,
    max_args_len: usize,
) -> EngineResult<()> {
    if tx.args.len() > max_args_len {
        return Err(EngineError::InvalidTransaction(format!(
            "arguments too large: {} > {}",
            tx.args.len(),
            max_args_len
        )));
    }

    if !runtime.is_known_method(tx.method_id) {
        return Err(EngineError::InvalidTransaction(format!(
            "unknown method id {}",
            tx.method_id
        )));
    }

    tx.verify_signature()?;
    Ok(())
}
