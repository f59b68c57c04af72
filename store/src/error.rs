//! Store error types.

/// Errors raised by store backends and staged layers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store failed to serve a read or write.
    #[error("backend error: {0}")]
    Backend(String),

    /// Merging a staged layer into its parent failed; nothing was cleared.
    #[error("merge of {pending} staged writes failed: {reason}")]
    MergeFailed { pending: usize, reason: String },
}

/// Convenience result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
