//! Map and map-reduce task definitions.
//!
//! A task's input and output must be self-contained: the queue moves
//! them through their serialized form, the same way a remote worker
//! would receive them.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ProverResult;

/// Anything that can cross a worker boundary.
pub trait TaskPayload: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> TaskPayload for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

#[async_trait]
pub trait MappingTask: Send + Sync + 'static {
    type Input: TaskPayload;
    type Output: TaskPayload;

    fn name(&self) -> &'static str;

    /// Called once before the first `map`.
    async fn prepare(&self) -> ProverResult<()>;

    async fn map(&self, input: Self::Input) -> ProverResult<Self::Output>;
}

#[async_trait]
pub trait MapReduceTask: MappingTask {
    /// Whether `a` and `b` may be reduced, in either order.
    fn reducible(&self, a: &Self::Output, b: &Self::Output) -> bool;

    /// Reduce two reducible outputs into one, ordering them as needed.
    async fn reduce(&self, a: Self::Output, b: Self::Output) -> ProverResult<Self::Output>;
}
