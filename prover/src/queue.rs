//! In-process worker queue.
//!
//! Each submission is serialized, run on its own tokio task once a worker
//! slot is free, and its result deserialized on the way back. A remote
//! queue would ship the same JSON payloads.
//!
//! Dropping a submission's future aborts its task, so a flow that bails
//! out on the first failure leaves no proving work running behind it.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::error::{ProverError, ProverResult};
use crate::task::{MapReduceTask, MappingTask};

/// Aborts the task when dropped; a no-op once it has finished.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Clone)]
pub struct LocalTaskQueue {
    workers: Arc<Semaphore>,
    worker_count: usize,
}

impl LocalTaskQueue {
    /// `worker_count` is clamped to at least one.
    pub fn new(worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        Self {
            workers: Arc::new(Semaphore::new(worker_count)),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub async fn map<T: MappingTask>(&self, task: Arc<T>, input: T::Input) -> ProverResult<T::Output> {
        let payload = serde_json::to_string(&input)?;
        self.dispatch(task.name(), payload, move |input: T::Input| async move {
            task.map(input).await
        })
        .await
    }

    pub async fn reduce<T: MapReduceTask>(
        &self,
        task: Arc<T>,
        a: T::Output,
        b: T::Output,
    ) -> ProverResult<T::Output> {
        let payload = serde_json::to_string(&(a, b))?;
        self.dispatch(task.name(), payload, move |(a, b): (T::Output, T::Output)| async move {
            task.reduce(a, b).await
        })
        .await
    }

    async fn dispatch<I, O, F, Fut>(&self, name: &'static str, payload: String, run: F) -> ProverResult<O>
    where
        I: DeserializeOwned + Send + 'static,
        O: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce(I) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ProverResult<O>> + Send + 'static,
    {
        let workers = self.workers.clone();
        let mut handle = AbortOnDrop(tokio::spawn(async move {
            let _permit = workers
                .acquire_owned()
                .await
                .map_err(|e| ProverError::Worker(e.to_string()))?;
            trace!(task = name, bytes = payload.len(), "task started");
            let input: I = serde_json::from_str(&payload)?;
            let output = run(input).await?;
            Ok::<String, ProverError>(serde_json::to_string(&output)?)
        }));

        let output = (&mut handle.0)
            .await
            .map_err(|e| ProverError::Worker(format!("{name}: {e}")))??;
        Ok(serde_json::from_str(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// Sleeps, then records that it ran to completion.
    struct SlowTask {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl MappingTask for SlowTask {
        type Input = u64;
        type Output = u64;

        fn name(&self) -> &'static str {
            "slow"
        }

        async fn prepare(&self) -> ProverResult<()> {
            Ok(())
        }

        async fn map(&self, input: u64) -> ProverResult<u64> {
            tokio::time::sleep(Duration::from_millis(input)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(input)
        }
    }

    #[tokio::test]
    async fn test_map_returns_task_output() {
        let finished = Arc::new(AtomicBool::new(false));
        let queue = LocalTaskQueue::new(1);
        let out = queue
            .map(Arc::new(SlowTask { finished: finished.clone() }), 1)
            .await
            .unwrap();
        assert_eq!(out, 1);
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dropped_submission_aborts_its_task() {
        let finished = Arc::new(AtomicBool::new(false));
        let queue = LocalTaskQueue::new(1);
        let task = Arc::new(SlowTask { finished: finished.clone() });

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), queue.map(task, 200)).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(!finished.load(Ordering::SeqCst));
        // The aborted task released its worker slot.
        assert_eq!(queue.workers.available_permits(), 1);
    }
}
