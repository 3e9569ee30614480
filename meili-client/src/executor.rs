//! Bounded "run many, join all" execution.
//!
//! The same façade code runs in both client flavors; only the [`Executor`]
//! differs. The async client joins operations concurrently (optionally
//! bounded), the blocking client awaits them one at a time.

use std::future::Future;
use std::num::NonZeroUsize;

use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::errors::MeiliError;

/// How independent operations are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One operation at a time, in submission order.
    Sequential,
    /// Operations overlap, up to the executor's limit.
    #[default]
    Concurrent,
}

/// Runs a set of operations and joins their results in submission order.
///
/// On failure the first error in submission order is returned and the
/// operations still in flight are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Executor {
    mode: ExecutionMode,
    limit: Option<NonZeroUsize>,
}

impl Executor {
    pub fn new(mode: ExecutionMode, limit: Option<NonZeroUsize>) -> Self {
        Self { mode, limit }
    }

    /// Executor that awaits one operation at a time.
    pub fn sequential() -> Self {
        Self::new(ExecutionMode::Sequential, None)
    }

    /// Executor that overlaps operations, at most `limit` at once when set.
    pub fn concurrent(limit: Option<NonZeroUsize>) -> Self {
        Self::new(ExecutionMode::Concurrent, limit)
    }

    /// Override the limit for one call site; `None` keeps the current one.
    pub fn with_limit(self, limit: Option<NonZeroUsize>) -> Self {
        Self {
            limit: limit.or(self.limit),
            ..self
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn limit(&self) -> Option<NonZeroUsize> {
        self.limit
    }

    /// Run every operation and collect the results in submission order.
    pub async fn join_all<I, F, T>(&self, operations: I) -> Result<Vec<T>, MeiliError>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = Result<T, MeiliError>>,
    {
        let operations: Vec<F> = operations.into_iter().collect();
        if operations.is_empty() {
            return Ok(Vec::new());
        }

        match self.mode {
            ExecutionMode::Sequential => {
                let mut results = Vec::with_capacity(operations.len());
                for operation in operations {
                    results.push(operation.await?);
                }
                Ok(results)
            }
            ExecutionMode::Concurrent => {
                let in_flight = self
                    .limit
                    .map(NonZeroUsize::get)
                    .unwrap_or(operations.len());
                debug!(
                    operations = operations.len(),
                    in_flight, "Joining operations"
                );
                stream::iter(operations)
                    .buffered(in_flight)
                    .try_collect()
                    .await
            }
        }
    }

    /// Run two operations to completion, the first one polled first.
    ///
    /// Sequentially, `second` only starts once `first` has finished.
    pub async fn join_pair<A, B>(&self, first: A, second: B) -> (A::Output, B::Output)
    where
        A: Future,
        B: Future,
    {
        match self.mode {
            ExecutionMode::Sequential => {
                let a = first.await;
                let b = second.await;
                (a, b)
            }
            ExecutionMode::Concurrent => future::join(first, second).await,
        }
    }
}
