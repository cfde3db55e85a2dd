//! Runs many independent compile units on a bounded pool.

use std::{sync::Arc, time::Duration};

use log::warn;
use thiserror::Error;
use tokio::{
    sync::{mpsc, Semaphore},
    task::{self, JoinSet},
    time,
};

use crate::errors::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("unit {index} timed out after {timeout:?}")]
    TimedOut { index: usize, timeout: Duration },

    #[error("unit {index} failed: {error}")]
    Failed { index: usize, error: Error },

    /// The unit panicked or its task was cancelled.
    #[error("unit {index} was aborted")]
    Aborted { index: usize },
}

pub type BatchResult<T> = Result<T, BatchError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchExecutor {
    max_concurrency: usize,
    timeout: Duration,
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(8, Duration::from_secs(5))
    }
}

async fn run_unit<T, F>(
    permits: Arc<Semaphore>,
    index: usize,
    timeout: Duration,
    unit: F,
) -> BatchResult<T>
where
    F: FnOnce() -> Result<T, Error> + Send + 'static,
    T: Send + 'static,
{
    let permit = permits
        .acquire_owned()
        .await
        .map_err(|_| BatchError::Aborted { index })?;
    let blocking = task::spawn_blocking(move || {
        let _permit = permit;
        unit()
    });
    match time::timeout(timeout, blocking).await {
        Err(_) => {
            warn!("batch unit {index} timed out after {timeout:?}");
            Err(BatchError::TimedOut { index, timeout })
        }
        Ok(Err(_)) => Err(BatchError::Aborted { index }),
        Ok(Ok(Err(error))) => Err(BatchError::Failed { index, error }),
        Ok(Ok(Ok(value))) => Ok(value),
    }
}

impl BatchExecutor {
    /// At most `max_concurrency` units run at once (at least one); each gets `timeout`.
    pub fn new(max_concurrency: usize, timeout: Duration) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            timeout,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs every unit and returns their results in input order.
    ///
    /// A unit that times out is reported as [`BatchError::TimedOut`]; its blocking thread is left
    /// to finish on its own and holds its permit until then.
    pub async fn run<T, F>(&self, units: Vec<F>) -> Vec<BatchResult<T>>
    where
        F: FnOnce() -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let mut results: Vec<Option<BatchResult<T>>> = units.iter().map(|_| None).collect();
        let mut set = JoinSet::new();
        for (index, unit) in units.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            let timeout = self.timeout;
            set.spawn(async move { (index, run_unit(permits, index, timeout, unit).await) });
        }
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => warn!("batch task failed to join: {e}"),
            }
        }
        results
            .into_iter()
            .enumerate()
            .map(|(index, result)| result.unwrap_or(Err(BatchError::Aborted { index })))
            .collect()
    }

    /// Starts every unit and yields `(index, result)` pairs as they finish. The channel holds
    /// at most `max_concurrency` unread results and closes after the last one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn stream<T, F>(&self, units: Vec<F>) -> mpsc::Receiver<(usize, BatchResult<T>)>
    where
        F: FnOnce() -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.max_concurrency));
        let (tx, rx) = mpsc::channel(self.max_concurrency);
        for (index, unit) in units.into_iter().enumerate() {
            let permits = Arc::clone(&permits);
            let tx = tx.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                let result = run_unit(permits, index, timeout, unit).await;
                if tx.send((index, result)).await.is_err() {
                    warn!("batch stream receiver dropped before unit {index} reported");
                }
            });
        }
        rx
    }
}
