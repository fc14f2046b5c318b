//! The engine's single entry point for remote chain queries.
//!
//! [`GuardedChain`] owns the run-wide query budget: a semaphore capping
//! in-flight remote calls, and the [`RetryPolicy`] applied to each call.
//! A permit is held only for the duration of one attempt and released
//! before any backoff sleep.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Semaphore;

use regsync_types::{ObjectId, WalletAddress};

use crate::retry::with_backoff;
use crate::{ChainError, ChainProvider, ObjectOptions, OwnedObjectsPage, RetryPolicy};

/// Default number of concurrent in-flight remote queries.
pub const DEFAULT_MAX_CONCURRENT: usize = 2;

/// Counters for one run's remote traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryStats {
    /// Remote attempts issued, including retried ones.
    pub attempts: u64,
    /// Attempts answered with a rate-limit signal.
    pub rate_limited: u64,
}

pub struct GuardedChain {
    inner: Arc<dyn ChainProvider>,
    policy: RetryPolicy,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    attempts: AtomicU64,
    rate_limited: AtomicU64,
}

impl GuardedChain {
    pub fn new(inner: Arc<dyn ChainProvider>, policy: RetryPolicy, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            inner,
            policy,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            attempts: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn stats(&self) -> QueryStats {
        QueryStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
        }
    }

    /// One permit-guarded attempt.
    async fn attempt<T, Fut>(&self, call: Fut) -> Result<T, ChainError>
    where
        Fut: std::future::Future<Output = Result<T, ChainError>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| ChainError::Transport("query limiter closed".into()))?;
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let result = call.await;
        if matches!(result, Err(ChainError::RateLimited)) {
            self.rate_limited.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    pub async fn list_owned_objects(
        &self,
        owner: &WalletAddress,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<OwnedObjectsPage, ChainError> {
        with_backoff(&self.policy, "listOwnedObjects", move || async move {
            self.attempt(self.inner.list_owned_objects(owner, cursor, limit))
                .await
        })
        .await
    }

    pub async fn get_object(
        &self,
        id: &ObjectId,
        options: ObjectOptions,
    ) -> Result<Value, ChainError> {
        with_backoff(&self.policy, "getObject", move || async move {
            self.attempt(self.inner.get_object(id, options)).await
        })
        .await
    }
}
