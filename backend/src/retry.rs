//! Resilient Call Executor
//!
//! Runs a network operation against the active endpoint with bounded
//! retries and linear backoff. Rate-limit failures rotate the endpoint
//! pool before the next attempt.
//!
//! ```text
//! attempt 1 ─ fail (429) ─ advance pool ─ sleep 1×base ─ attempt 2 ─ ...
//! attempt N ─ fail ────────────────────────────────────── RetryExhausted
//! ```

use crate::{
    config::RetryConfig,
    endpoint_pool::EndpointPool,
    error::{FailureClass, ReconcileError, Result},
    types::Endpoint,
};
use std::{future::Future, sync::Arc, time::Duration};
use tracing::{debug, warn};

/// Backoff behaviour for one family of operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryProfile {
    /// Delay before attempt `n + 1` is `base_delay × n`
    pub base_delay: Duration,

    /// Whether rate-limit failures rotate the RPC endpoint pool
    pub failover: bool,
}

impl RetryProfile {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

pub struct ResilientExecutor {
    pool: Arc<EndpointPool>,
    max_attempts: u32,
    chain_read: RetryProfile,
    discovery: RetryProfile,
}

impl ResilientExecutor {
    pub fn new(pool: Arc<EndpointPool>, config: &RetryConfig) -> Self {
        Self {
            pool,
            max_attempts: config.max_attempts.max(1),
            chain_read: RetryProfile {
                base_delay: config.chain_read_backoff,
                failover: true,
            },
            // The pair listing is not an RPC endpoint.
            discovery: RetryProfile {
                base_delay: config.discovery_backoff,
                failover: false,
            },
        }
    }

    #[cfg(test)]
    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    /// Retry an account or mint read
    pub async fn chain_read<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut(Endpoint) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute(operation, self.chain_read, op).await
    }

    /// Retry a pool discovery lookup
    pub async fn discovery<T, F, Fut>(&self, operation: &str, op: F) -> Result<T>
    where
        F: FnMut(Endpoint) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute(operation, self.discovery, op).await
    }

    pub async fn execute<T, F, Fut>(
        &self,
        operation: &str,
        profile: RetryProfile,
        mut op: F,
    ) -> Result<T>
    where
        F: FnMut(Endpoint) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;
            let (observed, endpoint) = self.pool.current();
            let endpoint = endpoint.clone();

            let err = match op(endpoint).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let class = err.classify();
            warn!(
                "Error in {} (attempt {}/{}): {}",
                operation, attempt, self.max_attempts, err
            );

            if class == FailureClass::Permanent {
                return Err(err);
            }

            if attempt >= self.max_attempts {
                return Err(ReconcileError::RetryExhausted {
                    operation: operation.to_string(),
                    attempts: attempt,
                    source: Box::new(err),
                });
            }

            if class == FailureClass::RateLimited && profile.failover {
                self.pool.advance(observed);
            }

            let delay = profile.delay_for(attempt);
            debug!("Retrying {} in {:?}", operation, delay);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::commitment_config::CommitmentConfig;
    use std::sync::Mutex;

    fn executor(endpoints: usize, max_attempts: u32) -> ResilientExecutor {
        let endpoints = (0..endpoints)
            .map(|i| Endpoint::new(format!("http://rpc-{}", i), CommitmentConfig::confirmed()))
            .collect();
        let pool = Arc::new(EndpointPool::new(endpoints).unwrap());
        let config = RetryConfig {
            max_attempts,
            chain_read_backoff: Duration::ZERO,
            discovery_backoff: Duration::ZERO,
        };
        ResilientExecutor::new(pool, &config)
    }

    fn rate_limited() -> ReconcileError {
        ReconcileError::Rpc {
            class: FailureClass::RateLimited,
            message: "429 Too Many Requests".to_string(),
        }
    }

    #[test]
    fn test_backoff_is_linear() {
        let profile = RetryProfile {
            base_delay: Duration::from_secs(2),
            failover: true,
        };
        assert_eq!(profile.delay_for(1), Duration::from_secs(2));
        assert_eq!(profile.delay_for(2), Duration::from_secs(4));
        assert_eq!(profile.delay_for(3), Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_success_returns_immediately() {
        let executor = executor(2, 3);
        let mut calls = 0;

        let value = executor
            .chain_read("decimals", |_| {
                calls += 1;
                async { Ok(9u8) }
            })
            .await
            .unwrap();

        assert_eq!(value, 9);
        assert_eq!(calls, 1);
        assert_eq!(executor.pool().active_index(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_advances_endpoint() {
        let executor = executor(4, 3);
        let seen = Mutex::new(Vec::new());

        let result: Result<()> = executor
            .chain_read("vault balance", |endpoint| {
                seen.lock().unwrap().push(endpoint.url);
                async { Err(rate_limited()) }
            })
            .await;

        assert!(matches!(
            result,
            Err(ReconcileError::RetryExhausted { attempts: 3, .. })
        ));
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["http://rpc-0", "http://rpc-1", "http://rpc-2"]
        );
        // No failover after the final attempt.
        assert_eq!(executor.pool().active_index(), 2);
    }

    #[tokio::test]
    async fn test_failover_wraps_to_first_endpoint() {
        let executor = executor(2, 3);

        let _: Result<()> = executor
            .chain_read("pool state", |_| async { Err(rate_limited()) })
            .await;

        // 0 -> 1 -> 0
        assert_eq!(executor.pool().active_index(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_retries_same_endpoint() {
        let executor = executor(3, 3);
        let mut calls = 0;

        let value = executor
            .chain_read("vault balance", |endpoint| {
                calls += 1;
                let attempt = calls;
                async move {
                    assert_eq!(endpoint.url, "http://rpc-0");
                    if attempt < 3 {
                        Err(ReconcileError::AccountNotFound("vault".to_string()))
                    } else {
                        Ok(42u64)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let executor = executor(2, 3);
        let mut calls = 0;

        let result: Result<()> = executor
            .discovery("pool discovery", |_| {
                calls += 1;
                async {
                    Err(ReconcileError::PoolNotFound {
                        asset: "WIF".to_string(),
                        reference: "USDC".to_string(),
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(ReconcileError::PoolNotFound { .. })));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_discovery_rate_limit_keeps_rpc_endpoint() {
        let executor = executor(3, 2);

        let result: Result<()> = executor
            .discovery("pool discovery", |_| async {
                Err(ReconcileError::http_status(429, "pair listing"))
            })
            .await;

        assert!(matches!(
            result,
            Err(ReconcileError::RetryExhausted { attempts: 2, .. })
        ));
        assert_eq!(executor.pool().active_index(), 0);
    }
}
