use crate::{
    error::{ReconcileError, Result},
    types::Endpoint,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Ordered list of equivalent RPC endpoints with one active at a time.
///
/// The active index is a single atomic counter shared by every retry
/// sequence, so concurrent failovers never skip an endpoint.
pub struct EndpointPool {
    endpoints: Vec<Endpoint>,
    active: AtomicUsize,
}

impl EndpointPool {
    pub fn new(endpoints: Vec<Endpoint>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(ReconcileError::NoEndpoints);
        }

        info!("Connected to RPC: {}", endpoints[0].url);

        Ok(Self {
            endpoints,
            active: AtomicUsize::new(0),
        })
    }

    pub fn active_index(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Active endpoint and its index, read in one load
    pub fn current(&self) -> (usize, &Endpoint) {
        let index = self.active_index();
        (index, &self.endpoints[index])
    }

    /// Move past `observed`, wrapping after the last endpoint.
    ///
    /// Only advances if `observed` is still active. Callers that saw the
    /// same failing endpoint race here; the first one moves the pool and
    /// the rest adopt its choice.
    pub fn advance(&self, observed: usize) -> usize {
        let len = self.endpoints.len();
        let next = (observed + 1) % len;

        match self
            .active
            .compare_exchange(observed, next, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                info!("Switched to RPC: {}", self.endpoints[next].url);
                next
            }
            Err(current) => {
                debug!("RPC already switched to {}", self.endpoints[current].url);
                current
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::commitment_config::CommitmentConfig;

    fn pool(n: usize) -> EndpointPool {
        let endpoints = (0..n)
            .map(|i| Endpoint::new(format!("http://rpc-{}", i), CommitmentConfig::confirmed()))
            .collect();
        EndpointPool::new(endpoints).unwrap()
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        assert!(matches!(
            EndpointPool::new(Vec::new()),
            Err(ReconcileError::NoEndpoints)
        ));
    }

    #[test]
    fn test_failover_cycles_and_wraps() {
        let pool = pool(3);
        assert_eq!(pool.active_index(), 0);

        assert_eq!(pool.advance(pool.active_index()), 1);
        assert_eq!(pool.advance(pool.active_index()), 2);
        assert_eq!(pool.advance(pool.active_index()), 0);
        assert_eq!(pool.current().1.url, "http://rpc-0");
    }

    #[test]
    fn test_single_endpoint_stays_put() {
        let pool = pool(1);
        assert_eq!(pool.advance(0), 0);
        assert_eq!(pool.active_index(), 0);
    }

    #[test]
    fn test_stale_failover_does_not_skip() {
        let pool = pool(4);

        // Two callers both saw endpoint 0 fail.
        assert_eq!(pool.advance(0), 1);
        assert_eq!(pool.advance(0), 1);
        assert_eq!(pool.active_index(), 1);
    }
}
