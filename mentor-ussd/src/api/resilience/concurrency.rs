//! Concurrency limiter implementation
//!
//! Semaphore-based limiter bounding how many detached side-effect calls
//! (profile persistence, SMS) are in flight, so a burst of registrations
//! cannot exhaust sockets or worker threads.

use super::config::ConcurrencyConfig;
use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Permits handed out when limiting is disabled (Tokio Semaphore max is 2^61-1)
const UNLIMITED_PERMITS: usize = 1_000_000;

/// Semaphore-based concurrency limiter for side-effect calls
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    config: ConcurrencyConfig,
    calls_acquired: Arc<AtomicU64>,
    calls_waited: Arc<AtomicU64>,
}

impl ConcurrencyLimiter {
    pub fn new(config: ConcurrencyConfig) -> Self {
        let permits = if config.enabled {
            config.max_concurrent_requests.max(1)
        } else {
            UNLIMITED_PERMITS
        };

        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            config,
            calls_acquired: Arc::new(AtomicU64::new(0)),
            calls_waited: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Wait for a permit. Returns None only if the semaphore was closed.
    /// The permit is released when dropped.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        if self.config.enabled && self.semaphore.available_permits() == 0 {
            self.calls_waited.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Side-effect limiter: waiting for permit ({} in flight)",
                self.config.max_concurrent_requests
            );
        }

        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        self.calls_acquired.fetch_add(1, Ordering::Relaxed);
        Some(permit)
    }

    #[cfg(test)]
    pub fn available_permits(&self) -> usize {
        if !self.config.enabled {
            return usize::MAX;
        }
        self.semaphore.available_permits()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn stats(&self) -> ConcurrencyStats {
        ConcurrencyStats {
            max_concurrent_requests: self.config.max_concurrent_requests,
            calls_acquired: self.calls_acquired.load(Ordering::Relaxed),
            calls_waited: self.calls_waited.load(Ordering::Relaxed),
        }
    }
}

/// Counters since the limiter was created; clones share them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyStats {
    pub max_concurrent_requests: usize,
    /// Total permits handed out
    pub calls_acquired: u64,
    /// Number of times a call had to wait for a permit
    pub calls_waited: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{Duration, timeout};

    fn limiter(max: usize, enabled: bool) -> ConcurrencyLimiter {
        ConcurrencyLimiter::new(ConcurrencyConfig {
            max_concurrent_requests: max,
            enabled,
        })
    }

    #[tokio::test]
    async fn test_disabled_limiter_is_unbounded() {
        let limiter = limiter(2, false);
        let mut permits = Vec::new();
        for _ in 0..50 {
            permits.push(limiter.acquire().await.unwrap());
        }
        assert_eq!(permits.len(), 50);
        assert_eq!(limiter.available_permits(), usize::MAX);
        assert_eq!(limiter.stats().calls_waited, 0);
    }

    #[tokio::test]
    async fn test_max_permits_and_release() {
        let limiter = limiter(2, true);
        let p1 = limiter.acquire().await.unwrap();
        let _p2 = limiter.acquire().await.unwrap();
        assert_eq!(limiter.available_permits(), 0);
        assert!(timeout(Duration::from_millis(20), limiter.acquire()).await.is_err());

        drop(p1);
        assert_eq!(limiter.available_permits(), 1);
        assert!(limiter.acquire().await.is_some());
    }

    #[tokio::test]
    async fn test_acquire_waits_for_release() {
        let limiter = limiter(1, true);
        let waiter = limiter.clone();

        let permit = limiter.acquire().await.unwrap();
        let handle = tokio::spawn(async move { waiter.acquire().await.is_some() });

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(permit);

        let result = timeout(Duration::from_millis(200), handle).await;
        assert!(result.unwrap().unwrap());
        assert_eq!(
            limiter.stats(),
            ConcurrencyStats {
                max_concurrent_requests: 1,
                calls_acquired: 2,
                calls_waited: 1,
            }
        );
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let limiter = limiter(0, true);
        assert_eq!(limiter.available_permits(), 1);
    }
}
