use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{BoxFuture, FutureExt, Shared};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RefreshError {
    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Refresh rejected with status {status}")]
    Rejected { status: u16 },

    #[error("Refresh request failed: {0}")]
    Transport(String),

    #[error("Invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("Session ended while the refresh was running")]
    SessionEnded,
}

/// New access token on success
pub type RefreshOutcome = Result<String, RefreshError>;

type InFlight = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Single-flight gate around the refresh call.
///
/// While a refresh is running, every other caller awaits the same future
/// instead of starting its own, so a burst of requests that all find the
/// token expired produces exactly one call to the refresh endpoint.
#[derive(Default)]
pub struct RefreshCoordinator {
    in_flight: Mutex<Option<InFlight>>,
    started: AtomicU64,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of refresh calls actually started
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Join the running refresh, or start one with `start`
    pub async fn run<F, Fut>(&self, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let flight = {
            let mut slot = self.in_flight.lock().await;
            match slot.as_ref() {
                Some(flight) if flight.peek().is_none() => {
                    debug!("Joining refresh already in flight");
                    flight.clone()
                }
                _ => {
                    self.started.fetch_add(1, Ordering::SeqCst);
                    let flight = start().boxed().shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };

        let outcome = flight.clone().await;

        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().map(|f| f.peek().is_some()).unwrap_or(false) {
            *slot = None;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let coordinator = Arc::new(RefreshCoordinator::new());
        let calls = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coordinator = coordinator.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .run(move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok("fresh".to_string())
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.expect("join"), Ok("fresh".to_string()));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.started(), 1);
    }

    #[tokio::test]
    async fn test_sequential_refreshes_each_run() {
        let coordinator = RefreshCoordinator::new();
        let first = coordinator.run(|| async { Ok("one".to_string()) }).await;
        let second = coordinator.run(|| async { Ok("two".to_string()) }).await;
        assert_eq!(first, Ok("one".to_string()));
        assert_eq!(second, Ok("two".to_string()));
        assert_eq!(coordinator.started(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_shared_and_not_sticky() {
        let coordinator = RefreshCoordinator::new();
        let failed = coordinator
            .run(|| async { Err(RefreshError::Rejected { status: 401 }) })
            .await;
        assert_eq!(failed, Err(RefreshError::Rejected { status: 401 }));

        let recovered = coordinator.run(|| async { Ok("later".to_string()) }).await;
        assert_eq!(recovered, Ok("later".to_string()));
    }
}
