//! Fixed-interval retry with a hard deadline.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub deadline: Duration,
}

impl RetryPolicy {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    /// Policy used to restore the sensor entity after the first boot
    pub fn first_boot() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(1800))
    }

    /// Call `attempt` until it reports success, the deadline passes or
    /// `cancel` fires. Returns whether an attempt succeeded.
    pub async fn run<F, Fut>(&self, cancel: CancellationToken, mut attempt: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let deadline = Instant::now() + self.deadline;
        let mut tries = 0u32;

        loop {
            tries += 1;
            if attempt().await {
                debug!(tries, "Retry predicate satisfied");
                return true;
            }

            let next = Instant::now() + self.interval;
            if next > deadline {
                warn!(tries, "Retry deadline exceeded");
                return false;
            }

            tokio::select! {
                _ = tokio::time::sleep_until(next) => {}
                _ = cancel.cancelled() => {
                    debug!(tries, "Retry cancelled");
                    return false;
                }
            }
        }
    }

    /// Run the policy on its own task
    pub fn spawn<F, Fut>(self, cancel: CancellationToken, attempt: F) -> JoinHandle<bool>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send,
    {
        tokio::spawn(async move { self.run(cancel, attempt).await })
    }
}
