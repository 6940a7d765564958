//! Polling monitor for a single in-flight transfer.

use crate::transfer::progress::{format_bytes, format_duration, format_speed, ProgressTracker};
use crate::utils::{Result, YabackupError};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Poll period and overall deadline for a monitored transfer
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub interval: Duration,
    pub timeout: Option<Duration>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            timeout: Some(Duration::from_secs(600)),
        }
    }
}

impl MonitorOptions {
    /// Progress polling only, no deadline
    pub fn without_timeout() -> Self {
        Self {
            timeout: None,
            ..Self::default()
        }
    }
}

/// Drive `task` to completion while sampling `counter` every interval.
///
/// `on_progress` receives the completed percentage (0-100) after each sample.
/// The task is dropped when the deadline passes or `cancel` fires.
pub async fn run_monitored<F, T, P>(
    task: F,
    counter: Arc<AtomicU64>,
    total_bytes: u64,
    options: &MonitorOptions,
    cancel: &CancellationToken,
    mut on_progress: P,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
    P: FnMut(u8),
{
    let deadline = options.timeout.map(|t| Instant::now() + t);
    let mut ticker = tokio::time::interval(options.interval);
    let mut tracker = ProgressTracker::new(total_bytes);
    tokio::pin!(task);

    loop {
        let expired = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = &mut task => return result,
            _ = ticker.tick() => {
                let progress = tracker.update(counter.load(Ordering::Relaxed));
                debug!(
                    "Transferred {} of {} ({:.0}%, {}, {} left)",
                    format_bytes(progress.transferred_bytes),
                    format_bytes(progress.total_bytes),
                    progress.percent_complete,
                    format_speed(progress.bytes_per_second),
                    format_duration(progress.eta_seconds)
                );
                on_progress(progress.percent_complete as u8);
            }
            _ = cancel.cancelled() => return Err(YabackupError::Cancelled),
            _ = expired => {
                let secs = options.timeout.map(|t| t.as_secs()).unwrap_or_default();
                return Err(YabackupError::Timeout(secs));
            }
        }
    }
}
