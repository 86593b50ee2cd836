//! Cancellable recurring tasks and the policy deciding when the next run happens.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

/// Floor for the delay between runs, whatever the interval or policy says.
const MIN_DELAY: Duration = Duration::from_secs(1);

/// Decides how long to wait before the next run of a recurring task.
///
/// The poller never retries inside a run; a failed run is retried by the next
/// one, so this is the single place where a retry strategy lives.
pub trait RetryPolicy: Send + Sync {
    fn next_delay(&self, interval: Duration, consecutive_failures: u32) -> Duration;
}

/// Always wait one full interval, failed or not.
#[derive(Debug, Default, Clone, Copy)]
pub struct NextTick;

impl RetryPolicy for NextTick {
    fn next_delay(&self, interval: Duration, _consecutive_failures: u32) -> Duration {
        interval
    }
}

/// Retry sooner after a failure, doubling the delay per consecutive failure
/// and never exceeding the regular interval or `max`.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(2),
            max: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn next_delay(&self, interval: Duration, consecutive_failures: u32) -> Duration {
        if consecutive_failures == 0 {
            return interval;
        }
        let factor = 1u32 << (consecutive_failures - 1).min(16);
        self.initial
            .saturating_mul(factor)
            .min(self.max)
            .min(interval)
    }
}

/// Handle to a running recurring task. Cancelling (or dropping) the handle
/// guarantees no further run starts; a run already in progress finishes.
#[derive(Debug)]
pub struct IntervalHandle {
    shutdown: watch::Sender<bool>,
}

impl IntervalHandle {
    pub fn cancel(&self) {
        self.shutdown.send_replace(true);
    }
}

impl Drop for IntervalHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Runs `run` immediately and then again after every delay chosen by `policy`.
/// `run` resolves to `true` on success; failures feed the policy.
pub fn spawn_interval<F, Fut>(
    interval: Duration,
    policy: Arc<dyn RetryPolicy>,
    mut run: F,
) -> IntervalHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let (shutdown, mut rx) = watch::channel(false);

    tokio::spawn(async move {
        let mut failures = 0u32;

        loop {
            if *rx.borrow() {
                break;
            }

            if run().await {
                failures = 0;
            } else {
                failures = failures.saturating_add(1);
            }

            let delay = policy.next_delay(interval, failures).max(MIN_DELAY);
            debug!("Next run in {}s", delay.as_secs());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!("Recurring task stopped");
    });

    IntervalHandle { shutdown }
}
