use brokerlink_core::Sleeper;
use std::future::Future;
use std::time::Duration;

/// Fixed-interval polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollPolicy {
    /// Deployment wait after account creation: every 2 s, 30 times.
    pub const DEPLOYMENT: PollPolicy = PollPolicy {
        interval: Duration::from_secs(2),
        max_attempts: 30,
    };

    /// Re-checks of an existing account whose lookup failed transiently.
    pub const VERIFY_EXISTING: PollPolicy = PollPolicy {
        interval: Duration::from_secs(2),
        max_attempts: 3,
    };

    /// Upper bound on the time spent sleeping under this policy.
    pub fn max_total_wait(&self) -> Duration {
        self.interval * self.max_attempts
    }
}

/// Sleep one interval, then run `check`, until it returns `true` or the budget
/// is spent. Returns the 1-based attempt that succeeded.
pub async fn poll_until<F, Fut>(policy: PollPolicy, sleeper: &dyn Sleeper, mut check: F) -> Option<u32>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = bool>,
{
    for attempt in 1..=policy.max_attempts {
        sleeper.sleep(policy.interval).await;
        if check(attempt).await {
            return Some(attempt);
        }
    }
    None
}
