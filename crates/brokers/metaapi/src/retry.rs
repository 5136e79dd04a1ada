use std::time::Duration;

/// Bounded retry for upstream calls answered with HTTP 202.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait used when the response carries no usable hint.
    pub default_wait: Duration,
    /// Upper bound on any single wait.
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            default_wait: Duration::from_secs(5),
            max_wait: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// How long to wait before the next attempt, given a `Retry-After` value in seconds.
    pub fn wait_for(&self, hint: Option<&str>) -> Duration {
        let cap = self.max_wait.as_secs_f64();
        let wait = hint
            .and_then(|h| h.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| Duration::from_secs_f64(secs.min(cap)))
            .unwrap_or(self.default_wait);
        wait.min(self.max_wait)
    }
}
