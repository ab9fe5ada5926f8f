use model::execution::status::ErrorKind;
use std::time::Duration;

/// Indicates whether a failure should be retried or treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// Governs re-launching a failed job from its last committed position.
///
/// The chunk engine itself never retries; this policy is applied by callers
/// around a whole launch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub retryable: Vec<ErrorKind>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            retryable: vec![ErrorKind::Write, ErrorKind::Timeout],
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: if max_delay.is_zero() {
                base_delay
            } else {
                max_delay
            },
            ..Self::default()
        }
    }

    /// A single attempt, never retried.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_retryable(mut self, kinds: Vec<ErrorKind>) -> Self {
        self.retryable = kinds;
        self
    }

    pub fn classify(&self, kind: ErrorKind) -> RetryDisposition {
        if self.retryable.contains(&kind) {
            RetryDisposition::Retry
        } else {
            RetryDisposition::Stop
        }
    }

    /// Whether another launch is allowed after `attempt` failed launches.
    pub fn should_retry(&self, kind: ErrorKind, attempt: usize) -> bool {
        attempt < self.max_attempts && self.classify(kind) == RetryDisposition::Retry
    }

    /// Exponential backoff capped at `max_delay`; `attempt` is zero based.
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let factor = 1u128 << attempt.min(6);
        let delay_ms = self.base_delay.as_millis().saturating_mul(factor);
        let capped = delay_ms.min(self.max_delay.as_millis());
        Duration::from_millis(capped as u64)
    }
}
