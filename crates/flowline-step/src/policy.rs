use std::time::Duration;

use flowline_config::RetryBackoff;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// How often and how patiently a failed step is re-invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Attempts per step, including the first one. Never below 1.
  pub max_attempts: u32,
  pub backoff: RetryBackoff,
  /// Delay after the first failed attempt.
  pub initial_delay: Duration,
  /// Upper bound for any single delay.
  pub max_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: DEFAULT_MAX_ATTEMPTS,
      backoff: RetryBackoff::Exponential,
      initial_delay: DEFAULT_INITIAL_DELAY,
      max_delay: DEFAULT_MAX_DELAY,
    }
  }
}

impl RetryPolicy {
  /// Replace the settings that are present, keeping the rest.
  pub fn with_overrides(
    self,
    max_attempts: Option<u32>,
    backoff: Option<RetryBackoff>,
    initial_delay_ms: Option<u64>,
  ) -> Self {
    Self {
      max_attempts: max_attempts.unwrap_or(self.max_attempts).max(1),
      backoff: backoff.unwrap_or(self.backoff),
      initial_delay: initial_delay_ms
        .map(Duration::from_millis)
        .unwrap_or(self.initial_delay),
      max_delay: self.max_delay,
    }
  }

  /// A policy that never retries.
  pub fn no_retry() -> Self {
    Self {
      max_attempts: 1,
      ..Self::default()
    }
  }

  /// Delay to wait after the given failed attempt (1-based).
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let attempt = attempt.max(1);
    let delay = match self.backoff {
      RetryBackoff::Constant => self.initial_delay,
      RetryBackoff::Linear => self.initial_delay.saturating_mul(attempt),
      RetryBackoff::Exponential => {
        let factor = 2u32.saturating_pow(attempt - 1);
        self.initial_delay.saturating_mul(factor)
      }
    };
    delay.min(self.max_delay)
  }
}
