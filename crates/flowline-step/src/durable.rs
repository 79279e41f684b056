use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::StepError;
use crate::journal::StepJournal;
use crate::policy::RetryPolicy;
use crate::step::{Step, StepWork};

/// In-process durable step runner.
///
/// Completed steps are recorded in a [`StepJournal`]. Starting from an
/// existing journal replays the recorded outputs, which is how a failed run is
/// resumed.
pub struct DurableStep {
  policy: RetryPolicy,
  journal: Mutex<StepJournal>,
}

impl DurableStep {
  pub fn new(policy: RetryPolicy) -> Self {
    Self::with_journal(policy, StepJournal::default())
  }

  /// Resume from the journal of an earlier run.
  pub fn with_journal(policy: RetryPolicy, journal: StepJournal) -> Self {
    Self {
      policy,
      journal: Mutex::new(journal),
    }
  }

  pub fn policy(&self) -> &RetryPolicy {
    &self.policy
  }

  /// Snapshot of the steps completed so far.
  pub fn journal(&self) -> StepJournal {
    self.journal.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }

  pub fn into_journal(self) -> StepJournal {
    self.journal.into_inner().unwrap_or_else(|e| e.into_inner())
  }

  fn recorded(&self, name: &str) -> Option<serde_json::Value> {
    let journal = self.journal.lock().unwrap_or_else(|e| e.into_inner());
    journal.get(name).cloned()
  }

  fn record(&self, name: &str, output: serde_json::Value) {
    let mut journal = self.journal.lock().unwrap_or_else(|e| e.into_inner());
    journal.record(name, output);
  }
}

#[async_trait]
impl Step for DurableStep {
  async fn run_value(
    &self,
    name: &str,
    work: &mut StepWork<'_>,
  ) -> Result<serde_json::Value, StepError> {
    if let Some(output) = self.recorded(name) {
      debug!(step = %name, "replaying recorded step output");
      return Ok(output);
    }

    let max_attempts = self.policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
      match work().await {
        Ok(output) => {
          self.record(name, output.clone());
          debug!(step = %name, attempt, "step completed");
          return Ok(output);
        }
        Err(e) if !e.is_retriable() => {
          warn!(step = %name, attempt, error = %e, "step failed, not retrying");
          return Err(e);
        }
        Err(e) if attempt >= max_attempts => {
          warn!(step = %name, attempt, error = %e, "step failed, attempts exhausted");
          return Err(StepError::Exhausted {
            name: name.to_string(),
            attempts: attempt,
            message: e.to_string(),
          });
        }
        Err(e) => {
          let delay = self.policy.delay_for(attempt);
          warn!(
            step = %name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "step failed, retrying"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
      }
    }
  }

  async fn sleep(&self, name: &str, duration: Duration) -> Result<(), StepError> {
    if self.recorded(name).is_some() {
      debug!(step = %name, "sleep already completed");
      return Ok(());
    }
    tokio::time::sleep(duration).await;
    self.record(name, serde_json::Value::Null);
    Ok(())
  }
}
