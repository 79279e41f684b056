use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StepError;

/// Future returned by one attempt of step work.
pub type StepFuture = BoxFuture<'static, Result<serde_json::Value, StepError>>;

/// Step work: invoked once per attempt, each call starting a fresh attempt.
pub type StepWork<'a> = dyn FnMut() -> StepFuture + Send + 'a;

/// Capability for running named, durable units of work.
///
/// Within one run, a name that already completed returns its recorded output
/// without invoking the work again.
#[async_trait]
pub trait Step: Send + Sync {
  /// Run `work` as the step called `name` and return its output.
  async fn run_value(
    &self,
    name: &str,
    work: &mut StepWork<'_>,
  ) -> Result<serde_json::Value, StepError>;

  /// Durable sleep. A sleep that already completed is not repeated.
  async fn sleep(&self, name: &str, duration: Duration) -> Result<(), StepError>;
}

impl<'s> dyn Step + 's {
  /// Run typed work as the step called `name`.
  ///
  /// The output is recorded as JSON, so replaying a completed step yields the
  /// same value the first attempt produced.
  pub async fn run<T, F, Fut>(&self, name: &str, mut work: F) -> Result<T, StepError>
  where
    T: Serialize + DeserializeOwned,
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<T, StepError>> + Send + 'static,
  {
    let mut erased = move || -> StepFuture {
      let attempt = work();
      Box::pin(async move {
        let output = attempt.await?;
        let value = serde_json::to_value(output)?;
        Ok::<_, StepError>(value)
      })
    };

    let value = self.run_value(name, &mut erased).await?;
    serde_json::from_value(value).map_err(|e| StepError::Decode {
      name: name.to_string(),
      message: e.to_string(),
    })
  }
}

/// A step runner that prefixes every step name with a scope.
///
/// Used to keep the step names of different nodes apart within one run.
pub struct ScopedStep<'a> {
  inner: &'a dyn Step,
  scope: String,
}

impl<'a> ScopedStep<'a> {
  pub fn new(inner: &'a dyn Step, scope: impl Into<String>) -> Self {
    Self {
      inner,
      scope: scope.into(),
    }
  }

  fn scoped(&self, name: &str) -> String {
    format!("{}/{}", self.scope, name)
  }
}

#[async_trait]
impl Step for ScopedStep<'_> {
  async fn run_value(
    &self,
    name: &str,
    work: &mut StepWork<'_>,
  ) -> Result<serde_json::Value, StepError> {
    self.inner.run_value(&self.scoped(name), work).await
  }

  async fn sleep(&self, name: &str, duration: Duration) -> Result<(), StepError> {
    self.inner.sleep(&self.scoped(name), duration).await
  }
}
