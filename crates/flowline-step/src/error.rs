use thiserror::Error;

/// Errors produced by step work or by the step runner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
  /// The work failed; the runner may invoke it again.
  #[error("{message}")]
  Failed { message: String },

  /// The work failed in a way another attempt cannot fix.
  #[error("{message}")]
  NonRetriable { message: String },

  /// Every attempt allowed by the retry policy failed.
  #[error("step '{name}' failed after {attempts} attempts: {message}")]
  Exhausted {
    name: String,
    attempts: u32,
    message: String,
  },

  /// The recorded output does not match the type the caller asked for.
  #[error("step '{name}' output could not be decoded: {message}")]
  Decode { name: String, message: String },
}

impl StepError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }

  pub fn non_retriable(message: impl Into<String>) -> Self {
    Self::NonRetriable {
      message: message.into(),
    }
  }

  /// Whether the runner should try the work again.
  pub fn is_retriable(&self) -> bool {
    matches!(self, Self::Failed { .. })
  }
}

impl From<serde_json::Error> for StepError {
  fn from(e: serde_json::Error) -> Self {
    Self::failed(format!("invalid JSON: {}", e))
  }
}
