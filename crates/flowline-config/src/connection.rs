use serde::{Deserialize, Serialize};

/// A directed precedence link: `target` executes after `source`.
///
/// Connections have no identity beyond the pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
  pub source: String,
  pub target: String,
}

impl Connection {
  pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
    Self {
      source: source.into(),
      target: target.into(),
    }
  }
}
