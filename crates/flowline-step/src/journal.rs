use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outputs of the steps that completed during a run, keyed by step name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepJournal {
  completed: BTreeMap<String, serde_json::Value>,
}

impl StepJournal {
  pub fn new() -> Self {
    Self::default()
  }

  /// Recorded output of a completed step.
  pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
    self.completed.get(name)
  }

  pub fn contains(&self, name: &str) -> bool {
    self.completed.contains_key(name)
  }

  /// Record the output of a completed step.
  pub fn record(&mut self, name: impl Into<String>, output: serde_json::Value) {
    self.completed.insert(name.into(), output);
  }

  /// Names of the completed steps, sorted.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.completed.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.completed.len()
  }

  pub fn is_empty(&self) -> bool {
    self.completed.is_empty()
  }
}
