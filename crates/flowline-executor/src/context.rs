use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Key-value state accumulated across one workflow run.
///
/// Seeded from the trigger payload; each node adds the keys it produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionContext(Map<String, Value>);

impl ExecutionContext {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seed a context from a trigger payload.
  ///
  /// Object payloads become the context itself, `null` gives an empty context
  /// and any other value is stored under `payload`.
  pub fn from_payload(payload: Value) -> Self {
    match payload {
      Value::Object(map) => Self(map),
      Value::Null => Self::default(),
      other => {
        let mut map = Map::new();
        map.insert("payload".to_string(), other);
        Self(map)
      }
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.0.get(key)
  }

  /// Look up a dotted path such as `fetch.httpResponse.data.items.0`.
  ///
  /// Numeric segments index into arrays.
  pub fn lookup(&self, path: &str) -> Option<&Value> {
    let mut segments = path.split('.');
    let mut current = self.0.get(segments.next()?)?;
    for segment in segments {
      current = match current {
        Value::Object(map) => map.get(segment)?,
        Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
        _ => return None,
      };
    }
    Some(current)
  }

  /// Add a key, returning the value it replaced.
  pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
    let key = key.into();
    let previous = self.0.insert(key.clone(), value);
    if previous.is_some() {
      warn!(key = %key, "overwriting existing context key");
    }
    previous
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn to_value(&self) -> Value {
    Value::Object(self.0.clone())
  }

  pub fn into_value(self) -> Value {
    Value::Object(self.0)
  }
}

impl From<Map<String, Value>> for ExecutionContext {
  fn from(map: Map<String, Value>) -> Self {
    Self(map)
  }
}
