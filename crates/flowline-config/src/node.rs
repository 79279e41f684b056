use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of node kinds a workflow can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
  /// Placeholder node of a fresh workflow. Replaced by the first real node.
  Initial,
  /// Starts the workflow when a user runs it by hand.
  ManualTrigger,
  /// Issues an outbound HTTP request and stores the response in the context.
  HttpRequest,
}

impl NodeType {
  /// Every node type, in declaration order.
  pub const ALL: [NodeType; 3] = [
    NodeType::Initial,
    NodeType::ManualTrigger,
    NodeType::HttpRequest,
  ];

  /// The wire tag used in workflow files.
  pub fn as_str(&self) -> &'static str {
    match self {
      NodeType::Initial => "INITIAL",
      NodeType::ManualTrigger => "MANUAL_TRIGGER",
      NodeType::HttpRequest => "HTTP_REQUEST",
    }
  }
}

impl fmt::Display for NodeType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A node as stored in a workflow definition.
///
/// `data` is the type-specific configuration payload. It stays untyped at the
/// graph level; each executor refines it into its own shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub id: String,
  #[serde(rename = "type")]
  pub node_type: NodeType,
  #[serde(default = "empty_data")]
  pub data: serde_json::Value,
}

impl NodeDef {
  pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
    Self {
      id: id.into(),
      node_type,
      data: empty_data(),
    }
  }

  /// Replace the node's configuration payload.
  pub fn with_data(mut self, data: serde_json::Value) -> Self {
    self.data = data;
    self
  }
}

fn empty_data() -> serde_json::Value {
  serde_json::Value::Object(serde_json::Map::new())
}
