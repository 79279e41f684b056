use flowline_config::NodeType;
use flowline_step::StepError;
use thiserror::Error;

/// Errors that can occur while executing a node.
#[derive(Debug, Error)]
pub enum NodeError {
  /// The node's configuration is unusable. Never retried.
  #[error("{message}")]
  Configuration { node_type: NodeType, message: String },

  /// A step inside the executor failed.
  #[error(transparent)]
  Step(#[from] StepError),

  /// No executor is registered for the node's type.
  #[error("no executor registered for node type {0}")]
  UnregisteredType(NodeType),
}

impl NodeError {
  pub fn configuration(node_type: NodeType, message: impl Into<String>) -> Self {
    Self::Configuration {
      node_type,
      message: message.into(),
    }
  }

  /// Whether running the node again could succeed.
  pub fn is_retriable(&self) -> bool {
    match self {
      Self::Step(e) => e.is_retriable(),
      Self::Configuration { .. } | Self::UnregisteredType(_) => false,
    }
  }
}
