use flowline_executor::NodeError;
use flowline_workflow::SequenceError;
use thiserror::Error;

/// Errors that end a workflow execution.
#[derive(Debug, Error)]
pub enum EngineError {
  /// The graph cannot be ordered. Raised before any node runs.
  #[error("invalid workflow graph")]
  Sequence(#[from] SequenceError),

  /// A node failed; nodes after it did not run.
  #[error("node '{node_id}' failed")]
  Node {
    node_id: String,
    #[source]
    source: NodeError,
  },

  /// The HTTP client could not be built.
  #[error("failed to build http client")]
  HttpClient(#[from] reqwest::Error),

  /// The runner's trigger channel is closed.
  #[error("workflow runner channel closed")]
  ChannelClosed,
}

impl EngineError {
  /// The node the error originated from, if any.
  pub fn node_id(&self) -> Option<&str> {
    match self {
      Self::Node { node_id, .. } => Some(node_id),
      _ => None,
    }
  }
}
