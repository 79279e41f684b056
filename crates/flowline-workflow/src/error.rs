use thiserror::Error;

/// Errors raised while editing or loading a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("node not found: {0}")]
  NodeNotFound(String),

  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  #[error("Manual trigger node already exists")]
  ManualTriggerExists,

  #[error("workflow has more than one initial node")]
  MultipleInitialNodes,

  #[error("connection references unknown node: source={source_id}, target={target_id}")]
  InvalidConnection {
    source_id: String,
    target_id: String,
  },
}

/// Errors raised while computing the execution order.
///
/// A cycle is always its own variant, distinct from every other fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequenceError {
  /// The connections form a cycle. `path` lists the nodes along it in
  /// execution direction, starting and ending with the same node.
  #[error("workflow contains a cycle: {}", .path.join(" -> "))]
  Cycle { path: Vec<String> },

  /// A connection names a node that is not in the node list.
  #[error("connection references unknown node: {node_id}")]
  UnknownNode { node_id: String },

  /// Two nodes share an identifier.
  #[error("duplicate node id: {node_id}")]
  DuplicateNode { node_id: String },
}
