use std::collections::HashMap;
use std::sync::Arc;

use flowline_config::NodeType;

use crate::error::NodeError;
use crate::executor::NodeExecutor;
use crate::http::HttpRequestExecutor;
use crate::trigger::TriggerExecutor;

/// Maps each node type to its executor.
#[derive(Clone, Default)]
pub struct ExecutorRegistry {
  executors: HashMap<NodeType, Arc<dyn NodeExecutor>>,
}

impl ExecutorRegistry {
  /// A registry with no executors.
  pub fn new() -> Self {
    Self::default()
  }

  /// A registry with the built-in executor for every node type.
  pub fn standard(http: HttpRequestExecutor) -> Self {
    let http: Arc<dyn NodeExecutor> = Arc::new(http);
    let mut registry = Self::new();
    for node_type in NodeType::ALL {
      let executor: Arc<dyn NodeExecutor> = match node_type {
        NodeType::Initial => Arc::new(TriggerExecutor::initial()),
        NodeType::ManualTrigger => Arc::new(TriggerExecutor::manual()),
        NodeType::HttpRequest => http.clone(),
      };
      registry.register(node_type, executor);
    }
    registry
  }

  /// Register or replace the executor for a node type.
  pub fn register(&mut self, node_type: NodeType, executor: Arc<dyn NodeExecutor>) {
    self.executors.insert(node_type, executor);
  }

  pub fn get(&self, node_type: NodeType) -> Result<Arc<dyn NodeExecutor>, NodeError> {
    self
      .executors
      .get(&node_type)
      .cloned()
      .ok_or(NodeError::UnregisteredType(node_type))
  }

  pub fn contains(&self, node_type: NodeType) -> bool {
    self.executors.contains_key(&node_type)
  }
}

impl std::fmt::Debug for ExecutorRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let mut types: Vec<&str> = self.executors.keys().map(NodeType::as_str).collect();
    types.sort_unstable();
    f.debug_struct("ExecutorRegistry")
      .field("node_types", &types)
      .finish()
  }
}
