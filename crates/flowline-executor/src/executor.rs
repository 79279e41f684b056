use async_trait::async_trait;
use flowline_step::Step;

use crate::context::ExecutionContext;
use crate::error::NodeError;

/// Everything an executor receives for one node invocation.
pub struct ExecutorParams<'a> {
  pub node_id: &'a str,
  /// The node's configuration payload.
  pub data: &'a serde_json::Value,
  /// Context produced by the nodes that ran before this one.
  pub context: ExecutionContext,
  pub step: &'a dyn Step,
}

/// Handler for one node type.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
  /// Run the node and return the extended context.
  async fn execute(&self, params: ExecutorParams<'_>) -> Result<ExecutionContext, NodeError>;
}
