use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::executor::{ExecutorParams, NodeExecutor};

/// Executor for trigger nodes. Passes the context through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct TriggerExecutor {
  step_name: &'static str,
}

impl TriggerExecutor {
  pub fn manual() -> Self {
    Self {
      step_name: "manual-trigger",
    }
  }

  pub fn initial() -> Self {
    Self {
      step_name: "initial",
    }
  }
}

#[async_trait]
impl NodeExecutor for TriggerExecutor {
  async fn execute(&self, params: ExecutorParams<'_>) -> Result<ExecutionContext, NodeError> {
    let context = params.context;
    let result = params
      .step
      .run(self.step_name, move || {
        let context = context.clone();
        async move { Ok(context) }
      })
      .await?;
    Ok(result)
  }
}
