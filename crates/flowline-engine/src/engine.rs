//! Workflow execution engine.
//!
//! The `WorkflowEngine` orders a workflow's nodes and runs them one at a time,
//! threading the execution context from each node to the next.

use std::time::Duration;

use flowline_executor::{
  ExecutionContext, ExecutorParams, ExecutorRegistry, HttpRequestExecutor, NodeError,
};
use flowline_step::{DurableStep, RetryPolicy, ScopedStep, Step, StepJournal};
use flowline_workflow::{NodeDef, Workflow};
use tracing::{error, info, instrument};

use crate::error::EngineError;
use crate::events::{ExecutionEvent, ExecutionNotifier, NoopNotifier};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Result of a successful workflow execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
  pub execution_id: String,
  /// Context returned by the last node.
  pub context: ExecutionContext,
  /// Node ids in the order they ran.
  pub nodes_executed: Vec<String>,
}

/// Configuration for the workflow engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  /// Retry policy for steps, before per-workflow overrides.
  pub retry: RetryPolicy,
  /// Timeout for outbound HTTP requests.
  pub http_timeout: Duration,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      retry: RetryPolicy::default(),
      http_timeout: DEFAULT_HTTP_TIMEOUT,
    }
  }
}

impl EngineConfig {
  /// Apply the workflow's settings on top of this configuration.
  pub fn for_workflow(&self, workflow: &Workflow) -> Self {
    Self {
      retry: self.retry.with_overrides(
        workflow.max_retry_attempts,
        workflow.retry_backoff,
        workflow.retry_initial_delay_ms,
      ),
      http_timeout: workflow
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(self.http_timeout),
    }
  }
}

/// The workflow execution engine.
///
/// Generic over `N: ExecutionNotifier` to allow different notification strategies.
/// Use `WorkflowEngine::new()` for a default engine with no-op notifications,
/// or `WorkflowEngine::with_notifier()` to provide a custom notifier.
pub struct WorkflowEngine<N: ExecutionNotifier = NoopNotifier> {
  registry: ExecutorRegistry,
  config: EngineConfig,
  notifier: N,
}

impl WorkflowEngine<NoopNotifier> {
  /// Create an engine with the standard executors and no-op notifications.
  pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
    Self::with_notifier(config, NoopNotifier)
  }
}

impl<N: ExecutionNotifier> WorkflowEngine<N> {
  /// Create an engine with the standard executors and a custom notifier.
  pub fn with_notifier(config: EngineConfig, notifier: N) -> Result<Self, EngineError> {
    let http = HttpRequestExecutor::with_timeout(config.http_timeout)?;
    Ok(Self::with_registry(
      config,
      ExecutorRegistry::standard(http),
      notifier,
    ))
  }

  /// Create an engine with a caller-supplied executor registry.
  pub fn with_registry(config: EngineConfig, registry: ExecutorRegistry, notifier: N) -> Self {
    Self {
      registry,
      config,
      notifier,
    }
  }

  /// The step retry policy used for a workflow.
  pub fn retry_policy(&self, workflow: &Workflow) -> RetryPolicy {
    self.config.for_workflow(workflow).retry
  }

  /// Execute a workflow with the given trigger payload.
  pub async fn execute(
    &self,
    workflow: &Workflow,
    payload: serde_json::Value,
  ) -> Result<ExecutionResult, EngineError> {
    let step = DurableStep::new(self.retry_policy(workflow));
    self.execute_with_step(workflow, payload, &step).await
  }

  /// Resume a workflow from the journal of an earlier run.
  ///
  /// Steps recorded in `journal` are replayed instead of executed. Returns the
  /// journal as it stands after this run along with the result.
  pub async fn resume(
    &self,
    workflow: &Workflow,
    payload: serde_json::Value,
    journal: StepJournal,
  ) -> (Result<ExecutionResult, EngineError>, StepJournal) {
    let step = DurableStep::with_journal(self.retry_policy(workflow), journal);
    let result = self.execute_with_step(workflow, payload, &step).await;
    (result, step.into_journal())
  }

  /// Execute a workflow using the given step runner.
  ///
  /// The graph is ordered before anything runs; a cycle fails the execution
  /// without running any node. Nodes then run sequentially and the first
  /// failure halts the run.
  #[instrument(
    name = "workflow",
    skip(self, workflow, payload, step),
    fields(workflow_id = %workflow.workflow_id)
  )]
  pub async fn execute_with_step(
    &self,
    workflow: &Workflow,
    payload: serde_json::Value,
    step: &dyn Step,
  ) -> Result<ExecutionResult, EngineError> {
    let order = workflow.execution_order()?;
    let execution_id = uuid::Uuid::new_v4().to_string();

    info!(
      execution_id = %execution_id,
      nodes = order.len(),
      "starting workflow execution"
    );
    self.notifier.notify(ExecutionEvent::WorkflowStarted {
      execution_id: execution_id.clone(),
      workflow_id: workflow.workflow_id.clone(),
    });

    let mut context = ExecutionContext::from_payload(payload);
    let mut nodes_executed = Vec::with_capacity(order.len());

    for node in order {
      self.notifier.notify(ExecutionEvent::NodeStarted {
        execution_id: execution_id.clone(),
        node_id: node.id.clone(),
        node_type: node.node_type.to_string(),
      });

      match self.execute_node(node, context, step).await {
        Ok(next) => {
          self.notifier.notify(ExecutionEvent::NodeCompleted {
            execution_id: execution_id.clone(),
            node_id: node.id.clone(),
            context: next.to_value(),
          });
          context = next;
          nodes_executed.push(node.id.clone());
        }
        Err(e) => {
          let message = e.to_string();
          error!(
            execution_id = %execution_id,
            node_id = %node.id,
            error = %message,
            "node failed"
          );
          self.notifier.notify(ExecutionEvent::NodeFailed {
            execution_id: execution_id.clone(),
            node_id: node.id.clone(),
            error: message.clone(),
          });
          self.notifier.notify(ExecutionEvent::WorkflowFailed {
            execution_id,
            error: format!("node '{}' failed: {}", node.id, message),
          });
          return Err(EngineError::Node {
            node_id: node.id.clone(),
            source: e,
          });
        }
      }
    }

    info!(
      execution_id = %execution_id,
      nodes_executed = nodes_executed.len(),
      "workflow execution completed"
    );
    self.notifier.notify(ExecutionEvent::WorkflowCompleted {
      execution_id: execution_id.clone(),
    });

    Ok(ExecutionResult {
      execution_id,
      context,
      nodes_executed,
    })
  }

  #[instrument(
    name = "node",
    skip(self, node, context, step),
    fields(node_id = %node.id, node_type = %node.node_type)
  )]
  async fn execute_node(
    &self,
    node: &NodeDef,
    context: ExecutionContext,
    step: &dyn Step,
  ) -> Result<ExecutionContext, NodeError> {
    let executor = self.registry.get(node.node_type)?;
    let scoped = ScopedStep::new(step, node.id.as_str());
    executor
      .execute(ExecutorParams {
        node_id: &node.id,
        data: &node.data,
        context,
        step: &scoped,
      })
      .await
  }
}
