//! Workflow runner with channel-based triggering.
//!
//! The `WorkflowRunner` owns an mpsc channel of trigger payloads and executes
//! the workflow once per payload.

use std::sync::Arc;

use flowline_workflow::Workflow;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::engine::{ExecutionResult, WorkflowEngine};
use crate::error::EngineError;
use crate::events::{ExecutionNotifier, NoopNotifier};

const DEFAULT_BUFFER_SIZE: usize = 100;

/// A runner that executes a workflow in response to trigger payloads.
///
/// Runs are processed one at a time. Cancellation stops the loop between runs;
/// a run that has started always finishes.
///
/// # Usage
///
/// ```ignore
/// let runner = WorkflowRunner::new(workflow, engine);
///
/// // Hand the sender to whatever produces trigger payloads
/// let sender = runner.sender();
///
/// let cancel = CancellationToken::new();
/// runner.start(cancel).await?;
/// ```
pub struct WorkflowRunner<N: ExecutionNotifier = NoopNotifier> {
  sender: mpsc::Sender<serde_json::Value>,
  receiver: mpsc::Receiver<serde_json::Value>,
  workflow: Arc<Workflow>,
  engine: Arc<WorkflowEngine<N>>,
}

impl<N: ExecutionNotifier> WorkflowRunner<N> {
  pub fn new(workflow: Arc<Workflow>, engine: Arc<WorkflowEngine<N>>) -> Self {
    Self::with_buffer_size(workflow, engine, DEFAULT_BUFFER_SIZE)
  }

  pub fn with_buffer_size(
    workflow: Arc<Workflow>,
    engine: Arc<WorkflowEngine<N>>,
    buffer_size: usize,
  ) -> Self {
    let (sender, receiver) = mpsc::channel(buffer_size);
    Self {
      sender,
      receiver,
      workflow,
      engine,
    }
  }

  /// Get a sender handle for triggering workflow executions.
  pub fn sender(&self) -> mpsc::Sender<serde_json::Value> {
    self.sender.clone()
  }

  /// Queue a workflow execution with the given payload.
  pub async fn run(&self, payload: serde_json::Value) -> Result<(), EngineError> {
    self
      .sender
      .send(payload)
      .await
      .map_err(|_| EngineError::ChannelClosed)
  }

  /// Start the execution loop.
  ///
  /// Returns when the cancellation token fires or every sender is dropped.
  pub async fn start(mut self, cancel: CancellationToken) {
    let workflow_id = self.workflow.workflow_id.clone();
    info!(
      workflow_id = %workflow_id,
      workflow_name = %self.workflow.name,
      "starting workflow runner"
    );

    // Only the caller's senders keep the loop alive
    drop(self.sender);

    loop {
      tokio::select! {
        biased;
        _ = cancel.cancelled() => {
          info!(workflow_id = %workflow_id, "workflow runner cancelled");
          break;
        }
        payload = self.receiver.recv() => {
          let Some(payload) = payload else {
            info!(workflow_id = %workflow_id, "workflow runner channel closed");
            break;
          };

          match self.engine.execute(&self.workflow, payload).await {
            Ok(result) => {
              info!(
                workflow_id = %workflow_id,
                execution_id = %result.execution_id,
                nodes_executed = result.nodes_executed.len(),
                "workflow execution completed"
              );
            }
            Err(e) => {
              error!(
                workflow_id = %workflow_id,
                error = %e,
                "workflow execution failed"
              );
            }
          }
        }
      }
    }
  }

  /// Execute a single workflow run directly, bypassing the channel.
  pub async fn execute_once(
    &self,
    payload: serde_json::Value,
  ) -> Result<ExecutionResult, EngineError> {
    self.engine.execute(&self.workflow, payload).await
  }

  pub fn workflow(&self) -> &Workflow {
    &self.workflow
  }
}
