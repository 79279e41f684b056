//! Execution events and notifiers.
//!
//! The engine reports progress through an [`ExecutionNotifier`]. What happens
//! to the events (logging, streaming to an editor, persisting) is up to the
//! notifier.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExecutionEvent {
  WorkflowStarted {
    execution_id: String,
    workflow_id: String,
  },

  NodeStarted {
    execution_id: String,
    node_id: String,
    node_type: String,
  },

  /// A node finished; `context` is the context it returned.
  NodeCompleted {
    execution_id: String,
    node_id: String,
    context: serde_json::Value,
  },

  NodeFailed {
    execution_id: String,
    node_id: String,
    error: String,
  },

  WorkflowCompleted { execution_id: String },

  WorkflowFailed { execution_id: String, error: String },
}

impl ExecutionEvent {
  pub fn execution_id(&self) -> &str {
    match self {
      Self::WorkflowStarted { execution_id, .. }
      | Self::NodeStarted { execution_id, .. }
      | Self::NodeCompleted { execution_id, .. }
      | Self::NodeFailed { execution_id, .. }
      | Self::WorkflowCompleted { execution_id }
      | Self::WorkflowFailed { execution_id, .. } => execution_id,
    }
  }
}

/// Receiver of execution events.
pub trait ExecutionNotifier: Send + Sync {
  fn notify(&self, event: ExecutionEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl ExecutionNotifier for NoopNotifier {
  fn notify(&self, _event: ExecutionEvent) {}
}

/// Forwards events to an unbounded channel. Sending never blocks a run.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  sender: mpsc::UnboundedSender<ExecutionEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<ExecutionEvent>) -> Self {
    Self { sender }
  }

  /// Create a notifier together with the receiving end of its channel.
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExecutionEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Self::new(sender), receiver)
  }
}

impl ExecutionNotifier for ChannelNotifier {
  fn notify(&self, event: ExecutionEvent) {
    // Receiver may have been dropped
    let _ = self.sender.send(event);
  }
}
