use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::enums::RetryBackoff;
use crate::node::NodeDef;

/// A workflow definition as loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDef {
  pub workflow_id: String,
  pub name: String,
  /// Timeout applied to each outbound HTTP call.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_ms: Option<u64>,
  /// Attempts per durable step, including the first one.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub max_retry_attempts: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry_backoff: Option<RetryBackoff>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub retry_initial_delay_ms: Option<u64>,
  pub nodes: Vec<NodeDef>,
  #[serde(default)]
  pub connections: Vec<Connection>,
}
