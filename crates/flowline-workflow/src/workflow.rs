use std::collections::HashSet;

use flowline_config::{Connection, NodeDef, NodeType, RetryBackoff, WorkflowDef};
use tracing::info;

use crate::error::{SequenceError, WorkflowError};
use crate::graph::Graph;
use crate::sequence::topological_sort;

/// A workflow ready for editing and execution.
///
/// Nodes and connections are only changed through the editing methods, which
/// enforce the trigger rules:
/// - at most one [`NodeType::ManualTrigger`] node
/// - at most one [`NodeType::Initial`] placeholder; inserting one, or inserting
///   anything while one is present, replaces the whole graph with that node
///
/// Acyclicity is not enforced while editing; it is checked when the execution
/// order is computed.
#[derive(Debug, Clone, PartialEq)]
pub struct Workflow {
  pub workflow_id: String,
  pub name: String,
  pub timeout_ms: Option<u64>,
  pub max_retry_attempts: Option<u32>,
  pub retry_backoff: Option<RetryBackoff>,
  pub retry_initial_delay_ms: Option<u64>,
  nodes: Vec<NodeDef>,
  connections: Vec<Connection>,
}

impl Workflow {
  /// Create a fresh workflow holding only the initial placeholder node.
  pub fn new(workflow_id: impl Into<String>, name: impl Into<String>) -> Self {
    let workflow_id = workflow_id.into();
    let initial = NodeDef::new(format!("{workflow_id}-initial"), NodeType::Initial);
    Self {
      workflow_id,
      name: name.into(),
      timeout_ms: None,
      max_retry_attempts: None,
      retry_backoff: None,
      retry_initial_delay_ms: None,
      nodes: vec![initial],
      connections: Vec::new(),
    }
  }

  /// Load a workflow definition, checking the same rules the editor enforces.
  pub fn from_def(def: WorkflowDef) -> Result<Self, WorkflowError> {
    let mut seen = HashSet::new();
    let mut manual_triggers = 0;
    let mut initials = 0;
    for node in &def.nodes {
      if !seen.insert(node.id.as_str()) {
        return Err(WorkflowError::DuplicateNode(node.id.clone()));
      }
      match node.node_type {
        NodeType::ManualTrigger => manual_triggers += 1,
        NodeType::Initial => initials += 1,
        NodeType::HttpRequest => {}
      }
    }
    if manual_triggers > 1 {
      return Err(WorkflowError::ManualTriggerExists);
    }
    if initials > 1 {
      return Err(WorkflowError::MultipleInitialNodes);
    }

    let mut connections: Vec<Connection> = Vec::with_capacity(def.connections.len());
    for conn in def.connections {
      if !seen.contains(conn.source.as_str()) || !seen.contains(conn.target.as_str()) {
        return Err(WorkflowError::InvalidConnection {
          source_id: conn.source,
          target_id: conn.target,
        });
      }
      if !connections.contains(&conn) {
        connections.push(conn);
      }
    }

    Ok(Self {
      workflow_id: def.workflow_id,
      name: def.name,
      timeout_ms: def.timeout_ms,
      max_retry_attempts: def.max_retry_attempts,
      retry_backoff: def.retry_backoff,
      retry_initial_delay_ms: def.retry_initial_delay_ms,
      nodes: def.nodes,
      connections,
    })
  }

  /// Convert back into the serializable definition.
  pub fn to_def(&self) -> WorkflowDef {
    WorkflowDef {
      workflow_id: self.workflow_id.clone(),
      name: self.name.clone(),
      timeout_ms: self.timeout_ms,
      max_retry_attempts: self.max_retry_attempts,
      retry_backoff: self.retry_backoff,
      retry_initial_delay_ms: self.retry_initial_delay_ms,
      nodes: self.nodes.clone(),
      connections: self.connections.clone(),
    }
  }

  pub fn nodes(&self) -> &[NodeDef] {
    &self.nodes
  }

  pub fn connections(&self) -> &[Connection] {
    &self.connections
  }

  /// Get a node by ID.
  pub fn get_node(&self, node_id: &str) -> Option<&NodeDef> {
    self.nodes.iter().find(|node| node.id == node_id)
  }

  /// Build the graph structure for traversal.
  pub fn graph(&self) -> Graph {
    Graph::new(&self.nodes, &self.connections)
  }

  /// Compute the order the nodes run in.
  pub fn execution_order(&self) -> Result<Vec<&NodeDef>, SequenceError> {
    topological_sort(&self.nodes, &self.connections)
  }

  /// Insert a node.
  ///
  /// A second manual trigger is rejected without touching the graph.
  /// Inserting an initial node starts the workflow fresh, and while the
  /// initial placeholder is present the new node replaces it. Either way the
  /// graph is reduced to the inserted node with no connections.
  pub fn insert_node(&mut self, node: NodeDef) -> Result<(), WorkflowError> {
    if node.node_type == NodeType::ManualTrigger && self.has_node_type(NodeType::ManualTrigger) {
      return Err(WorkflowError::ManualTriggerExists);
    }

    if node.node_type == NodeType::Initial || self.has_node_type(NodeType::Initial) {
      info!(
        workflow_id = %self.workflow_id,
        node_id = %node.id,
        node_type = %node.node_type,
        "replacing all nodes"
      );
      self.nodes = vec![node];
      self.connections.clear();
      return Ok(());
    }

    if self.get_node(&node.id).is_some() {
      return Err(WorkflowError::DuplicateNode(node.id));
    }

    self.nodes.push(node);
    Ok(())
  }

  /// Replace a node's configuration payload.
  pub fn update_node_data(
    &mut self,
    node_id: &str,
    data: serde_json::Value,
  ) -> Result<(), WorkflowError> {
    let node = self
      .nodes
      .iter_mut()
      .find(|node| node.id == node_id)
      .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))?;
    node.data = data;
    Ok(())
  }

  /// Remove a node together with every connection touching it.
  pub fn remove_node(&mut self, node_id: &str) -> Result<NodeDef, WorkflowError> {
    let index = self
      .nodes
      .iter()
      .position(|node| node.id == node_id)
      .ok_or_else(|| WorkflowError::NodeNotFound(node_id.to_string()))?;

    self
      .connections
      .retain(|conn| conn.source != node_id && conn.target != node_id);
    Ok(self.nodes.remove(index))
  }

  /// Connect two existing nodes. Connecting an already connected pair is a
  /// no-op.
  pub fn connect(
    &mut self,
    source: impl Into<String>,
    target: impl Into<String>,
  ) -> Result<(), WorkflowError> {
    let conn = Connection::new(source, target);
    if self.get_node(&conn.source).is_none() || self.get_node(&conn.target).is_none() {
      return Err(WorkflowError::InvalidConnection {
        source_id: conn.source,
        target_id: conn.target,
      });
    }
    if !self.connections.contains(&conn) {
      self.connections.push(conn);
    }
    Ok(())
  }

  /// Remove a connection. Returns whether it existed.
  pub fn disconnect(&mut self, source: &str, target: &str) -> bool {
    let before = self.connections.len();
    self
      .connections
      .retain(|conn| !(conn.source == source && conn.target == target));
    self.connections.len() != before
  }

  fn has_node_type(&self, node_type: NodeType) -> bool {
    self.nodes.iter().any(|node| node.node_type == node_type)
  }
}
