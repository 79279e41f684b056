use std::collections::{HashMap, HashSet};

use flowline_config::{Connection, NodeDef};

/// Graph structure for traversal and analysis.
///
/// Neighbour lists keep connection order and never hold the same node twice.
#[derive(Debug, Clone)]
pub struct Graph {
  /// Adjacency list: node_id -> list of downstream node_ids.
  adjacency: HashMap<String, Vec<String>>,
  /// Reverse adjacency: node_id -> list of upstream node_ids.
  reverse_adjacency: HashMap<String, Vec<String>>,
  /// Nodes with no incoming connections, in node order.
  entry_points: Vec<String>,
  /// Nodes with multiple incoming connections (fan-in).
  join_points: HashSet<String>,
}

impl Graph {
  /// Build a graph from nodes and connections.
  pub fn new(nodes: &[NodeDef], connections: &[Connection]) -> Self {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    let mut reverse_adjacency: HashMap<String, Vec<String>> = HashMap::new();

    for node in nodes {
      adjacency.entry(node.id.clone()).or_default();
      reverse_adjacency.entry(node.id.clone()).or_default();
    }

    for conn in connections {
      push_unique(
        adjacency.entry(conn.source.clone()).or_default(),
        &conn.target,
      );
      push_unique(
        reverse_adjacency.entry(conn.target.clone()).or_default(),
        &conn.source,
      );
    }

    let entry_points: Vec<String> = nodes
      .iter()
      .filter(|node| reverse_adjacency.get(&node.id).is_none_or(|v| v.is_empty()))
      .map(|node| node.id.clone())
      .collect();

    let join_points: HashSet<String> = reverse_adjacency
      .iter()
      .filter(|(_, incoming)| incoming.len() > 1)
      .map(|(id, _)| id.clone())
      .collect();

    Self {
      adjacency,
      reverse_adjacency,
      entry_points,
      join_points,
    }
  }

  /// Get entry points (nodes with no incoming connections).
  pub fn entry_points(&self) -> &[String] {
    &self.entry_points
  }

  /// Get downstream nodes for a given node.
  pub fn downstream(&self, node_id: &str) -> &[String] {
    self
      .adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get upstream nodes for a given node.
  pub fn upstream(&self, node_id: &str) -> &[String] {
    self
      .reverse_adjacency
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Check if a node has multiple upstream nodes.
  pub fn is_join_point(&self, node_id: &str) -> bool {
    self.join_points.contains(node_id)
  }

  /// Check if a node takes part in no connection at all.
  pub fn is_isolated(&self, node_id: &str) -> bool {
    self.upstream(node_id).is_empty() && self.downstream(node_id).is_empty()
  }
}

fn push_unique(list: &mut Vec<String>, id: &str) {
  if !list.iter().any(|existing| existing == id) {
    list.push(id.to_string());
  }
}
