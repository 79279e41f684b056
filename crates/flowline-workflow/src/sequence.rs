//! Execution ordering.
//!
//! [`topological_sort`] converts a node list and a connection list into one
//! linear order in which every connection's source runs before its target.
//!
//! # Ordering rule
//!
//! Nodes are visited in the order they appear in the node list. Before a node
//! is emitted, all of its predecessors are emitted first, depth first, in the
//! order their connections appear. The result keeps the input order wherever
//! the connections allow it, so identical input always produces identical
//! output:
//!
//! ```text
//! nodes:       [A, B, C]        nodes:       [A, B, C]
//! connections: [(B, A)]         connections: [(C, A)]
//! order:       [B, A, C]        order:       [C, A, B]
//! ```
//!
//! # Unconnected nodes
//!
//! The sort works on a precedence list rather than on the node list. Every
//! connection becomes a link; every node that takes part in no connection
//! becomes a reflexive anchor entry. Anchors impose no ordering, they only
//! make sure the node is part of the sort. Each node is emitted once no matter
//! how many entries mention it.

use std::collections::{BTreeSet, HashMap, HashSet};

use flowline_config::{Connection, NodeDef};
use tracing::debug;

use crate::error::SequenceError;

/// One entry of the precedence list handed to the sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precedence<'a> {
  /// `to` runs after `from`. `from == to` is a real self-loop.
  Link { from: &'a str, to: &'a str },
  /// Reflexive entry for a node without connections.
  Anchor(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
  Unvisited,
  OnPath,
  Done,
}

/// Order `nodes` so that every connection's source precedes its target.
///
/// With no connections the node list is returned as given. Returns
/// [`SequenceError::Cycle`] when no order exists; nothing is returned
/// partially.
pub fn topological_sort<'a>(
  nodes: &'a [NodeDef],
  connections: &[Connection],
) -> Result<Vec<&'a NodeDef>, SequenceError> {
  if connections.is_empty() {
    return Ok(nodes.iter().collect());
  }

  let positions = index_nodes(nodes)?;
  let precedences = precedence_list(nodes, connections);

  debug!(
    nodes = nodes.len(),
    connections = connections.len(),
    precedences = precedences.len(),
    "sequencing workflow"
  );

  let order = sort_precedences(nodes, &positions, &precedences)?;
  Ok(order.into_iter().map(|index| &nodes[index]).collect())
}

/// Map node ids to their position in the input list.
fn index_nodes(nodes: &[NodeDef]) -> Result<HashMap<&str, usize>, SequenceError> {
  let mut positions = HashMap::with_capacity(nodes.len());
  for (index, node) in nodes.iter().enumerate() {
    if positions.insert(node.id.as_str(), index).is_some() {
      return Err(SequenceError::DuplicateNode {
        node_id: node.id.clone(),
      });
    }
  }
  Ok(positions)
}

/// Links for every connection followed by anchors for unconnected nodes.
fn precedence_list<'a>(nodes: &'a [NodeDef], connections: &'a [Connection]) -> Vec<Precedence<'a>> {
  let mut precedences: Vec<Precedence<'a>> = connections
    .iter()
    .map(|conn| Precedence::Link {
      from: conn.source.as_str(),
      to: conn.target.as_str(),
    })
    .collect();

  let connected: HashSet<&str> = connections
    .iter()
    .flat_map(|conn| [conn.source.as_str(), conn.target.as_str()])
    .collect();

  for node in nodes {
    if !connected.contains(node.id.as_str()) {
      precedences.push(Precedence::Anchor(node.id.as_str()));
    }
  }

  precedences
}

/// Depth-first sort over the precedence list.
///
/// Returns node positions in execution order.
fn sort_precedences(
  nodes: &[NodeDef],
  positions: &HashMap<&str, usize>,
  precedences: &[Precedence<'_>],
) -> Result<Vec<usize>, SequenceError> {
  let lookup = |id: &str| {
    positions
      .get(id)
      .copied()
      .ok_or_else(|| SequenceError::UnknownNode {
        node_id: id.to_string(),
      })
  };

  // Nodes taking part in the sort, in input order.
  let mut members = BTreeSet::new();
  let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

  for precedence in precedences {
    match *precedence {
      Precedence::Link { from, to } => {
        let from = lookup(from)?;
        let to = lookup(to)?;
        members.insert(from);
        members.insert(to);
        if !predecessors[to].contains(&from) {
          predecessors[to].push(from);
        }
      }
      Precedence::Anchor(id) => {
        members.insert(lookup(id)?);
      }
    }
  }

  let mut marks = vec![Mark::Unvisited; nodes.len()];
  let mut order = Vec::with_capacity(members.len());

  for &root in &members {
    if marks[root] != Mark::Unvisited {
      continue;
    }

    // Each frame is (node, index of the next predecessor to visit).
    let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
    marks[root] = Mark::OnPath;

    while let Some(frame) = stack.last_mut() {
      let (node, cursor) = *frame;

      match predecessors[node].get(cursor) {
        Some(&pred) => {
          frame.1 += 1;
          match marks[pred] {
            Mark::Done => {}
            Mark::OnPath => return Err(cycle_error(nodes, &stack, pred)),
            Mark::Unvisited => {
              marks[pred] = Mark::OnPath;
              stack.push((pred, 0));
            }
          }
        }
        None => {
          marks[node] = Mark::Done;
          order.push(node);
          stack.pop();
        }
      }
    }
  }

  Ok(order)
}

/// Build the cycle error from the current traversal path.
///
/// The stack walks predecessors, so the path is reversed to read in
/// execution direction.
fn cycle_error(nodes: &[NodeDef], stack: &[(usize, usize)], repeated: usize) -> SequenceError {
  let start = stack
    .iter()
    .position(|&(node, _)| node == repeated)
    .unwrap_or(0);

  let mut path: Vec<String> = stack[start..]
    .iter()
    .rev()
    .map(|&(node, _)| nodes[node].id.clone())
    .collect();

  if let Some(first) = path.first().cloned() {
    path.push(first);
  }

  SequenceError::Cycle { path }
}

#[cfg(test)]
mod tests {
  use super::*;
  use flowline_config::NodeType;

  fn node(id: &str) -> NodeDef {
    NodeDef::new(id, NodeType::HttpRequest)
  }

  fn nodes(ids: &[&str]) -> Vec<NodeDef> {
    ids.iter().map(|id| node(id)).collect()
  }

  fn conn(source: &str, target: &str) -> Connection {
    Connection::new(source, target)
  }

  fn ids(order: &[&NodeDef]) -> Vec<String> {
    order.iter().map(|n| n.id.clone()).collect()
  }

  fn position(order: &[&NodeDef], id: &str) -> usize {
    order.iter().position(|n| n.id == id).unwrap()
  }

  fn assert_respects(order: &[&NodeDef], connections: &[Connection]) {
    for c in connections {
      assert!(
        position(order, &c.source) < position(order, &c.target),
        "{} should run before {}",
        c.source,
        c.target
      );
    }
  }

  #[test]
  fn empty_connections_keep_input_order() {
    let input = nodes(&["X", "Y", "Z"]);
    let order = topological_sort(&input, &[]).unwrap();
    assert_eq!(ids(&order), vec!["X", "Y", "Z"]);
  }

  #[test]
  fn empty_workflow_has_empty_order() {
    let order = topological_sort(&[], &[]).unwrap();
    assert!(order.is_empty());
  }

  #[test]
  fn linear_chain_in_reverse_input_order() {
    let input = nodes(&["C", "B", "A"]);
    let connections = vec![conn("A", "B"), conn("B", "C")];

    let order = topological_sort(&input, &connections).unwrap();
    assert_eq!(ids(&order), vec!["A", "B", "C"]);
  }

  #[test]
  fn disconnected_node_is_included_once() {
    let input = nodes(&["A", "B", "C"]);
    let connections = vec![conn("A", "B")];

    let order = topological_sort(&input, &connections).unwrap();
    assert_eq!(order.len(), 3);
    assert_respects(&order, &connections);
    assert_eq!(ids(&order).iter().filter(|id| *id == "C").count(), 1);
  }

  #[test]
  fn ties_follow_input_order() {
    let input = nodes(&["A", "B", "C"]);

    let order = topological_sort(&input, &[conn("B", "A")]).unwrap();
    assert_eq!(ids(&order), vec!["B", "A", "C"]);

    let order = topological_sort(&input, &[conn("C", "A")]).unwrap();
    assert_eq!(ids(&order), vec!["C", "A", "B"]);

    let order = topological_sort(&input, &[conn("A", "B")]).unwrap();
    assert_eq!(ids(&order), vec!["A", "B", "C"]);
  }

  #[test]
  fn same_input_gives_same_order() {
    let input = nodes(&["trigger", "left", "right", "join", "side"]);
    let connections = vec![
      conn("trigger", "left"),
      conn("trigger", "right"),
      conn("right", "join"),
      conn("left", "join"),
    ];

    let first = ids(&topological_sort(&input, &connections).unwrap());
    for _ in 0..10 {
      assert_eq!(ids(&topological_sort(&input, &connections).unwrap()), first);
    }
    assert_eq!(first, vec!["trigger", "left", "right", "join", "side"]);
  }

  #[test]
  fn fan_in_waits_for_all_sources() {
    let input = nodes(&["join", "a", "b", "c"]);
    let connections = vec![conn("a", "join"), conn("b", "join"), conn("c", "join")];

    let order = topological_sort(&input, &connections).unwrap();
    assert_eq!(ids(&order), vec!["a", "b", "c", "join"]);
  }

  #[test]
  fn duplicate_connections_do_not_duplicate_nodes() {
    let input = nodes(&["A", "B"]);
    let single = topological_sort(&input, &[conn("A", "B")]).unwrap();
    let doubled = topological_sort(&input, &[conn("A", "B"), conn("A", "B")]).unwrap();

    assert_eq!(ids(&single), ids(&doubled));
    assert_eq!(doubled.len(), 2);
  }

  #[test]
  fn independent_subgraphs_keep_their_internal_order() {
    let input = nodes(&["b2", "a2", "b1", "a1"]);
    let connections = vec![conn("a1", "a2"), conn("b1", "b2")];

    let order = topological_sort(&input, &connections).unwrap();
    assert_respects(&order, &connections);
    assert_eq!(ids(&order), vec!["b1", "b2", "a1", "a2"]);
  }

  #[test]
  fn output_is_a_permutation_of_input() {
    let input = nodes(&["n0", "n1", "n2", "n3", "n4", "n5", "n6"]);
    let connections = vec![
      conn("n6", "n0"),
      conn("n0", "n3"),
      conn("n1", "n3"),
      conn("n3", "n5"),
      conn("n2", "n5"),
    ];

    let order = topological_sort(&input, &connections).unwrap();
    assert_eq!(order.len(), input.len());
    let mut sorted = ids(&order);
    sorted.sort();
    assert_eq!(sorted, vec!["n0", "n1", "n2", "n3", "n4", "n5", "n6"]);
    assert_respects(&order, &connections);
  }

  #[test]
  fn returns_original_node_objects() {
    let input = vec![
      NodeDef::new("fetch", NodeType::HttpRequest).with_data(serde_json::json!({ "endpoint": "http://e" })),
      NodeDef::new("start", NodeType::ManualTrigger),
    ];
    let order = topological_sort(&input, &[conn("start", "fetch")]).unwrap();

    assert_eq!(order[0].node_type, NodeType::ManualTrigger);
    assert_eq!(order[1].data["endpoint"], "http://e");
  }

  #[test]
  fn self_loop_is_a_cycle() {
    let input = nodes(&["A"]);
    let err = topological_sort(&input, &[conn("A", "A")]).unwrap_err();
    assert_eq!(
      err,
      SequenceError::Cycle {
        path: vec!["A".to_string(), "A".to_string()]
      }
    );
  }

  #[test]
  fn self_loop_next_to_isolated_nodes_is_a_cycle() {
    let input = nodes(&["A", "B"]);
    let err = topological_sort(&input, &[conn("B", "B")]).unwrap_err();
    assert!(matches!(err, SequenceError::Cycle { .. }));
  }

  #[test]
  fn two_node_cycle_is_detected() {
    let input = nodes(&["A", "B"]);
    let err = topological_sort(&input, &[conn("A", "B"), conn("B", "A")]).unwrap_err();
    assert_eq!(
      err,
      SequenceError::Cycle {
        path: vec!["B".to_string(), "A".to_string(), "B".to_string()]
      }
    );
    assert!(err.to_string().starts_with("workflow contains a cycle"));
  }

  #[test]
  fn longer_cycle_behind_valid_prefix_is_detected() {
    let input = nodes(&["start", "a", "b", "c"]);
    let connections = vec![
      conn("start", "a"),
      conn("a", "b"),
      conn("b", "c"),
      conn("c", "a"),
    ];

    match topological_sort(&input, &connections).unwrap_err() {
      SequenceError::Cycle { path } => {
        assert_eq!(path.first(), path.last());
        assert_eq!(path.len(), 4);
        assert!(!path.contains(&"start".to_string()));
      }
      other => panic!("expected cycle, got {other:?}"),
    }
  }

  #[test]
  fn unknown_node_is_not_reported_as_cycle() {
    let input = nodes(&["A"]);
    let err = topological_sort(&input, &[conn("A", "ghost")]).unwrap_err();
    assert_eq!(
      err,
      SequenceError::UnknownNode {
        node_id: "ghost".to_string()
      }
    );
  }

  #[test]
  fn duplicate_node_ids_are_rejected() {
    let input = nodes(&["A", "A", "B"]);
    let err = topological_sort(&input, &[conn("A", "B")]).unwrap_err();
    assert!(matches!(err, SequenceError::DuplicateNode { node_id } if node_id == "A"));
  }

  #[test]
  fn anchors_only_cover_unconnected_nodes() {
    let input = nodes(&["A", "B", "C"]);
    let connections = vec![conn("A", "B")];
    let precedences = precedence_list(&input, &connections);

    assert_eq!(
      precedences,
      vec![
        Precedence::Link { from: "A", to: "B" },
        Precedence::Anchor("C"),
      ]
    );
  }

  #[test]
  fn deep_chain_does_not_overflow() {
    let ids: Vec<String> = (0..5_000).map(|i| format!("n{i}")).collect();
    let input: Vec<NodeDef> = ids.iter().rev().map(|id| node(id)).collect();
    let connections: Vec<Connection> = ids.windows(2).map(|w| conn(&w[0], &w[1])).collect();

    let order = topological_sort(&input, &connections).unwrap();
    assert_eq!(order.first().unwrap().id, "n0");
    assert_eq!(order.last().unwrap().id, "n4999");
  }
}
