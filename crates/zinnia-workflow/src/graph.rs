use std::collections::{HashMap, HashSet, VecDeque};

use zinnia_config::{Connection, Endpoint};

use crate::error::WorkflowError;

/// A rewired edge between two executable nodes, port to port.
///
/// Edges keep the authored list order, so multi-fan-in resolution
/// (last-write-wins) is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedEdge {
  pub from: Endpoint,
  pub to: Endpoint,
}

/// The dependency graph over executable nodes.
///
/// Built from the authored connection list with excluded nodes spliced out:
/// edges terminating at an excluded node are dropped, edges originating at
/// one are re-attached to the nearest executable ancestor.
#[derive(Debug, Clone)]
pub struct Graph {
  edges: Vec<RoutedEdge>,
  by_target: HashMap<String, Vec<usize>>,
  by_source: HashMap<String, Vec<usize>>,
}

impl Graph {
  /// Build the rewired graph.
  ///
  /// `excluded` holds the node ids the backend will not execute. The walk up
  /// through excluded sources follows the first authored connection into each
  /// excluded node; a chain with no executable ancestor drops the edge.
  pub fn rewire(connections: &[Connection], excluded: &HashSet<String>) -> Self {
    let mut edges = Vec::new();

    for conn in connections {
      if excluded.contains(&conn.to.node_id) {
        continue;
      }

      let from = resolve_source(&conn.from, connections, excluded);
      let Some(from) = from else { continue };
      if from.node_id == conn.to.node_id {
        continue;
      }

      edges.push(RoutedEdge {
        from,
        to: conn.to.clone(),
      });
    }

    let mut by_target: HashMap<String, Vec<usize>> = HashMap::new();
    let mut by_source: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, edge) in edges.iter().enumerate() {
      by_target.entry(edge.to.node_id.clone()).or_default().push(idx);
      by_source.entry(edge.from.node_id.clone()).or_default().push(idx);
    }

    Self {
      edges,
      by_target,
      by_source,
    }
  }

  /// Incoming edges of a node, in authored order.
  pub fn incoming<'a>(&'a self, node_id: &str) -> impl Iterator<Item = &'a RoutedEdge> + 'a {
    self
      .by_target
      .get(node_id)
      .into_iter()
      .flatten()
      .map(|&idx| &self.edges[idx])
  }

  /// Distinct input ports a node's incoming edges terminate at.
  pub fn required_ports(&self, node_id: &str) -> Vec<&str> {
    let mut ports = Vec::new();
    for edge in self.incoming(node_id) {
      let port = edge.to.port_name.as_str();
      if !ports.contains(&port) {
        ports.push(port);
      }
    }
    ports
  }

  /// Every node transitively reachable downstream of `node_id`.
  pub fn downstream_closure(&self, node_id: &str) -> HashSet<String> {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    queue.push_back(node_id);

    while let Some(current) = queue.pop_front() {
      for &idx in self.by_source.get(current).into_iter().flatten() {
        let next = self.edges[idx].to.node_id.as_str();
        if seen.insert(next.to_string()) {
          queue.push_back(next);
        }
      }
    }

    seen
  }

  /// Reject cycles among the given nodes with Kahn's algorithm; nodes left
  /// with in-degree are the cycle participants.
  pub fn check_acyclic(&self, node_ids: &[String]) -> Result<(), WorkflowError> {
    let nodes: HashSet<&str> = node_ids.iter().map(|s| s.as_str()).collect();
    let mut in_degree: HashMap<&str, usize> = nodes.iter().map(|&n| (n, 0)).collect();

    for edge in &self.edges {
      if nodes.contains(edge.from.node_id.as_str()) && nodes.contains(edge.to.node_id.as_str()) {
        *in_degree.get_mut(edge.to.node_id.as_str()).unwrap() += 1;
      }
    }

    let mut queue: VecDeque<&str> = in_degree
      .iter()
      .filter(|(_, &d)| d == 0)
      .map(|(&n, _)| n)
      .collect();
    let mut visited = 0usize;

    while let Some(current) = queue.pop_front() {
      visited += 1;
      for &idx in self.by_source.get(current).into_iter().flatten() {
        let next = self.edges[idx].to.node_id.as_str();
        if let Some(degree) = in_degree.get_mut(next) {
          *degree -= 1;
          if *degree == 0 {
            queue.push_back(next);
          }
        }
      }
    }

    if visited == nodes.len() {
      Ok(())
    } else {
      let mut stuck: Vec<String> = in_degree
        .into_iter()
        .filter(|(_, d)| *d > 0)
        .map(|(n, _)| n.to_string())
        .collect();
      stuck.sort();
      Err(WorkflowError::CycleDetected { nodes: stuck })
    }
  }
}

/// Walk upstream from an excluded source until an executable node is found.
fn resolve_source(
  from: &Endpoint,
  connections: &[Connection],
  excluded: &HashSet<String>,
) -> Option<Endpoint> {
  let mut current = from.clone();
  let mut hops = 0usize;

  while excluded.contains(&current.node_id) {
    let upstream = connections
      .iter()
      .find(|c| c.to.node_id == current.node_id)?;
    current = upstream.from.clone();

    // Bail on degenerate excluded-node cycles.
    hops += 1;
    if hops > connections.len() {
      return None;
    }
  }

  Some(current)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn conn(from: (&str, &str), to: (&str, &str)) -> Connection {
    serde_json::from_value(serde_json::json!({
      "from": { "nodeId": from.0, "portName": from.1 },
      "to": { "nodeId": to.0, "portName": to.1 },
    }))
    .unwrap()
  }

  #[test]
  fn test_plain_edges_survive() {
    let connections = vec![conn(("a", "text"), ("b", "data"))];
    let graph = Graph::rewire(&connections, &HashSet::new());
    let incoming: Vec<_> = graph.incoming("b").collect();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].from.node_id, "a");
    assert_eq!(incoming[0].to.port_name, "data");
  }

  #[test]
  fn test_edge_through_excluded_node_is_rewired() {
    let connections = vec![
      conn(("a", "text"), ("f", "display")),
      conn(("f", "display"), ("b", "data")),
    ];
    let excluded: HashSet<String> = ["f".to_string()].into();

    let graph = Graph::rewire(&connections, &excluded);
    let incoming: Vec<_> = graph.incoming("b").collect();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].from.node_id, "a");
    // The rewired edge keeps the original source port.
    assert_eq!(incoming[0].from.port_name, "text");
    assert!(graph.incoming("f").next().is_none());
  }

  #[test]
  fn test_chain_of_excluded_nodes() {
    let connections = vec![
      conn(("a", "out"), ("f1", "in")),
      conn(("f1", "out"), ("f2", "in")),
      conn(("f2", "out"), ("b", "in")),
    ];
    let excluded: HashSet<String> = ["f1".to_string(), "f2".to_string()].into();

    let graph = Graph::rewire(&connections, &excluded);
    let incoming: Vec<_> = graph.incoming("b").collect();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].from.node_id, "a");
  }

  #[test]
  fn test_excluded_chain_with_no_ancestor_drops_edge() {
    let connections = vec![conn(("f", "out"), ("b", "in"))];
    let excluded: HashSet<String> = ["f".to_string()].into();

    let graph = Graph::rewire(&connections, &excluded);
    assert!(graph.incoming("b").next().is_none());
  }

  #[test]
  fn test_required_ports_are_distinct() {
    let connections = vec![
      conn(("a", "x"), ("c", "data")),
      conn(("b", "y"), ("c", "data")),
      conn(("a", "x"), ("c", "trigger")),
    ];
    let graph = Graph::rewire(&connections, &HashSet::new());
    assert_eq!(graph.required_ports("c"), vec!["data", "trigger"]);
  }

  #[test]
  fn test_downstream_closure_is_transitive() {
    let connections = vec![
      conn(("loop", "current_item"), ("b", "in")),
      conn(("b", "out"), ("c", "in")),
      conn(("x", "out"), ("y", "in")),
    ];
    let graph = Graph::rewire(&connections, &HashSet::new());
    let downstream = graph.downstream_closure("loop");
    assert_eq!(
      downstream,
      ["b".to_string(), "c".to_string()].into_iter().collect()
    );
  }

  #[test]
  fn test_cycle_detection() {
    let connections = vec![
      conn(("a", "out"), ("b", "in")),
      conn(("b", "out"), ("a", "in")),
    ];
    let graph = Graph::rewire(&connections, &HashSet::new());
    let err = graph
      .check_acyclic(&["a".to_string(), "b".to_string()])
      .unwrap_err();
    assert!(matches!(err, WorkflowError::CycleDetected { .. }));
  }

  #[test]
  fn test_acyclic_graph_passes() {
    let connections = vec![
      conn(("a", "out"), ("b", "in")),
      conn(("a", "out"), ("c", "in")),
      conn(("b", "out"), ("c", "in")),
    ];
    let graph = Graph::rewire(&connections, &HashSet::new());
    graph
      .check_acyclic(&["a".to_string(), "b".to_string(), "c".to_string()])
      .unwrap();
  }
}
