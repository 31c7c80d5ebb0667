use std::collections::{HashMap, HashSet};

use tracing::debug;
use zinnia_config::{NodeDef, NodeDefinition, WorkflowDef};

use crate::error::WorkflowError;
use crate::graph::Graph;

/// A classified workflow, ready for scheduling.
///
/// Holds the authored nodes, the executable/excluded split, and the rewired
/// dependency graph. Frontend-only node types and `repeater` nodes are
/// excluded: the former belong to the editor, the latter are loop drivers
/// handled by the execution manager, not data-path nodes.
#[derive(Debug, Clone)]
pub struct Workflow {
  nodes: HashMap<String, NodeDef>,
  /// Executable node ids in authored order.
  executable: Vec<String>,
  frontend_only: HashSet<String>,
  /// Repeater node ids in authored order.
  repeaters: Vec<String>,
  graph: Graph,
}

impl Workflow {
  /// Classify an authored workflow against its node definitions.
  ///
  /// Validates connection endpoints, splits excluded from executable nodes,
  /// rewires the graph, and rejects cycles among executable nodes.
  pub fn classify(
    def: WorkflowDef,
    definitions: &HashMap<String, NodeDefinition>,
  ) -> Result<Self, WorkflowError> {
    let mut nodes = HashMap::new();
    for node in &def.nodes {
      if nodes.insert(node.id.clone(), node.clone()).is_some() {
        return Err(WorkflowError::DuplicateNode(node.id.clone()));
      }
    }

    for conn in &def.connections {
      if !nodes.contains_key(&conn.from.node_id) || !nodes.contains_key(&conn.to.node_id) {
        return Err(WorkflowError::InvalidEdge {
          from: conn.from.node_id.clone(),
          to: conn.to.node_id.clone(),
        });
      }
    }

    let mut frontend_only = HashSet::new();
    let mut repeaters = Vec::new();
    for node in &def.nodes {
      let is_frontend_only = definitions
        .get(&node.node_type)
        .map(|d| d.is_frontend_only())
        .unwrap_or(false);
      if is_frontend_only {
        frontend_only.insert(node.id.clone());
      }
      if node.node_type == "repeater" {
        repeaters.push(node.id.clone());
      }
    }

    let mut excluded: HashSet<String> = frontend_only.clone();
    excluded.extend(repeaters.iter().cloned());

    let executable: Vec<String> = def
      .nodes
      .iter()
      .filter(|n| !excluded.contains(&n.id))
      .map(|n| n.id.clone())
      .collect();

    debug!(
      total = def.nodes.len(),
      executable = executable.len(),
      frontend_only = frontend_only.len(),
      repeaters = repeaters.len(),
      "workflow classified"
    );

    let graph = Graph::rewire(&def.connections, &excluded);
    graph.check_acyclic(&executable)?;

    Ok(Self {
      nodes,
      executable,
      frontend_only,
      repeaters,
      graph,
    })
  }

  pub fn get_node(&self, node_id: &str) -> Option<&NodeDef> {
    self.nodes.get(node_id)
  }

  /// Executable node ids in authored order.
  pub fn executable(&self) -> &[String] {
    &self.executable
  }

  pub fn frontend_only(&self) -> &HashSet<String> {
    &self.frontend_only
  }

  /// Repeater node ids in authored order; the first one drives loop mode.
  pub fn repeaters(&self) -> &[String] {
    &self.repeaters
  }

  pub fn graph(&self) -> &Graph {
    &self.graph
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn defs_from(entries: &[(&str, bool)]) -> HashMap<String, NodeDefinition> {
    entries
      .iter()
      .map(|(name, frontend_only)| {
        let mut def = NodeDefinition::permissive(name);
        if *frontend_only {
          def = serde_json::from_value(serde_json::json!({
            "id": name,
            "execution_mode": "frontend_only",
          }))
          .unwrap();
        }
        (name.to_string(), def)
      })
      .collect()
  }

  fn workflow_doc(json: serde_json::Value) -> WorkflowDef {
    serde_json::from_value(json).unwrap()
  }

  #[test]
  fn test_frontend_only_and_repeater_are_excluded() {
    let def = workflow_doc(serde_json::json!({
      "nodes": [
        { "id": "t", "type": "text", "config": {} },
        { "id": "d", "type": "display", "config": {} },
        { "id": "r", "type": "repeater", "config": {} },
      ],
      "connections": []
    }));
    let defs = defs_from(&[("text", false), ("display", true), ("repeater", false)]);

    let workflow = Workflow::classify(def, &defs).unwrap();
    assert_eq!(workflow.executable(), &["t".to_string()]);
    assert!(workflow.frontend_only().contains("d"));
    assert_eq!(workflow.repeaters(), &["r".to_string()]);
  }

  #[test]
  fn test_rewiring_through_frontend_only_node() {
    let def = workflow_doc(serde_json::json!({
      "nodes": [
        { "id": "a", "type": "text", "config": {} },
        { "id": "f", "type": "display", "config": {} },
        { "id": "b", "type": "vfs_save", "config": {} },
      ],
      "connections": [
        { "from": { "nodeId": "a", "portName": "text" }, "to": { "nodeId": "f", "portName": "in" } },
        { "from": { "nodeId": "f", "portName": "out" }, "to": { "nodeId": "b", "portName": "data" } },
      ]
    }));
    let defs = defs_from(&[("text", false), ("display", true), ("vfs_save", false)]);

    let workflow = Workflow::classify(def, &defs).unwrap();
    let incoming: Vec<_> = workflow.graph().incoming("b").collect();
    assert_eq!(incoming.len(), 1);
    assert_eq!(incoming[0].from.node_id, "a");
  }

  #[test]
  fn test_unknown_connection_endpoint_is_rejected() {
    let def = workflow_doc(serde_json::json!({
      "nodes": [ { "id": "a", "type": "text", "config": {} } ],
      "connections": [
        { "from": { "nodeId": "a", "portName": "x" }, "to": { "nodeId": "ghost", "portName": "y" } },
      ]
    }));

    let err = Workflow::classify(def, &HashMap::new()).unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidEdge { .. }));
  }

  #[test]
  fn test_cycle_is_a_bootstrap_error() {
    let def = workflow_doc(serde_json::json!({
      "nodes": [
        { "id": "a", "type": "text", "config": {} },
        { "id": "b", "type": "text", "config": {} },
      ],
      "connections": [
        { "from": { "nodeId": "a", "portName": "o" }, "to": { "nodeId": "b", "portName": "i" } },
        { "from": { "nodeId": "b", "portName": "o" }, "to": { "nodeId": "a", "portName": "i" } },
      ]
    }));

    let err = Workflow::classify(def, &HashMap::new()).unwrap_err();
    assert!(matches!(err, WorkflowError::CycleDetected { .. }));
  }

  #[test]
  fn test_duplicate_node_id_is_rejected() {
    let def = workflow_doc(serde_json::json!({
      "nodes": [
        { "id": "a", "type": "text", "config": {} },
        { "id": "a", "type": "math", "config": {} },
      ],
      "connections": []
    }));

    let err = Workflow::classify(def, &HashMap::new()).unwrap_err();
    assert!(matches!(err, WorkflowError::DuplicateNode(_)));
  }
}
