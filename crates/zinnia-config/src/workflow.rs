use serde::{Deserialize, Serialize};

use crate::node::NodeDef;

/// An authored workflow document: nodes plus port-to-port connections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDef {
  #[serde(default)]
  pub nodes: Vec<NodeDef>,
  #[serde(default)]
  pub connections: Vec<Connection>,
}

impl WorkflowDef {
  /// Look up a node by id.
  pub fn get_node(&self, node_id: &str) -> Option<&NodeDef> {
    self.nodes.iter().find(|n| n.id == node_id)
  }
}

/// A directed edge from one node's output port to another node's input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
  pub from: Endpoint,
  pub to: Endpoint,
}

/// One end of a connection: a node id plus a port name on that node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
  pub node_id: String,
  pub port_name: String,
}
