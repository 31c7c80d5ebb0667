use serde::{Deserialize, Serialize};

/// A node-type definition, loaded from the VFS at `/nodes/<type>.node`.
///
/// Definitions describe the ports a node type exposes and whether the type
/// runs in the backend at all. A missing or unreadable definition is replaced
/// by [`NodeDefinition::permissive`], which lets unknown node types flow
/// through the fallback executor instead of failing the workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
  pub id: String,
  #[serde(default)]
  pub execution_mode: ExecutionMode,
  #[serde(default)]
  pub inputs: Vec<PortSpec>,
  #[serde(default)]
  pub outputs: Vec<PortSpec>,
}

/// Where a node type is allowed to execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
  /// Runs in both the editor and the backend.
  #[default]
  Both,
  /// Editor-only; the backend skips the node and rewires its edges.
  FrontendOnly,
}

/// A typed input or output port on a node definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
  pub id: String,
  #[serde(rename = "type", default)]
  pub port_type: String,
}

impl NodeDefinition {
  /// Default definition for a type with no `.node` file: executes everywhere,
  /// declares no ports.
  pub fn permissive(node_type: &str) -> Self {
    Self {
      id: node_type.to_string(),
      execution_mode: ExecutionMode::Both,
      inputs: Vec::new(),
      outputs: Vec::new(),
    }
  }

  pub fn is_frontend_only(&self) -> bool {
    self.execution_mode == ExecutionMode::FrontendOnly
  }

  /// Declared input-port ids, in definition order.
  pub fn input_ports(&self) -> impl Iterator<Item = &str> {
    self.inputs.iter().map(|p| p.id.as_str())
  }
}
