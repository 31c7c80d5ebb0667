use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("connection references unknown node: from={from}, to={to}")]
  InvalidEdge { from: String, to: String },

  #[error("duplicate node id: {0}")]
  DuplicateNode(String),

  #[error("cycle detected among executable nodes: {nodes:?}")]
  CycleDetected { nodes: Vec<String> },
}
