use std::collections::HashMap;
use std::time::Duration;

use zinnia_data::{Value, ValueMap};
use zinnia_node::has_error;

/// The loop scope a record was produced under.
#[derive(Debug, Clone)]
pub struct IterationTag {
  pub index: usize,
  pub item: Value,
  pub for_each_node: String,
}

/// One executed node's output, in execution order.
#[derive(Debug, Clone)]
pub struct NodeRecord {
  pub node_id: String,
  pub output: ValueMap,
  pub iteration: Option<IterationTag>,
}

impl NodeRecord {
  pub fn is_error(&self) -> bool {
    has_error(&self.output)
  }

  pub fn error_message(&self) -> Option<String> {
    self
      .output
      .get(zinnia_node::ERROR_PORT)
      .map(|v| v.to_display_string())
  }
}

/// The outcome of one workflow invocation.
#[derive(Debug)]
pub struct RunReport {
  pub execution_id: String,
  /// Everything that executed, in order, including per-iteration records.
  pub records: Vec<NodeRecord>,
  /// Final results keyed by node id (last value per node).
  pub results: HashMap<String, ValueMap>,
  /// A `__stop_execution` signal ended the run early.
  pub stopped: bool,
  /// The run was cancelled; records hold the partial results.
  pub cancelled: bool,
  pub duration: Duration,
}

impl RunReport {
  pub fn success_count(&self) -> usize {
    self.records.iter().filter(|r| !r.is_error()).count()
  }

  pub fn error_count(&self) -> usize {
    self.records.iter().filter(|r| r.is_error()).count()
  }
}
