use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use zinnia_client::ClientError;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};

/// Reserved result key: truthy value terminates the enclosing scheduler loop.
pub const STOP_EXECUTION_PORT: &str = "__stop_execution";

/// Reserved result key: marks a loop-driver result the manager must expand.
pub const FOR_EACH_CONTROL_PORT: &str = "for_each_control";

/// Result key carrying a node-level failure message.
pub const ERROR_PORT: &str = "error";

/// Errors an executor can surface. These never cross the registry as `Err`;
/// they become an `error` port on the node's result map.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
  /// The executor received data it cannot handle.
  #[error("{message}")]
  Contract { message: String },

  /// A remote call failed.
  #[error("{source}")]
  Client {
    #[from]
    source: ClientError,
  },
}

impl ExecutorError {
  pub fn contract(message: impl Into<String>) -> Self {
    ExecutorError::Contract {
      message: message.into(),
    }
  }
}

/// Loop scope a node executes under, when inside a `for_each` iteration.
#[derive(Debug, Clone)]
pub struct IterationScope {
  pub index: usize,
  pub item: Value,
}

/// Shared state an execution may consult: results produced so far in this
/// invocation, the upstream node feeding this one, and the loop scope.
///
/// The results snapshot is taken when the node's ready-set starts; nodes in
/// the same set do not observe each other.
#[derive(Debug, Clone)]
pub struct RunContext {
  pub results: Arc<HashMap<String, ValueMap>>,
  pub parent_node_id: Option<String>,
  pub iteration: Option<IterationScope>,
}

impl RunContext {
  pub fn empty() -> Self {
    Self {
      results: Arc::new(HashMap::new()),
      parent_node_id: None,
      iteration: None,
    }
  }
}

/// A node executor: computes the output map for every node type it declares.
///
/// Returning `Ok` with a map containing [`ERROR_PORT`] is how executors report
/// recoverable, data-shaped failures; returning `Err` is equivalent — the
/// registry folds it into an `error` port. Panics are bugs.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
  /// The node types this executor answers for.
  fn node_types(&self) -> &'static [&'static str];

  /// Execute one node. `input` is the assembled, port-mapped input bundle;
  /// `None` means the node has no incoming connections.
  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError>;
}

/// Whether a result map carries the stop signal.
pub fn is_stop_signal(result: &ValueMap) -> bool {
  result
    .get(STOP_EXECUTION_PORT)
    .map(|v| v.is_truthy())
    .unwrap_or(false)
}

/// Whether a result map marks a loop-driver expansion.
pub fn is_for_each_control(result: &ValueMap) -> bool {
  result
    .get(FOR_EACH_CONTROL_PORT)
    .map(|v| v.is_truthy())
    .unwrap_or(false)
}

/// Whether a result map carries a node-level error.
pub fn has_error(result: &ValueMap) -> bool {
  result.contains_key(ERROR_PORT)
}
