use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info};
use zinnia_config::{NodeDef, NodeDefinition};
use zinnia_data::{map_input_for_node, Value, ValueMap};

use crate::executor::{has_error, ExecutorError, NodeExecutor, RunContext, ERROR_PORT};

/// Dispatch from `node.type` to a registered executor.
///
/// Dispatch is strictly by type; the registry does not inspect inputs. An
/// unregistered type falls through to the fallback executor, and every
/// execution produces a result map — failures surface as an `error` port,
/// never as a propagated error.
pub struct ExecutorRegistry {
  by_type: HashMap<String, Arc<dyn NodeExecutor>>,
  fallback: Arc<dyn NodeExecutor>,
}

impl ExecutorRegistry {
  pub fn new(fallback: Arc<dyn NodeExecutor>) -> Self {
    Self {
      by_type: HashMap::new(),
      fallback,
    }
  }

  /// Register an executor for every node type it declares.
  pub fn register(&mut self, executor: Arc<dyn NodeExecutor>) {
    for node_type in executor.node_types() {
      self.by_type.insert(node_type.to_string(), executor.clone());
    }
  }

  pub fn handles(&self, node_type: &str) -> bool {
    self.by_type.contains_key(node_type)
  }

  /// Execute one node: port-map the raw input against the node's definition,
  /// dispatch by type, and fold any executor error into the result map.
  pub async fn dispatch(
    &self,
    node: &NodeDef,
    node_def: &NodeDefinition,
    input: Option<Value>,
    ctx: &RunContext,
  ) -> ValueMap {
    let processed = input.map(|raw| map_input_for_node(raw, node_def));

    let executor = self
      .by_type
      .get(&node.node_type)
      .unwrap_or(&self.fallback)
      .clone();

    debug!(node_id = %node.id, node_type = %node.node_type, "node_dispatch");

    let result = match executor.execute(node, processed, ctx).await {
      Ok(result) => result,
      Err(e) => {
        let mut result = ValueMap::new();
        result.insert(ERROR_PORT.to_string(), Value::Text(error_message(&e)));
        result
      }
    };

    if has_error(&result) {
      error!(
        node_id = %node.id,
        node_type = %node.node_type,
        error = %result.get(ERROR_PORT).map(|v| v.to_display_string()).unwrap_or_default(),
        "node_failed"
      );
    } else {
      info!(node_id = %node.id, node_type = %node.node_type, "node_completed");
    }

    result
  }
}

fn error_message(e: &ExecutorError) -> String {
  e.to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use async_trait::async_trait;

  struct EchoExecutor;

  #[async_trait]
  impl NodeExecutor for EchoExecutor {
    fn node_types(&self) -> &'static [&'static str] {
      &["echo"]
    }

    async fn execute(
      &self,
      _node: &NodeDef,
      input: Option<Value>,
      _ctx: &RunContext,
    ) -> Result<ValueMap, ExecutorError> {
      let mut out = ValueMap::new();
      out.insert(
        "data".to_string(),
        input.unwrap_or(Value::Text("nothing".into())),
      );
      Ok(out)
    }
  }

  struct FailingExecutor;

  #[async_trait]
  impl NodeExecutor for FailingExecutor {
    fn node_types(&self) -> &'static [&'static str] {
      &["boom"]
    }

    async fn execute(
      &self,
      _node: &NodeDef,
      _input: Option<Value>,
      _ctx: &RunContext,
    ) -> Result<ValueMap, ExecutorError> {
      Err(ExecutorError::contract("cannot handle this"))
    }
  }

  struct NamingFallback;

  #[async_trait]
  impl NodeExecutor for NamingFallback {
    fn node_types(&self) -> &'static [&'static str] {
      &["unknown"]
    }

    async fn execute(
      &self,
      node: &NodeDef,
      _input: Option<Value>,
      _ctx: &RunContext,
    ) -> Result<ValueMap, ExecutorError> {
      let mut out = ValueMap::new();
      out.insert("node_type".to_string(), Value::Text(node.node_type.clone()));
      Ok(out)
    }
  }

  fn node(node_type: &str) -> NodeDef {
    serde_json::from_value(serde_json::json!({
      "id": format!("{}-1", node_type),
      "type": node_type,
      "config": {},
    }))
    .unwrap()
  }

  fn registry() -> ExecutorRegistry {
    let mut registry = ExecutorRegistry::new(Arc::new(NamingFallback));
    registry.register(Arc::new(EchoExecutor));
    registry.register(Arc::new(FailingExecutor));
    registry
  }

  #[tokio::test]
  async fn test_dispatch_by_type() {
    let result = registry()
      .dispatch(
        &node("echo"),
        &NodeDefinition::permissive("echo"),
        Some(Value::Text("payload".into())),
        &RunContext::empty(),
      )
      .await;
    assert_eq!(result.get("data").unwrap().as_str(), Some("payload"));
  }

  #[tokio::test]
  async fn test_executor_error_becomes_error_port() {
    let result = registry()
      .dispatch(
        &node("boom"),
        &NodeDefinition::permissive("boom"),
        None,
        &RunContext::empty(),
      )
      .await;
    assert_eq!(
      result.get(ERROR_PORT).unwrap().as_str(),
      Some("cannot handle this")
    );
  }

  #[tokio::test]
  async fn test_unregistered_type_uses_fallback() {
    let result = registry()
      .dispatch(
        &node("mystery"),
        &NodeDefinition::permissive("mystery"),
        None,
        &RunContext::empty(),
      )
      .await;
    assert_eq!(result.get("node_type").unwrap().as_str(), Some("mystery"));
  }
}
