use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};
use zinnia_node::{DefinitionStore, ExecutorError, NodeExecutor, RunContext};

/// Fallback for unregistered node types.
///
/// Synthesizes plausible defaults from the node definition's declared output
/// ports so downstream nodes still receive something shaped right, and tags
/// the result with the node's identity.
pub struct UnknownExecutor {
  definitions: Arc<DefinitionStore>,
}

impl UnknownExecutor {
  pub fn new(definitions: Arc<DefinitionStore>) -> Self {
    Self { definitions }
  }
}

#[async_trait]
impl NodeExecutor for UnknownExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["unknown"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    warn!(node_id = %node.id, node_type = %node.node_type, "executing unknown node type");

    let definition = self.definitions.get(&node.node_type).await;

    let mut out = ValueMap::new();
    for port in &definition.outputs {
      let value = match port.port_type.as_str() {
        "text" => Value::Text(format!("Processed {} output", node.node_type)),
        "json" => Value::Json(serde_json::json!({
          "node_type": node.node_type,
          "processed": true,
        })),
        "number" => Value::Number(1.0),
        "boolean" => Value::Bool(true),
        "binary" => Value::Bytes(Bytes::from_static(b"default_binary_data")),
        _ => Value::Text(format!("Default {} data", node.node_type)),
      };
      out.insert(port.id.clone(), value);
    }

    if let Some(input) = input {
      out.insert("input_data".to_string(), input);
    }
    out.insert("node_type".to_string(), Value::Text(node.node_type.clone()));
    out.insert("node_id".to_string(), Value::Text(node.id.clone()));
    out.insert("processed".to_string(), Value::Bool(true));
    Ok(out)
  }
}
