use async_trait::async_trait;
use tracing::debug;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext, ERROR_PORT};

/// Direct read from the running results map by `(source_node_id,
/// output_port_id)`, with a configured fallback literal when the reference
/// cannot be resolved.
pub struct NodeReferenceExecutor;

#[async_trait]
impl NodeExecutor for NodeReferenceExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["node_reference"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    _input: Option<Value>,
    ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let source_node_id = node.config_str_or("source_node_id", "");
    let output_port_id = node.config_str_or("output_port_id", "");
    let fallback_value = node.config_str("fallback_value");

    if source_node_id.is_empty() {
      return Ok(fallback_result(fallback_value, "No source node selected"));
    }
    if output_port_id.is_empty() {
      return Ok(fallback_result(fallback_value, "No output port selected"));
    }

    let Some(source) = ctx.results.get(&source_node_id) else {
      return Ok(fallback_result(
        fallback_value,
        &format!("No data found for node {}", source_node_id),
      ));
    };

    let referenced = if let Some(value) = source.get(&output_port_id) {
      value.clone()
    } else if source.len() == 1 {
      source.values().next().cloned().unwrap_or(Value::Null)
    } else {
      Value::Map(source.clone())
    };

    if referenced.is_null() {
      return Ok(fallback_result(
        fallback_value,
        &format!(
          "No data found for node {}, port {}",
          source_node_id, output_port_id
        ),
      ));
    }

    debug!(
      node_id = %node.id,
      source = %source_node_id,
      port = %output_port_id,
      "node reference resolved"
    );
    Ok(format_reference(referenced))
  }
}

fn fallback_result(fallback: Option<String>, error: &str) -> ValueMap {
  let value = match fallback {
    Some(s) if !s.is_empty() => Value::Text(s),
    _ => Value::Null,
  };
  let mut out = format_reference(value);
  out.insert(ERROR_PORT.to_string(), Value::Text(error.to_string()));
  out
}

/// Spread a referenced value across the typed output ports.
fn format_reference(value: Value) -> ValueMap {
  let text = match &value {
    Value::Null => String::new(),
    other => other.to_display_string(),
  };
  let number = value.as_f64().unwrap_or(0.0);
  let boolean = value.is_truthy();

  let json = match &value {
    Value::Text(s) => serde_json::from_str(s)
      .map(Value::Json)
      .unwrap_or_else(|_| value.clone()),
    other => other.clone(),
  };

  let binary = match &value {
    Value::Bytes(_) => value.clone(),
    _ => Value::Null,
  };

  let mut out = ValueMap::new();
  out.insert("data".to_string(), value.clone());
  out.insert("text".to_string(), Value::Text(text));
  out.insert("json".to_string(), json);
  out.insert("number".to_string(), Value::Number(number));
  out.insert("boolean".to_string(), Value::Bool(boolean));
  out.insert("binary".to_string(), binary);
  out.insert("original".to_string(), value);
  out
}
