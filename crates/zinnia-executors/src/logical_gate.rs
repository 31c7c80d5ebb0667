use async_trait::async_trait;
use tracing::debug;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext, STOP_EXECUTION_PORT};

/// Conditional flow control.
///
/// A true condition passes the input through on `trigger`; a false condition
/// emits the stop signal that terminates the enclosing scheduler loop.
pub struct LogicalGateExecutor;

#[async_trait]
impl NodeExecutor for LogicalGateExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["logical_gate"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let invert = node.config_bool("invert", false);

    let mut condition = match &input {
      Some(Value::Map(map)) => {
        if let Some(value) = map.get("condition") {
          value.is_truthy()
        } else if let Some(value) = map.get("value") {
          value.is_truthy()
        } else if let Some(value) = ["result", "data", "response", "text"]
          .iter()
          .find_map(|field| map.get(*field).filter(|v| !v.is_null()))
        {
          value.is_truthy()
        } else {
          map.values().any(|v| !v.is_null())
        }
      }
      Some(other) => other.is_truthy(),
      None => false,
    };

    if invert {
      condition = !condition;
    }

    debug!(node_id = %node.id, condition, invert, "logical gate");

    let mut out = ValueMap::new();
    if condition {
      out.insert(
        "trigger".to_string(),
        input.unwrap_or(Value::Bool(true)),
      );
    } else {
      out.insert(STOP_EXECUTION_PORT.to_string(), Value::Bool(true));
    }
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use zinnia_node::is_stop_signal;

  fn node(invert: bool) -> NodeDef {
    serde_json::from_value(serde_json::json!({
      "id": "gate", "type": "logical_gate",
      "config": { "invert": { "value": invert.to_string() } },
    }))
    .unwrap()
  }

  fn input_on(port: &str, value: Value) -> Option<Value> {
    let mut map = ValueMap::new();
    map.insert(port.to_string(), value);
    Some(Value::Map(map))
  }

  #[tokio::test]
  async fn test_true_condition_passes_input_through() {
    let out = LogicalGateExecutor
      .execute(
        &node(false),
        input_on("condition", Value::Bool(true)),
        &RunContext::empty(),
      )
      .await
      .unwrap();

    assert!(!is_stop_signal(&out));
    assert!(out.get("trigger").is_some());
  }

  #[tokio::test]
  async fn test_false_condition_emits_stop_signal() {
    let out = LogicalGateExecutor
      .execute(
        &node(false),
        input_on("condition", Value::Bool(false)),
        &RunContext::empty(),
      )
      .await
      .unwrap();
    assert!(is_stop_signal(&out));
  }

  #[tokio::test]
  async fn test_invert_flips_the_gate() {
    let out = LogicalGateExecutor
      .execute(
        &node(true),
        input_on("condition", Value::Bool(false)),
        &RunContext::empty(),
      )
      .await
      .unwrap();
    assert!(!is_stop_signal(&out));
  }

  #[tokio::test]
  async fn test_value_port_truthiness() {
    let truthy = LogicalGateExecutor
      .execute(
        &node(false),
        input_on("value", Value::Text("yes".into())),
        &RunContext::empty(),
      )
      .await
      .unwrap();
    assert!(!is_stop_signal(&truthy));

    let falsy = LogicalGateExecutor
      .execute(
        &node(false),
        input_on("value", Value::Text("".into())),
        &RunContext::empty(),
      )
      .await
      .unwrap();
    assert!(is_stop_signal(&falsy));
  }

  #[tokio::test]
  async fn test_result_field_drives_condition() {
    let out = LogicalGateExecutor
      .execute(
        &node(false),
        input_on("result", Value::Bool(false)),
        &RunContext::empty(),
      )
      .await
      .unwrap();
    assert!(is_stop_signal(&out));
  }
}
