use async_trait::async_trait;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext};

/// Arithmetic on two operands.
///
/// Operands come from `value_a`/`value_b` (or `number_a`/`number_b`) ports,
/// with the `data` port overriding the first operand, falling back to the
/// configured values. Division and modulo by zero are explicit errors, not
/// NaN/inf results.
pub struct MathExecutor;

#[async_trait]
impl NodeExecutor for MathExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["math"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let operation = node.config_str_or("operation", "add");
    let decimal_places = node.config_i64("decimal_places", 0).max(0) as u32;

    let mut value_a = node.config_f64("value_a", 0.0);
    let mut value_b = node.config_f64("value_b", 0.0);

    if let Some(Value::Map(map)) = &input {
      if let Some(n) = map.get("value_a").or_else(|| map.get("number_a")).and_then(Value::as_f64) {
        value_a = n;
      }
      if let Some(n) = map.get("value_b").or_else(|| map.get("number_b")).and_then(Value::as_f64) {
        value_b = n;
      }
      if let Some(n) = map.get("data").and_then(Value::as_f64) {
        value_a = n;
      }
    }

    let result = match operation.as_str() {
      "add" => value_a + value_b,
      "subtract" => value_a - value_b,
      "multiply" => value_a * value_b,
      "divide" => {
        if value_b == 0.0 {
          return Err(ExecutorError::contract("Division by zero"));
        }
        value_a / value_b
      }
      "modulo" => {
        if value_b == 0.0 {
          return Err(ExecutorError::contract("Modulo by zero"));
        }
        value_a % value_b
      }
      "power" => value_a.powf(value_b),
      "min" => value_a.min(value_b),
      "max" => value_a.max(value_b),
      "abs" => value_a.abs(),
      "round" => value_a.round(),
      "floor" => value_a.floor(),
      "ceil" => value_a.ceil(),
      _ => value_a,
    };

    let scale = 10f64.powi(decimal_places as i32);
    let rounded = (result * scale).round() / scale;

    let formatted = if decimal_places > 0 {
      format!("{:.*}", decimal_places as usize, rounded)
    } else {
      Value::Number(rounded).to_display_string()
    };

    let mut out = ValueMap::new();
    out.insert("result".to_string(), Value::Number(rounded));
    out.insert("data".to_string(), Value::Number(rounded));
    out.insert(
      "text".to_string(),
      Value::Text(Value::Number(rounded).to_display_string()),
    );
    out.insert("formatted".to_string(), Value::Text(formatted));
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn run(config: serde_json::Value, input: Option<Value>) -> Result<ValueMap, ExecutorError> {
    let node: NodeDef = serde_json::from_value(serde_json::json!({
      "id": "m", "type": "math", "config": config,
    }))
    .unwrap();
    MathExecutor.execute(&node, input, &RunContext::empty()).await
  }

  #[tokio::test]
  async fn test_add_from_config() {
    let out = run(
      serde_json::json!({
        "operation": { "value": "add" },
        "value_a": { "value": "1" },
        "value_b": { "value": "1" },
      }),
      None,
    )
    .await
    .unwrap();
    assert_eq!(out.get("result").unwrap(), &Value::Number(2.0));
    assert_eq!(out.get("text").unwrap().as_str(), Some("2"));
  }

  #[tokio::test]
  async fn test_input_ports_override_config() {
    let mut map = ValueMap::new();
    map.insert("value_a".to_string(), Value::Number(10.0));
    map.insert("value_b".to_string(), Value::Text("4".into()));

    let out = run(
      serde_json::json!({ "operation": { "value": "subtract" } }),
      Some(Value::Map(map)),
    )
    .await
    .unwrap();
    assert_eq!(out.get("result").unwrap(), &Value::Number(6.0));
  }

  #[tokio::test]
  async fn test_division_by_zero_is_error() {
    let err = run(
      serde_json::json!({
        "operation": { "value": "divide" },
        "value_a": { "value": "1" },
        "value_b": { "value": "0" },
      }),
      None,
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Division by zero");
  }

  #[tokio::test]
  async fn test_modulo_by_zero_is_error() {
    let err = run(
      serde_json::json!({
        "operation": { "value": "modulo" },
        "value_a": { "value": "5" },
        "value_b": { "value": "0" },
      }),
      None,
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Modulo by zero");
  }

  #[tokio::test]
  async fn test_formatted_has_exact_decimal_places() {
    let out = run(
      serde_json::json!({
        "operation": { "value": "divide" },
        "value_a": { "value": "1" },
        "value_b": { "value": "3" },
        "decimal_places": { "value": "2" },
      }),
      None,
    )
    .await
    .unwrap();
    assert_eq!(out.get("formatted").unwrap().as_str(), Some("0.33"));
    assert_eq!(out.get("result").unwrap(), &Value::Number(0.33));
  }

  #[tokio::test]
  async fn test_integer_formatting_without_decimals() {
    let out = run(
      serde_json::json!({
        "operation": { "value": "multiply" },
        "value_a": { "value": "2" },
        "value_b": { "value": "3" },
      }),
      None,
    )
    .await
    .unwrap();
    assert_eq!(out.get("formatted").unwrap().as_str(), Some("6"));
  }

  #[tokio::test]
  async fn test_unary_operations() {
    let out = run(
      serde_json::json!({
        "operation": { "value": "floor" },
        "value_a": { "value": "2.9" },
      }),
      None,
    )
    .await
    .unwrap();
    assert_eq!(out.get("result").unwrap(), &Value::Number(2.0));
  }
}
