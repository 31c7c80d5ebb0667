use async_trait::async_trait;
use tracing::debug;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext};

/// Value comparison producing a boolean `result`.
///
/// Comparison rules: boolean-shaped operands compare as booleans, operands
/// that both coerce to numbers compare numerically, everything else compares
/// as strings. `case_sensitive` applies to the string predicates and string
/// equality.
pub struct ConditionExecutor;

#[async_trait]
impl NodeExecutor for ConditionExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["condition"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let operator_name = node.config_str_or("operator", "equals");
    let operator = canonical_operator(&operator_name);
    let compare_value = node.config_str_or("compare_value", "");
    let case_sensitive = node.config_bool("case_sensitive", true);

    let value = match &input {
      Some(Value::Map(map)) => map
        .get("value")
        .cloned()
        .or_else(|| {
          ["extracted_value", "data", "response", "text"]
            .iter()
            .find_map(|field| map.get(*field).filter(|v| !v.is_null()).cloned())
        })
        .or_else(|| map.values().find(|v| !v.is_null()).cloned())
        .ok_or_else(|| ExecutorError::contract("No valid input value found"))?,
      Some(other) => other.clone(),
      None => return Err(ExecutorError::contract("No valid input value found")),
    };

    let result = evaluate(&value, &compare_value, operator, case_sensitive);

    debug!(
      node_id = %node.id,
      operator,
      result,
      "condition evaluated"
    );

    let mut out = ValueMap::new();
    out.insert("result".to_string(), Value::Bool(result));
    out.insert("value".to_string(), value);
    out.insert("compare_value".to_string(), Value::Text(compare_value));
    Ok(out)
  }
}

/// Accept both the editor's long operator names and symbol forms.
fn canonical_operator(operator: &str) -> &str {
  match operator {
    "equals" => "==",
    "not_equals" => "!=",
    "greater_than" => ">",
    "less_than" => "<",
    "greater_than_or_equal" => ">=",
    "less_than_or_equal" => "<=",
    other => other,
  }
}

fn evaluate(value: &Value, compare_value: &str, operator: &str, case_sensitive: bool) -> bool {
  match operator {
    // Emptiness is about absence, not falsiness: zero and false are values.
    "is_empty" => value.is_null() || value.to_display_string().trim().is_empty(),
    "is_not_empty" => !value.is_null() && !value.to_display_string().trim().is_empty(),
    "not_contains" => !string_predicate(value, compare_value, case_sensitive, |a, b| a.contains(b)),
    "contains" => string_predicate(value, compare_value, case_sensitive, |a, b| a.contains(b)),
    "starts_with" => {
      string_predicate(value, compare_value, case_sensitive, |a, b| a.starts_with(b))
    }
    "ends_with" => string_predicate(value, compare_value, case_sensitive, |a, b| a.ends_with(b)),
    "==" | "!=" if is_boolean_shaped(value, compare_value) => {
      let value_bool = coerce_bool(value);
      let compare_bool = compare_value.eq_ignore_ascii_case("true");
      if operator == "==" {
        value_bool == compare_bool
      } else {
        value_bool != compare_bool
      }
    }
    "==" | "!=" | ">" | "<" | ">=" | "<=" => {
      match (value.as_f64(), compare_value.trim().parse::<f64>().ok()) {
        (Some(a), Some(b)) => match operator {
          "==" => a == b,
          "!=" => a != b,
          ">" => a > b,
          "<" => a < b,
          ">=" => a >= b,
          "<=" => a <= b,
          _ => unreachable!(),
        },
        _ => {
          let equal = string_predicate(value, compare_value, case_sensitive, |a, b| a == b);
          if operator == "!=" { !equal } else if operator == "==" { equal } else { false }
        }
      }
    }
    _ => string_predicate(value, compare_value, case_sensitive, |a, b| a == b),
  }
}

fn is_boolean_shaped(value: &Value, compare_value: &str) -> bool {
  matches!(value, Value::Bool(_) | Value::Json(serde_json::Value::Bool(_)))
    || compare_value.eq_ignore_ascii_case("true")
    || compare_value.eq_ignore_ascii_case("false")
}

fn coerce_bool(value: &Value) -> bool {
  match value {
    Value::Bool(b) => *b,
    Value::Json(serde_json::Value::Bool(b)) => *b,
    other => other.to_display_string().eq_ignore_ascii_case("true"),
  }
}

fn string_predicate(
  value: &Value,
  compare_value: &str,
  case_sensitive: bool,
  test: impl Fn(&str, &str) -> bool,
) -> bool {
  let a = value.to_display_string();
  if case_sensitive {
    test(&a, compare_value)
  } else {
    test(&a.to_lowercase(), &compare_value.to_lowercase())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  async fn run(operator: &str, compare: &str, value: Value) -> bool {
    run_with(operator, compare, value, true).await
  }

  async fn run_with(operator: &str, compare: &str, value: Value, case_sensitive: bool) -> bool {
    let node: NodeDef = serde_json::from_value(serde_json::json!({
      "id": "c", "type": "condition",
      "config": {
        "operator": { "value": operator },
        "compare_value": { "value": compare },
        "case_sensitive": { "value": case_sensitive.to_string() },
      },
    }))
    .unwrap();

    let mut map = ValueMap::new();
    map.insert("value".to_string(), value);
    let out = ConditionExecutor
      .execute(&node, Some(Value::Map(map)), &RunContext::empty())
      .await
      .unwrap();
    out.get("result").unwrap() == &Value::Bool(true)
  }

  #[tokio::test]
  async fn test_numeric_equality() {
    assert!(run("equals", "3", Value::Number(3.0)).await);
    assert!(!run("equals", "3", Value::Number(2.0)).await);
    assert!(run("equals", "3", Value::Text("3".into())).await);
  }

  #[tokio::test]
  async fn test_numeric_ordering() {
    assert!(run("greater_than", "2", Value::Number(3.0)).await);
    assert!(run("less_than_or_equal", "3", Value::Text("3".into())).await);
    assert!(!run("less_than", "1", Value::Number(5.0)).await);
  }

  #[tokio::test]
  async fn test_boolean_comparison() {
    assert!(run("equals", "true", Value::Bool(true)).await);
    assert!(run("not_equals", "false", Value::Bool(true)).await);
    assert!(run("equals", "TRUE", Value::Text("true".into())).await);
  }

  #[tokio::test]
  async fn test_string_fallback_equality() {
    assert!(run("equals", "abc", Value::Text("abc".into())).await);
    assert!(run("not_equals", "abc", Value::Text("xyz".into())).await);
  }

  #[tokio::test]
  async fn test_contains_honors_case_sensitivity() {
    assert!(!run_with("contains", "WORLD", Value::Text("hello world".into()), true).await);
    assert!(run_with("contains", "WORLD", Value::Text("hello world".into()), false).await);
    assert!(run_with("not_contains", "mars", Value::Text("hello world".into()), false).await);
  }

  #[tokio::test]
  async fn test_starts_and_ends_with() {
    assert!(run("starts_with", "he", Value::Text("hello".into())).await);
    assert!(run("ends_with", "lo", Value::Text("hello".into())).await);
    assert!(!run_with("starts_with", "HE", Value::Text("hello".into()), true).await);
    assert!(run_with("starts_with", "HE", Value::Text("hello".into()), false).await);
  }

  #[tokio::test]
  async fn test_is_empty_boundaries() {
    assert!(run("is_empty", "", Value::Null).await);
    assert!(run("is_empty", "", Value::Text("".into())).await);
    assert!(run("is_empty", "", Value::Text("   ".into())).await);
    assert!(!run("is_empty", "", Value::Number(1.0)).await);
  }

  #[tokio::test]
  async fn test_zero_is_not_empty() {
    assert!(!run("is_empty", "", Value::Number(0.0)).await);
  }

  #[tokio::test]
  async fn test_output_carries_operands() {
    let node: NodeDef = serde_json::from_value(serde_json::json!({
      "id": "c", "type": "condition",
      "config": {
        "operator": { "value": "equals" },
        "compare_value": { "value": "3" },
      },
    }))
    .unwrap();
    let mut map = ValueMap::new();
    map.insert("value".to_string(), Value::Number(2.0));

    let out = ConditionExecutor
      .execute(&node, Some(Value::Map(map)), &RunContext::empty())
      .await
      .unwrap();
    assert_eq!(out.get("result").unwrap(), &Value::Bool(false));
    assert_eq!(out.get("value").unwrap(), &Value::Number(2.0));
    assert_eq!(out.get("compare_value").unwrap().as_str(), Some("3"));
  }
}
