use async_trait::async_trait;
use zinnia_config::NodeDef;
use zinnia_data::{extract_nested, Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext};

/// Array transformations.
///
/// The array arrives on the `array` (else `data`) port; JSON strings are
/// parsed. `field_path` projects into elements for map/filter/join/sort/
/// unique.
pub struct ArrayExecutor;

#[async_trait]
impl NodeExecutor for ArrayExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["array"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let operation = node.config_str_or("operation", "map");
    let field_path = node.config_str_or("field_path", "");
    let filter_value = node.config_str_or("filter_value", "");
    let filter_operator = node.config_str_or("filter_operator", "equals");
    let join_separator = node.config_str_or("join_separator", ", ");
    let slice_start = node.config_i64("slice_start", 0).max(0) as usize;
    let slice_end = node.config_i64("slice_end", 0);

    let source = match &input {
      Some(Value::Map(map)) => map.get("array").or_else(|| map.get("data")).cloned(),
      Some(other) => Some(other.clone()),
      None => None,
    };

    let array: Vec<serde_json::Value> = match source {
      Some(Value::Json(serde_json::Value::Array(items))) => items,
      Some(Value::Text(s)) => match serde_json::from_str(&s) {
        Ok(serde_json::Value::Array(items)) => items,
        _ => return Err(ExecutorError::contract("Invalid array data")),
      },
      _ => return Err(ExecutorError::contract("Input is not an array")),
    };

    let project = |item: &serde_json::Value| -> serde_json::Value {
      if field_path.is_empty() {
        item.clone()
      } else {
        extract_nested(item, &field_path).unwrap_or(serde_json::Value::Null)
      }
    };

    let result: serde_json::Value = match operation.as_str() {
      "map" => serde_json::Value::Array(array.iter().map(|i| project(i)).collect()),
      "filter" => serde_json::Value::Array(
        array
          .iter()
          .filter(|item| filter_matches(&project(item), &filter_value, &filter_operator))
          .cloned()
          .collect(),
      ),
      "length" => serde_json::json!(array.len()),
      "join" => {
        let parts: Vec<String> = array
          .iter()
          .map(|item| {
            let value = project(item);
            match value {
              serde_json::Value::String(s) => s,
              other => other.to_string(),
            }
          })
          .collect();
        serde_json::Value::String(parts.join(&join_separator))
      }
      "first" => array.first().cloned().unwrap_or(serde_json::Value::Null),
      "last" => array.last().cloned().unwrap_or(serde_json::Value::Null),
      "slice" => {
        let end = if slice_end > 0 {
          (slice_end as usize).min(array.len())
        } else {
          array.len()
        };
        let start = slice_start.min(end);
        serde_json::Value::Array(array[start..end].to_vec())
      }
      "reverse" => serde_json::Value::Array(array.iter().rev().cloned().collect()),
      "sort" => {
        let mut sorted = array.clone();
        sorted.sort_by(|a, b| sort_key(&project(a)).cmp(&sort_key(&project(b))));
        serde_json::Value::Array(sorted)
      }
      "unique" => {
        let mut seen = Vec::new();
        let mut result = Vec::new();
        for item in &array {
          let key = project(item).to_string();
          if !seen.contains(&key) {
            seen.push(key);
            result.push(item.clone());
          }
        }
        serde_json::Value::Array(result)
      }
      _ => serde_json::Value::Array(array.clone()),
    };

    let result_len = result
      .as_array()
      .map(|a| a.len())
      .unwrap_or(array.len());

    let mut out = ValueMap::new();
    out.insert("result".to_string(), Value::from_json(result.clone()));
    out.insert("data".to_string(), Value::from_json(result.clone()));
    out.insert(
      "text".to_string(),
      Value::Text(match &result {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
      }),
    );
    out.insert("length".to_string(), Value::Number(result_len as f64));
    out.insert(
      "first".to_string(),
      array
        .first()
        .cloned()
        .map(Value::from_json)
        .unwrap_or(Value::Null),
    );
    out.insert(
      "last".to_string(),
      array
        .last()
        .cloned()
        .map(Value::from_json)
        .unwrap_or(Value::Null),
    );
    Ok(out)
  }
}

/// Sort key: numbers order numerically before strings order lexically.
fn sort_key(value: &serde_json::Value) -> (u8, String) {
  match value {
    serde_json::Value::Number(n) => {
      let v = n.as_f64().unwrap_or(0.0);
      (0, format!("{:020.6}", v))
    }
    serde_json::Value::String(s) => (1, s.clone()),
    serde_json::Value::Null => (2, String::new()),
    other => (1, other.to_string()),
  }
}

fn filter_matches(value: &serde_json::Value, filter_value: &str, operator: &str) -> bool {
  let value_str = match value {
    serde_json::Value::String(s) => s.clone(),
    other => other.to_string(),
  };
  let value_lower = value_str.to_lowercase();
  let filter_lower = filter_value.to_lowercase();

  match operator {
    "equals" => value_str == filter_value,
    "not_equals" => value_str != filter_value,
    "contains" => value_lower.contains(&filter_lower),
    "greater_than" => match (value_str.parse::<f64>(), filter_value.parse::<f64>()) {
      (Ok(a), Ok(b)) => a > b,
      _ => false,
    },
    "less_than" => match (value_str.parse::<f64>(), filter_value.parse::<f64>()) {
      (Ok(a), Ok(b)) => a < b,
      _ => false,
    },
    "starts_with" => value_lower.starts_with(&filter_lower),
    "ends_with" => value_lower.ends_with(&filter_lower),
    _ => true,
  }
}
