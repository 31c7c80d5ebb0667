use async_trait::async_trait;
use tracing::debug;
use zinnia_config::NodeDef;
use zinnia_data::{extract_nested, Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext};

/// Dotted-path extraction out of JSON input.
///
/// Input may arrive on `json`, `parsed_json`, `text`, or `data`; strings are
/// parsed first. `display_format` shapes the `text`/`data`/`extracted_value`
/// outputs, but `json` always carries the raw extracted value.
pub struct JsonExtractExecutor;

#[async_trait]
impl NodeExecutor for JsonExtractExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["json_extract"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let field_path = node.config_str_or("field_path", "");
    let display_format = node.config_str_or("display_format", "text");

    let source = match &input {
      Some(Value::Map(map)) => ["json", "parsed_json", "text", "data"]
        .iter()
        .find_map(|port| map.get(*port))
        .cloned()
        .unwrap_or_else(|| input.clone().unwrap()),
      Some(other) => other.clone(),
      None => {
        return Err(ExecutorError::contract("json_extract received no input"));
      }
    };

    let json_data = match &source {
      Value::Json(v) => v.clone(),
      Value::Map(m) => Value::Map(m.clone()).to_json(),
      Value::Text(s) => match serde_json::from_str::<serde_json::Value>(s) {
        Ok(parsed) => parsed,
        Err(_) => {
          if s.starts_with('/') {
            return Err(ExecutorError::contract(format!(
              "JSON path \"{}\" appears to be a file path, not JSON data",
              s
            )));
          }
          let preview: String = s.chars().take(100).collect();
          return Err(ExecutorError::contract(format!(
            "Invalid JSON data: {}",
            preview
          )));
        }
      },
      other => other.to_json(),
    };

    let value = extract_nested(&json_data, &field_path).ok_or_else(|| {
      ExecutorError::contract(format!("Field path \"{}\" not found", field_path))
    })?;

    debug!(node_id = %node.id, field_path = %field_path, "extracted value");

    let formatted = match display_format.as_str() {
      "json" => serde_json::to_string_pretty(&value).unwrap_or_default(),
      _ => match &value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
      },
    };

    let mut out = ValueMap::new();
    out.insert("data".to_string(), Value::Text(formatted.clone()));
    out.insert("text".to_string(), Value::Text(formatted.clone()));
    out.insert("json".to_string(), Value::Json(value));
    out.insert("extracted_value".to_string(), Value::Text(formatted));
    out.insert("field_path".to_string(), Value::Text(field_path));
    out.insert("original".to_string(), Value::Json(json_data));
    Ok(out)
  }
}
