use async_trait::async_trait;
use rand::Rng;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext, ERROR_PORT};

/// Random number source within a configured range.
///
/// An invalid range degrades gracefully: the error rides alongside zeroed
/// outputs so wired-up downstream ports still receive values.
pub struct RandomExecutor;

#[async_trait]
impl NodeExecutor for RandomExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["random"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    _input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let min_value = node.config_f64("min_value", 0.0);
    let max_value = node.config_f64("max_value", 1.0);
    let decimal_places = node.config_i64("decimal_places", 0).max(0) as u32;
    let output_type = node.config_str_or("output_type", "float");

    if min_value >= max_value {
      let mut out = ValueMap::new();
      out.insert("number".to_string(), Value::Number(0.0));
      out.insert("text".to_string(), Value::Text("0".to_string()));
      out.insert("data".to_string(), Value::Text("0".to_string()));
      out.insert("integer".to_string(), Value::Number(0.0));
      out.insert("float".to_string(), Value::Number(0.0));
      out.insert(
        ERROR_PORT.to_string(),
        Value::Text("Invalid range: minimum must be less than maximum".to_string()),
      );
      return Ok(out);
    }

    let raw: f64 = rand::thread_rng().gen_range(min_value..max_value);
    let value = if output_type == "integer" || decimal_places == 0 {
      raw.round()
    } else {
      let scale = 10f64.powi(decimal_places as i32);
      (raw * scale).round() / scale
    };

    let text = Value::Number(value).to_display_string();

    let mut out = ValueMap::new();
    out.insert("number".to_string(), Value::Number(value));
    out.insert("text".to_string(), Value::Text(text.clone()));
    out.insert("data".to_string(), Value::Text(text));
    out.insert("integer".to_string(), Value::Number(value.round()));
    out.insert("float".to_string(), Value::Number(value));
    Ok(out)
  }
}
