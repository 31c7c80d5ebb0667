use async_trait::async_trait;
use tracing::debug;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext, FOR_EACH_CONTROL_PORT};

/// Loop driver over an array input.
///
/// The executor itself does no iteration; it validates the array and returns
/// the loop-control marker the execution manager expands. The array may
/// arrive on `array`, `data`, `file_names`, or `items`.
pub struct ForEachExecutor;

#[async_trait]
impl NodeExecutor for ForEachExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["for_each"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let stop_on_error = node.config_bool("stop_on_error", true);
    let iteration_delay_ms = node.config_i64("iteration_delay", 0).max(0) as u64;

    let array = input.as_ref().and_then(Value::as_map).and_then(|map| {
      ["array", "data", "file_names", "items"]
        .iter()
        .find_map(|port| map.get(*port).and_then(coerce_array))
    });

    let Some(items) = array else {
      return Err(ExecutorError::contract(
        "for_each node requires an array input",
      ));
    };

    debug!(
      node_id = %node.id,
      items = items.len(),
      stop_on_error,
      iteration_delay_ms,
      "for_each control"
    );

    let mut out = ValueMap::new();
    out.insert(FOR_EACH_CONTROL_PORT.to_string(), Value::Bool(true));
    out.insert(
      "array_data".to_string(),
      Value::Json(serde_json::Value::Array(items.clone())),
    );
    out.insert("stop_on_error".to_string(), Value::Bool(stop_on_error));
    out.insert(
      "iteration_delay".to_string(),
      Value::Number(iteration_delay_ms as f64),
    );
    out.insert("node_id".to_string(), Value::Text(node.id.clone()));
    out.insert("total_items".to_string(), Value::Number(items.len() as f64));

    Ok(out)
  }
}

/// Accept a JSON array directly, or a string that parses to one.
fn coerce_array(value: &Value) -> Option<Vec<serde_json::Value>> {
  match value {
    Value::Json(serde_json::Value::Array(items)) => Some(items.clone()),
    Value::Text(s) => match serde_json::from_str(s) {
      Ok(serde_json::Value::Array(items)) => Some(items),
      _ => None,
    },
    _ => None,
  }
}
