use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext};

/// Timing nodes: `timer` (sleep then trigger), `delay` (sleep then pass the
/// input through), and `repeater` (loop driver — it only reports its config;
/// the execution manager owns the actual cycling and excludes repeaters from
/// the data path).
pub struct TimerExecutor;

impl TimerExecutor {
  async fn execute_timer(&self, node: &NodeDef) -> Result<ValueMap, ExecutorError> {
    let interval_ms = node.config_i64("interval", 0).max(0) as u64;
    debug!(node_id = %node.id, interval_ms, "timer waiting");
    tokio::time::sleep(Duration::from_millis(interval_ms)).await;

    let mut out = ValueMap::new();
    out.insert(
      "trigger".to_string(),
      Value::Number(Utc::now().timestamp_millis() as f64 / 1000.0),
    );
    Ok(out)
  }

  async fn execute_delay(
    &self,
    node: &NodeDef,
    input: Option<Value>,
  ) -> Result<ValueMap, ExecutorError> {
    let delay_ms = node.config_i64("delay_ms", 1000).max(0) as u64;
    debug!(node_id = %node.id, delay_ms, "delay waiting");

    let passthrough = match &input {
      Some(Value::Map(map)) => map
        .get("data")
        .cloned()
        .or_else(|| map.values().next().cloned())
        .unwrap_or(Value::Null),
      Some(other) => other.clone(),
      None => Value::Null,
    };

    tokio::time::sleep(Duration::from_millis(delay_ms)).await;

    let mut out = ValueMap::new();
    out.insert("data".to_string(), passthrough.clone());
    out.insert("original_data".to_string(), passthrough.clone());
    out.insert("processed_data".to_string(), passthrough);
    out.insert("delay_ms".to_string(), Value::Number(delay_ms as f64));
    out.insert(
      "timestamp".to_string(),
      Value::Number(Utc::now().timestamp_millis() as f64),
    );
    Ok(out)
  }

  fn execute_repeater(&self, node: &NodeDef) -> Result<ValueMap, ExecutorError> {
    let interval = node.config_i64("interval", 0);
    let count = node.config_i64("count", 0);

    let mut out = ValueMap::new();
    out.insert(
      "trigger".to_string(),
      Value::Number(Utc::now().timestamp_millis() as f64 / 1000.0),
    );
    out.insert("interval".to_string(), Value::Number(interval as f64));
    out.insert("count".to_string(), Value::Number(count as f64));
    out.insert("iteration".to_string(), Value::Number(1.0));
    Ok(out)
  }
}

#[async_trait]
impl NodeExecutor for TimerExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["timer", "delay", "repeater"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    match node.node_type.as_str() {
      "timer" => self.execute_timer(node).await,
      "delay" => self.execute_delay(node, input).await,
      "repeater" => self.execute_repeater(node),
      other => Err(ExecutorError::contract(format!(
        "unknown timer node type: {}",
        other
      ))),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn node(node_type: &str, config: serde_json::Value) -> NodeDef {
    serde_json::from_value(serde_json::json!({
      "id": "t1", "type": node_type, "config": config,
    }))
    .unwrap()
  }

  #[tokio::test]
  async fn test_timer_returns_epoch_trigger() {
    let out = TimerExecutor
      .execute(
        &node("timer", serde_json::json!({ "interval": { "value": "1" } })),
        None,
        &RunContext::empty(),
      )
      .await
      .unwrap();
    let trigger = out.get("trigger").unwrap().as_f64().unwrap();
    assert!(trigger > 1_600_000_000.0);
  }

  #[tokio::test]
  async fn test_delay_passes_data_through() {
    let mut map = ValueMap::new();
    map.insert("data".to_string(), Value::Text("payload".into()));

    let out = TimerExecutor
      .execute(
        &node("delay", serde_json::json!({ "delay_ms": { "value": "1" } })),
        Some(Value::Map(map)),
        &RunContext::empty(),
      )
      .await
      .unwrap();

    assert_eq!(out.get("data").unwrap().as_str(), Some("payload"));
    assert_eq!(out.get("original_data").unwrap(), out.get("data").unwrap());
    assert_eq!(out.get("delay_ms").unwrap(), &Value::Number(1.0));
  }

  #[tokio::test]
  async fn test_delay_uses_first_input_when_no_data_port() {
    let mut map = ValueMap::new();
    map.insert("anything".to_string(), Value::Number(5.0));

    let out = TimerExecutor
      .execute(
        &node("delay", serde_json::json!({ "delay_ms": { "value": "1" } })),
        Some(Value::Map(map)),
        &RunContext::empty(),
      )
      .await
      .unwrap();
    assert_eq!(out.get("data").unwrap(), &Value::Number(5.0));
  }

  #[tokio::test]
  async fn test_repeater_reports_config() {
    let out = TimerExecutor
      .execute(
        &node(
          "repeater",
          serde_json::json!({ "interval": { "value": "50" }, "count": { "value": "3" } }),
        ),
        None,
        &RunContext::empty(),
      )
      .await
      .unwrap();
    assert_eq!(out.get("interval").unwrap(), &Value::Number(50.0));
    assert_eq!(out.get("count").unwrap(), &Value::Number(3.0));
  }
}
