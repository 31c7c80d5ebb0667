use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single node in a workflow document.
///
/// `node_type` selects the executor; `config` carries the authored parameter
/// values. Editor-only metadata (positions, labels) is ignored at runtime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
  pub id: String,
  #[serde(rename = "type")]
  pub node_type: String,
  #[serde(default)]
  pub config: HashMap<String, ConfigValue>,
}

/// An authored parameter value, wrapped in a `{ "value": … }` envelope.
///
/// The editor stores every parameter as a string-ish JSON value; the typed
/// accessors on [`NodeDef`] do the coercion executors need.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigValue {
  #[serde(default)]
  pub value: serde_json::Value,
}

impl NodeDef {
  /// String form of a config parameter, if present.
  ///
  /// Numbers and booleans are stringified so `"30"` and `30` read the same.
  pub fn config_str(&self, key: &str) -> Option<String> {
    let value = &self.config.get(key)?.value;
    match value {
      serde_json::Value::Null => None,
      serde_json::Value::String(s) => Some(s.clone()),
      serde_json::Value::Bool(b) => Some(b.to_string()),
      serde_json::Value::Number(n) => Some(n.to_string()),
      other => Some(other.to_string()),
    }
  }

  /// String form of a config parameter, or a default when absent.
  pub fn config_str_or(&self, key: &str, default: &str) -> String {
    self.config_str(key).unwrap_or_else(|| default.to_string())
  }

  /// Boolean config parameter; the editor stores these as `"true"`/`"false"`.
  pub fn config_bool(&self, key: &str, default: bool) -> bool {
    match self.config_str(key) {
      Some(s) => s.eq_ignore_ascii_case("true"),
      None => default,
    }
  }

  /// Numeric config parameter, coerced from string or number form.
  pub fn config_f64(&self, key: &str, default: f64) -> f64 {
    match self.config.get(key).map(|c| &c.value) {
      Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(default),
      Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(default),
      _ => default,
    }
  }

  /// Integer config parameter, coerced from string or number form.
  pub fn config_i64(&self, key: &str, default: i64) -> i64 {
    match self.config.get(key).map(|c| &c.value) {
      Some(serde_json::Value::Number(n)) => {
        n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(default)
      }
      Some(serde_json::Value::String(s)) => s
        .trim()
        .parse::<i64>()
        .or_else(|_| s.trim().parse::<f64>().map(|f| f as i64))
        .unwrap_or(default),
      _ => default,
    }
  }
}
