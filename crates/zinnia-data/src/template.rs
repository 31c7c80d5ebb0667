use chrono::Local;

use crate::value::Value;

/// Replace clock placeholders: `{{DATE}}` (YYYY-MM-DD), `{{DATETIME}}`
/// (YYYY-MM-DD_HH-MM-SS), `{{TIMESTAMP}}` (epoch seconds).
pub fn replace_time_placeholders(text: &str) -> String {
  let mut out = text.to_string();
  let now = Local::now();

  if out.contains("{{DATE}}") {
    out = out.replace("{{DATE}}", &now.format("%Y-%m-%d").to_string());
  }
  if out.contains("{{DATETIME}}") {
    out = out.replace("{{DATETIME}}", &now.format("%Y-%m-%d_%H-%M-%S").to_string());
  }
  if out.contains("{{TIMESTAMP}}") {
    out = out.replace("{{TIMESTAMP}}", &now.timestamp().to_string());
  }

  out
}

/// Replace `{{<field>}}` references against an input value.
///
/// For map inputs every present field is substitutable; the generic
/// `{{data}}` placeholder prefers the `data`, `result`, then `text` fields and
/// finally the first available value. Non-map inputs substitute `{{data}}`
/// with their string form.
pub fn replace_input_placeholders(text: &str, input: &Value) -> String {
  let mut out = text.to_string();

  match input {
    Value::Map(map) => {
      for (key, value) in map {
        let placeholder = format!("{{{{{}}}}}", key);
        if out.contains(&placeholder) {
          out = out.replace(&placeholder, &value.to_display_string());
        }
      }

      if out.contains("{{data}}") {
        let replacement = map
          .get("data")
          .or_else(|| map.get("result"))
          .or_else(|| map.get("text"))
          .or_else(|| map.values().next())
          .map(|v| v.to_display_string())
          .unwrap_or_default();
        out = out.replace("{{data}}", &replacement);
      }
    }
    Value::Null => {}
    other => {
      if out.contains("{{data}}") {
        out = out.replace("{{data}}", &other.to_display_string());
      }
    }
  }

  out
}

/// Replace loop-scope placeholders while a node runs inside an iteration:
/// `{{current_item}}` and `{{current_index}}`.
pub fn replace_iteration_placeholders(text: &str, item: &Value, index: usize) -> String {
  let mut out = text.to_string();
  if out.contains("{{current_item}}") {
    out = out.replace("{{current_item}}", &item.to_display_string());
  }
  if out.contains("{{current_index}}") {
    out = out.replace("{{current_index}}", &index.to_string());
  }
  out
}
