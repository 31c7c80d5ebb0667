use async_trait::async_trait;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext};

/// String transformations.
///
/// The primary operand comes from the `text` (else `data`) port; `text_b`
/// may be wired in or configured. `case_sensitive` applies to the search,
/// replace, and predicate operations.
pub struct StringExecutor;

#[async_trait]
impl NodeExecutor for StringExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["string"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let operation = node.config_str_or("operation", "concatenate");
    let separator = node.config_str_or("separator", ",");
    let search_text = node.config_str_or("search_text", "");
    let replace_text = node.config_str_or("replace_text", "");
    let start_index = node.config_i64("start_index", 0).max(0) as usize;
    let end_index = node.config_i64("end_index", 0);
    let repeat_count = node.config_i64("repeat_count", 1);
    let case_sensitive = node.config_bool("case_sensitive", true);

    let mut text_a = String::new();
    let mut text_b = node.config_str_or("text_b", "");

    match &input {
      Some(Value::Map(map)) => {
        if let Some(v) = map.get("text").or_else(|| map.get("data")) {
          text_a = v.to_display_string();
        }
        if let Some(v) = map.get("text_b") {
          text_b = v.to_display_string();
        }
      }
      Some(other) => text_a = other.to_display_string(),
      None => {}
    }

    let result: StringResult = match operation.as_str() {
      "concatenate" => StringResult::Text(format!("{}{}", text_a, text_b)),
      "split" => StringResult::List(
        text_a
          .split(separator.as_str())
          .map(|part| serde_json::Value::String(part.to_string()))
          .collect(),
      ),
      "replace" => {
        if case_sensitive {
          StringResult::Text(text_a.replace(&search_text, &replace_text))
        } else {
          StringResult::Text(replace_insensitive(&text_a, &search_text, &replace_text))
        }
      }
      "trim" => StringResult::Text(text_a.trim().to_string()),
      "uppercase" => StringResult::Text(text_a.to_uppercase()),
      "lowercase" => StringResult::Text(text_a.to_lowercase()),
      "substring" => {
        let chars: Vec<char> = text_a.chars().collect();
        let end = if end_index > 0 {
          (end_index as usize).min(chars.len())
        } else {
          chars.len()
        };
        let start = start_index.min(end);
        StringResult::Text(chars[start..end].iter().collect())
      }
      "regex_match" => {
        let re = build_regex(&search_text, case_sensitive)?;
        StringResult::List(
          re.find_iter(&text_a)
            .map(|m| serde_json::Value::String(m.as_str().to_string()))
            .collect(),
        )
      }
      "regex_replace" => {
        let re = build_regex(&search_text, case_sensitive)?;
        StringResult::Text(re.replace_all(&text_a, replace_text.as_str()).into_owned())
      }
      "starts_with" => StringResult::Flag(predicate(
        &text_a,
        &search_text,
        case_sensitive,
        |a, b| a.starts_with(b),
      )),
      "ends_with" => StringResult::Flag(predicate(
        &text_a,
        &search_text,
        case_sensitive,
        |a, b| a.ends_with(b),
      )),
      "contains" => StringResult::Flag(predicate(
        &text_a,
        &search_text,
        case_sensitive,
        |a, b| a.contains(b),
      )),
      "repeat" => {
        let count = repeat_count.clamp(0, 100) as usize;
        StringResult::Text(text_a.repeat(count))
      }
      "last_line" => StringResult::Text(
        text_a
          .lines()
          .rev()
          .find(|line| !line.trim().is_empty())
          .unwrap_or("")
          .to_string(),
      ),
      _ => StringResult::Text(text_a.clone()),
    };

    let mut out = ValueMap::new();
    let (result_value, data_value, array_value, length) = match result {
      StringResult::Text(s) => {
        let len = s.chars().count();
        (
          Value::Text(s.clone()),
          Value::Text(s),
          Value::Null,
          len,
        )
      }
      StringResult::Flag(b) => (
        Value::Text(b.to_string()),
        Value::Bool(b),
        Value::Null,
        b.to_string().len(),
      ),
      StringResult::List(items) => {
        let json = serde_json::Value::Array(items);
        let rendered = json.to_string();
        (
          Value::Json(json.clone()),
          Value::Json(json.clone()),
          Value::Json(json),
          rendered.len(),
        )
      }
    };

    let word_count = data_value
      .to_display_string()
      .split_whitespace()
      .count();

    out.insert("result".to_string(), result_value);
    out.insert("data".to_string(), data_value);
    out.insert("array".to_string(), array_value);
    out.insert("length".to_string(), Value::Number(length as f64));
    out.insert("word_count".to_string(), Value::Number(word_count as f64));
    Ok(out)
  }
}

enum StringResult {
  Text(String),
  Flag(bool),
  List(Vec<serde_json::Value>),
}

fn build_regex(pattern: &str, case_sensitive: bool) -> Result<regex::Regex, ExecutorError> {
  regex::RegexBuilder::new(pattern)
    .case_insensitive(!case_sensitive)
    .build()
    .map_err(|e| ExecutorError::contract(format!("invalid regex pattern: {}", e)))
}

fn predicate(a: &str, b: &str, case_sensitive: bool, test: impl Fn(&str, &str) -> bool) -> bool {
  if case_sensitive {
    test(a, b)
  } else {
    test(&a.to_lowercase(), &b.to_lowercase())
  }
}

/// Case-insensitive literal replace.
fn replace_insensitive(text: &str, search: &str, replacement: &str) -> String {
  if search.is_empty() {
    return text.to_string();
  }

  let lower_text = text.to_lowercase();
  let lower_search = search.to_lowercase();
  let mut out = String::with_capacity(text.len());
  let mut cursor = 0;

  while let Some(found) = lower_text[cursor..].find(&lower_search) {
    let at = cursor + found;
    out.push_str(&text[cursor..at]);
    out.push_str(replacement);
    cursor = at + search.len();
  }
  out.push_str(&text[cursor..]);
  out
}
