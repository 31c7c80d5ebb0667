use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::{debug, warn};
use zinnia_client::{split_path, VfsClient};
use zinnia_config::NodeDef;
use zinnia_data::{
  normalize_for_vfs, replace_input_placeholders, replace_iteration_placeholders,
  replace_time_placeholders, Value, ValueMap, VfsFormat,
};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext};

/// Depth cap for the loose-data search inside structured inputs.
const EXTRACT_MAX_DEPTH: usize = 3;

/// VFS file load and save.
///
/// Loads pick a wire route by format: `json`/`text`/`blob` read the content
/// envelope, `binary` downloads raw bytes. Saves check existence via the
/// info endpoint, emulate overwrite and append as delete-then-create, and
/// route binary data through the multipart upload endpoint.
pub struct VfsExecutor {
  vfs: Arc<VfsClient>,
}

impl VfsExecutor {
  pub fn new(vfs: Arc<VfsClient>) -> Self {
    Self { vfs }
  }

  async fn execute_load(&self, node: &NodeDef) -> Result<ValueMap, ExecutorError> {
    let file_path = replace_time_placeholders(&node.config_str_or("file_path", ""));
    let format = node.config_str_or("format", "text");

    debug!(node_id = %node.id, file_path = %file_path, format = %format, "vfs load");

    let mut out = ValueMap::new();
    match format.as_str() {
      "json" => {
        let content = self.vfs.read(&file_path).await?;
        let parsed: serde_json::Value =
          serde_json::from_str(&content).map_err(|e| {
            ExecutorError::contract(format!("failed to parse JSON content: {}", e))
          })?;
        out.insert("data".to_string(), Value::from_json(parsed.clone()));
        out.insert("file_path".to_string(), Value::Text(file_path));
        out.insert("json_data".to_string(), Value::from_json(parsed));
      }
      "text" | "blob" => {
        let content = self.vfs.read(&file_path).await?;
        out.insert("data".to_string(), Value::Text(content));
        out.insert("file_path".to_string(), Value::Text(file_path));
        out.insert("json_data".to_string(), Value::Null);
      }
      "binary" => {
        let bytes = self.vfs.download(&file_path).await?;
        out.insert("data".to_string(), Value::Bytes(bytes));
        out.insert("file_path".to_string(), Value::Text(file_path));
        out.insert("json_data".to_string(), Value::Null);
      }
      other => {
        return Err(ExecutorError::contract(format!(
          "unknown format: {}. Supported formats are: json, text, blob, binary",
          other
        )));
      }
    }

    Ok(out)
  }

  async fn execute_save(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let raw_path = node.config_str_or("file_path", "");
    let mut file_path = replace_time_placeholders(&raw_path);
    if let Some(value) = &input {
      file_path = replace_input_placeholders(&file_path, value);
    }
    if let Some(scope) = &ctx.iteration {
      file_path = replace_iteration_placeholders(&file_path, &scope.item, scope.index);
    }

    let format = node.config_str_or("format", "auto");
    let format = VfsFormat::parse(&format).ok_or_else(|| {
      ExecutorError::contract(format!(
        "unknown format: {}. Supported formats are: json, text, binary, blob",
        format
      ))
    })?;
    let overwrite = node.config_bool("overwrite", false);
    let append = node.config_bool("append", false);

    if append && matches!(format, VfsFormat::Binary | VfsFormat::Blob) {
      return Err(ExecutorError::contract(format!(
        "append is not supported for {} format",
        format.as_str()
      )));
    }

    debug!(
      node_id = %node.id,
      file_path = %file_path,
      format = format.as_str(),
      overwrite,
      append,
      "vfs save"
    );

    let data = extract_save_payload(input.as_ref(), ctx);
    let Some(data) = data else {
      return Err(ExecutorError::contract("no data available to save"));
    };

    // A failed existence check reads as "new file".
    let file_exists = self.vfs.exists(&file_path).await.unwrap_or(false);
    if file_exists {
      if !overwrite && !append {
        return Err(ExecutorError::contract(format!(
          "File exists and neither overwrite nor append is enabled: {}",
          file_path
        )));
      }
      if overwrite && !append {
        self.vfs.delete(&file_path).await?;
      }
    }

    let (parent, name) = split_path(&file_path);

    match format {
      VfsFormat::Binary => {
        let Value::Bytes(bytes) = &data else {
          return Err(ExecutorError::contract(
            "Binary format requires bytes data for raw binary. Use blob format for other data types.",
          ));
        };
        self.vfs.upload_file(&parent, &name, bytes.clone()).await?;
      }
      VfsFormat::Blob => {
        let blob = match &data {
          Value::Text(s) => s.clone(),
          Value::Bytes(b) => format!(
            "data:application/octet-stream;base64,{}",
            BASE64.encode(b)
          ),
          other => {
            return Err(ExecutorError::contract(format!(
              "Blob format requires a data URL string or bytes, received: {}",
              kind_of(other)
            )));
          }
        };
        self.vfs.create_file(&parent, &name, &blob).await?;
      }
      _ => {
        let content = if append && !overwrite && file_exists {
          self.append_content(&file_path, &data, format).await?
        } else {
          render_content(&data, format)?
        };
        if append && !overwrite && file_exists {
          self.vfs.delete(&file_path).await?;
        }
        self.vfs.create_file(&parent, &name, &content).await?;
      }
    }

    let mut out = ValueMap::new();
    out.insert("success".to_string(), Value::Bool(true));
    out.insert("file_path".to_string(), Value::Text(file_path));
    Ok(out)
  }

  /// Merge new data into the existing file's content for append mode.
  ///
  /// Text concatenates with a newline. JSON pushes onto an existing array, or
  /// wraps scalar-plus-new into a two-element array.
  async fn append_content(
    &self,
    file_path: &str,
    data: &Value,
    format: VfsFormat,
  ) -> Result<String, ExecutorError> {
    let existing = match self.vfs.read(file_path).await {
      Ok(content) => content,
      Err(e) => {
        warn!(file_path, error = %e, "could not read existing file for append");
        String::new()
      }
    };

    match format {
      VfsFormat::Json => {
        let addition = json_payload(data);
        let merged = if existing.trim().is_empty() {
          serde_json::Value::Array(vec![addition])
        } else {
          match serde_json::from_str::<serde_json::Value>(&existing) {
            Ok(serde_json::Value::Array(mut items)) => {
              items.push(addition);
              serde_json::Value::Array(items)
            }
            Ok(scalar) => serde_json::Value::Array(vec![scalar, addition]),
            Err(_) => serde_json::Value::Array(vec![addition]),
          }
        };
        serde_json::to_string_pretty(&merged)
          .map_err(|e| ExecutorError::contract(e.to_string()))
      }
      _ => {
        let addition = data.to_display_string();
        if existing.is_empty() {
          Ok(addition)
        } else {
          Ok(format!("{}\n{}", existing, addition))
        }
      }
    }
  }
}

#[async_trait]
impl NodeExecutor for VfsExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["vfs_load", "vfs_save"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    match node.node_type.as_str() {
      "vfs_load" => self.execute_load(node).await,
      "vfs_save" => self.execute_save(node, input, ctx).await,
      other => Err(ExecutorError::contract(format!(
        "unknown vfs node type: {}",
        other
      ))),
    }
  }
}

/// Render non-append content for text/json saves.
fn render_content(data: &Value, format: VfsFormat) -> Result<String, ExecutorError> {
  match format {
    VfsFormat::Json => {
      if let Value::Text(s) = data {
        return Ok(s.clone());
      }
      serde_json::to_string_pretty(&json_payload(data))
        .map_err(|e| ExecutorError::contract(e.to_string()))
    }
    VfsFormat::Text => match data {
      Value::Text(s) => Ok(s.clone()),
      other => Err(ExecutorError::contract(format!(
        "Text format requires string data, received: {}. Use JSON format for objects.",
        kind_of(other)
      ))),
    },
    VfsFormat::Auto => {
      let (bytes, detected) = normalize_for_vfs(data, VfsFormat::Auto);
      match detected {
        VfsFormat::Binary => Err(ExecutorError::contract(
          "binary data needs an explicit binary format",
        )),
        _ => Ok(String::from_utf8_lossy(&bytes).into_owned()),
      }
    }
    _ => unreachable!("binary and blob are handled by the caller"),
  }
}

fn json_payload(data: &Value) -> serde_json::Value {
  match data {
    Value::Text(s) => {
      serde_json::from_str(s).unwrap_or(serde_json::Value::String(s.clone()))
    }
    other => other.to_json(),
  }
}

fn kind_of(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::Text(_) => "string",
    Value::Bytes(_) => "bytes",
    Value::Json(_) => "json",
    Value::Map(_) => "map",
  }
}

/// Pick the payload to save from a structured input.
///
/// The `data` port wins; otherwise a bounded recursive search over common
/// payload fields, then the parent node's result map as a last resort.
fn extract_save_payload(input: Option<&Value>, ctx: &RunContext) -> Option<Value> {
  let input = input?;

  if let Value::Map(map) = input {
    if let Some(data) = map.get("data") {
      if !data.is_null() {
        return Some(data.clone());
      }
    }
    if let Some(found) = search_payload(input, 0) {
      return Some(found);
    }
    if let Some(parent_id) = &ctx.parent_node_id {
      if let Some(parent_result) = ctx.results.get(parent_id) {
        let parent_value = Value::Map(parent_result.clone());
        if let Some(found) = search_payload(&parent_value, 0) {
          return Some(found);
        }
      }
    }
    return Some(input.clone());
  }

  if input.is_null() {
    None
  } else {
    Some(input.clone())
  }
}

fn search_payload(value: &Value, depth: usize) -> Option<Value> {
  if depth > EXTRACT_MAX_DEPTH {
    return None;
  }

  match value {
    Value::Bytes(_) => Some(value.clone()),
    Value::Text(s) if !s.is_empty() => Some(value.clone()),
    Value::Json(v) if !v.is_null() => Some(value.clone()),
    Value::Number(_) | Value::Bool(_) => Some(value.clone()),
    Value::Map(map) => {
      for field in ["data", "content", "image_data", "file_data", "binary_data", "text"] {
        if let Some(inner) = map.get(field) {
          if let Some(found) = search_payload(inner, depth + 1) {
            return Some(found);
          }
        }
      }
      for inner in map.values() {
        if let Some(found) = search_payload(inner, depth + 1) {
          return Some(found);
        }
      }
      None
    }
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bytes::Bytes;

  #[test]
  fn test_payload_prefers_data_port() {
    let mut map = ValueMap::new();
    map.insert("other".to_string(), Value::Text("no".into()));
    map.insert("data".to_string(), Value::Text("yes".into()));

    let found = extract_save_payload(Some(&Value::Map(map)), &RunContext::empty());
    assert_eq!(found.unwrap().as_str(), Some("yes"));
  }

  #[test]
  fn test_payload_recursive_search() {
    let mut inner = ValueMap::new();
    inner.insert("binary_data".to_string(), Value::Bytes(Bytes::from_static(b"\x01\x02")));
    let mut map = ValueMap::new();
    map.insert("trigger".to_string(), Value::Map(inner));

    let found = extract_save_payload(Some(&Value::Map(map)), &RunContext::empty()).unwrap();
    assert_eq!(found.as_bytes().unwrap().to_vec(), vec![1, 2]);
  }

  #[test]
  fn test_payload_none_for_null_input() {
    assert!(extract_save_payload(Some(&Value::Null), &RunContext::empty()).is_none());
    assert!(extract_save_payload(None, &RunContext::empty()).is_none());
  }

  #[test]
  fn test_render_text_rejects_non_string() {
    let err = render_content(&Value::Json(serde_json::json!({"a": 1})), VfsFormat::Text)
      .unwrap_err();
    assert!(err.to_string().contains("Text format requires string data"));
  }

  #[test]
  fn test_render_json_keeps_raw_strings() {
    let rendered = render_content(&Value::Text("already json".into()), VfsFormat::Json).unwrap();
    assert_eq!(rendered, "already json");
  }

  #[test]
  fn test_render_json_pretty_prints_objects() {
    let rendered =
      render_content(&Value::Json(serde_json::json!({"a": 1})), VfsFormat::Json).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(parsed, serde_json::json!({"a": 1}));
  }
}
