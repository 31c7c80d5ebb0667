use zinnia_config::NodeDefinition;

use crate::value::{Value, ValueMap};

/// Candidate source fields for a named input port, in priority order.
///
/// Returns `None` for ports with no routing convention; callers then try the
/// port's own name and positional fallbacks.
pub fn fallback_fields(port: &str) -> Option<&'static [&'static str]> {
  let fields: &[&str] = match port {
    "text" => &["text", "content", "data", "result", "response"],
    "data" => &["data", "content", "result", "text", "value"],
    "json" => &["json", "parsed_json", "data", "result"],
    "value" => &["value", "data", "result", "content", "text"],
    "url" => &["url", "uri", "link", "address", "path"],
    "condition" => &["result", "data", "content", "text", "value"],
    "image_data" => &["data", "image_data", "image", "url", "file_path"],
    "audio_data" => &["data", "audio_data", "audio", "url", "file_path"],
    "prompt" => &["text", "prompt", "data", "content", "value"],
    "trigger" => &["trigger", "data", "value"],
    _ => return None,
  };
  Some(fields)
}

/// Route an upstream value map onto a node's declared input ports.
///
/// If the map already carries at least one declared port id it is assumed to
/// be port-shaped and passes through untouched. Otherwise each declared port
/// is filled from the first matching candidate field, falling back to the
/// first available value so a single loose upstream output still reaches a
/// single-input node. Non-map inputs and nodes without declared ports pass
/// through unchanged.
pub fn map_input_for_node(input: Value, node_def: &NodeDefinition) -> Value {
  let Value::Map(map) = &input else {
    return input;
  };

  let ports: Vec<&str> = node_def.input_ports().collect();
  if ports.is_empty() {
    return input;
  }

  if ports.iter().any(|port| map.contains_key(*port)) {
    return input;
  }

  let mut mapped = ValueMap::new();
  for port in &ports {
    if let Some(value) = lookup_for_port(map, port) {
      mapped.insert(port.to_string(), value);
    } else if let Some(first) = map.values().next() {
      mapped.insert(port.to_string(), first.clone());
    }
  }

  if mapped.is_empty() { input } else { Value::Map(mapped) }
}

fn lookup_for_port(map: &ValueMap, port: &str) -> Option<Value> {
  if let Some(value) = map.get(port) {
    return Some(value.clone());
  }
  for field in fallback_fields(port)? {
    if let Some(value) = map.get(*field) {
      return Some(value.clone());
    }
  }
  None
}
