use std::collections::HashMap;

use tracing::debug;
use zinnia_data::{fallback_fields, Value, ValueMap};
use zinnia_workflow::Graph;

/// An assembled input bundle: the per-port values plus the upstream node the
/// last satisfied edge came from.
#[derive(Debug)]
pub(crate) struct AssembledInput {
  pub input: Option<Value>,
  pub parent_node_id: Option<String>,
}

/// Per-port input assembly failure: some required port had no satisfying
/// source field at all.
#[derive(Debug)]
pub(crate) struct MissingInputs {
  pub ports: Vec<String>,
}

impl MissingInputs {
  pub fn message(&self, node_id: &str) -> String {
    format!(
      "Node {} missing required inputs on ports: {:?}",
      node_id, self.ports
    )
  }
}

/// Build the `port -> value` bundle for a node from completed results.
///
/// Edges resolve in authored order; multiple edges into one port overwrite
/// (last-write-wins). Per edge, the exact source port is preferred, then the
/// port's fallback fields, then the whole source result map.
pub(crate) fn assemble_input(
  node_id: &str,
  graph: &Graph,
  results: &HashMap<String, ValueMap>,
) -> Result<AssembledInput, MissingInputs> {
  let edges: Vec<_> = graph.incoming(node_id).collect();
  if edges.is_empty() {
    return Ok(AssembledInput {
      input: None,
      parent_node_id: None,
    });
  }

  let mut received = ValueMap::new();
  let mut parent_node_id = None;

  for edge in &edges {
    let Some(source) = results.get(&edge.from.node_id) else {
      continue;
    };
    parent_node_id = Some(edge.from.node_id.clone());

    let value = if let Some(value) = source.get(&edge.from.port_name) {
      value.clone()
    } else if let Some(value) = fallback_lookup(source, &edge.from.port_name) {
      value
    } else {
      debug!(
        node_id,
        source = %edge.from.node_id,
        port = %edge.from.port_name,
        "no matching field, passing whole result"
      );
      Value::Map(source.clone())
    };

    received.insert(edge.to.port_name.clone(), value);
  }

  let missing: Vec<String> = graph
    .required_ports(node_id)
    .into_iter()
    .filter(|port| !received.contains_key(*port))
    .map(|port| port.to_string())
    .collect();

  if !missing.is_empty() {
    return Err(MissingInputs { ports: missing });
  }

  Ok(AssembledInput {
    input: Some(Value::Map(received)),
    parent_node_id,
  })
}

fn fallback_lookup(source: &ValueMap, port: &str) -> Option<Value> {
  for field in fallback_fields(port)? {
    if let Some(value) = source.get(*field) {
      return Some(value.clone());
    }
  }
  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;
  use zinnia_config::Connection;

  fn graph(edges: &[((&str, &str), (&str, &str))]) -> Graph {
    let connections: Vec<Connection> = edges
      .iter()
      .map(|(from, to)| {
        serde_json::from_value(serde_json::json!({
          "from": { "nodeId": from.0, "portName": from.1 },
          "to": { "nodeId": to.0, "portName": to.1 },
        }))
        .unwrap()
      })
      .collect();
    Graph::rewire(&connections, &HashSet::new())
  }

  fn result_of(entries: &[(&str, Value)]) -> ValueMap {
    let mut map = ValueMap::new();
    for (k, v) in entries {
      map.insert(k.to_string(), v.clone());
    }
    map
  }

  #[test]
  fn test_exact_port_extraction() {
    let graph = graph(&[(("a", "text"), ("b", "data"))]);
    let mut results = HashMap::new();
    results.insert("a".to_string(), result_of(&[("text", Value::Text("hi".into()))]));

    let assembled = assemble_input("b", &graph, &results).unwrap();
    let map = assembled.input.unwrap();
    let map = map.as_map().unwrap();
    assert_eq!(map.get("data").unwrap().as_str(), Some("hi"));
    assert_eq!(assembled.parent_node_id.as_deref(), Some("a"));
  }

  #[test]
  fn test_fallback_field_extraction() {
    // Source result has no "json" port; parsed_json is its fallback.
    let graph = graph(&[(("a", "json"), ("b", "json"))]);
    let mut results = HashMap::new();
    results.insert(
      "a".to_string(),
      result_of(&[("parsed_json", Value::Json(serde_json::json!({"k": 1})))]),
    );

    let assembled = assemble_input("b", &graph, &results).unwrap();
    let map = assembled.input.unwrap();
    assert_eq!(
      map.as_map().unwrap().get("json").unwrap(),
      &Value::Json(serde_json::json!({"k": 1}))
    );
  }

  #[test]
  fn test_whole_result_when_nothing_matches() {
    let graph = graph(&[(("a", "odd_port"), ("b", "in"))]);
    let mut results = HashMap::new();
    results.insert(
      "a".to_string(),
      result_of(&[("something", Value::Number(1.0))]),
    );

    let assembled = assemble_input("b", &graph, &results).unwrap();
    let map = assembled.input.unwrap();
    let inner = map.as_map().unwrap().get("in").unwrap();
    assert!(matches!(inner, Value::Map(_)));
  }

  #[test]
  fn test_last_write_wins_in_authored_order() {
    let graph = graph(&[
      (("a", "text"), ("c", "data")),
      (("b", "text"), ("c", "data")),
    ]);
    let mut results = HashMap::new();
    results.insert("a".to_string(), result_of(&[("text", Value::Text("first".into()))]));
    results.insert("b".to_string(), result_of(&[("text", Value::Text("second".into()))]));

    let assembled = assemble_input("c", &graph, &results).unwrap();
    let map = assembled.input.unwrap();
    assert_eq!(
      map.as_map().unwrap().get("data").unwrap().as_str(),
      Some("second")
    );
  }

  #[test]
  fn test_missing_required_port_is_reported() {
    let graph = graph(&[
      (("a", "text"), ("c", "data")),
      (("b", "text"), ("c", "trigger")),
    ]);
    // Only a has produced a result; the trigger port stays unsatisfied.
    let mut results = HashMap::new();
    results.insert("a".to_string(), result_of(&[("text", Value::Text("x".into()))]));

    let err = assemble_input("c", &graph, &results).unwrap_err();
    assert_eq!(err.ports, vec!["trigger".to_string()]);
    assert!(err.message("c").contains("missing required inputs on ports"));
  }

  #[test]
  fn test_no_incoming_edges_means_no_input() {
    let graph = graph(&[(("a", "x"), ("b", "y"))]);
    let assembled = assemble_input("a", &graph, &HashMap::new()).unwrap();
    assert!(assembled.input.is_none());
    assert!(assembled.parent_node_id.is_none());
  }
}
