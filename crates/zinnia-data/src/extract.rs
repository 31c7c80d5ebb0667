/// Extract a nested value with dotted-path notation.
///
/// Path segments are plain object keys, optionally with a single array index
/// suffix: `"user.items[0].name"`. Any missing segment yields `None` rather
/// than an error, so callers can fall back cleanly.
pub fn extract_nested(obj: &serde_json::Value, path: &str) -> Option<serde_json::Value> {
  let mut current = obj;

  for segment in path.split('.') {
    if current.is_null() {
      return None;
    }

    match parse_segment(segment) {
      Some((key, index)) => {
        let array = current.get(key)?.as_array()?;
        current = array.get(index)?;
      }
      None => {
        current = current.get(segment)?;
      }
    }
  }

  Some(current.clone())
}

/// Split `name[3]` into `("name", 3)`. Returns `None` for plain keys.
fn parse_segment(segment: &str) -> Option<(&str, usize)> {
  let open = segment.rfind('[')?;
  if !segment.ends_with(']') || open == 0 {
    return None;
  }
  let index: usize = segment[open + 1..segment.len() - 1].parse().ok()?;
  Some((&segment[..open], index))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn sample() -> serde_json::Value {
    json!({
      "user": { "name": "Ada", "tags": ["a", "b"] },
      "items": [ { "name": "first" }, { "name": "second" } ],
      "count": 3
    })
  }

  #[test]
  fn test_plain_key_path() {
    assert_eq!(extract_nested(&sample(), "user.name"), Some(json!("Ada")));
    assert_eq!(extract_nested(&sample(), "count"), Some(json!(3)));
  }

  #[test]
  fn test_array_index_access() {
    assert_eq!(
      extract_nested(&sample(), "items[0].name"),
      Some(json!("first"))
    );
    assert_eq!(extract_nested(&sample(), "user.tags[1]"), Some(json!("b")));
  }

  #[test]
  fn test_missing_segments_yield_none() {
    assert_eq!(extract_nested(&sample(), "user.email"), None);
    assert_eq!(extract_nested(&sample(), "items[9].name"), None);
    assert_eq!(extract_nested(&sample(), "count.inner"), None);
  }

  #[test]
  fn test_index_on_non_array_yields_none() {
    assert_eq!(extract_nested(&sample(), "user[0]"), None);
  }

  #[test]
  fn test_extraction_distributes_over_segments() {
    let obj = sample();
    let via_full = extract_nested(&obj, "user.name");
    let via_steps = extract_nested(&obj, "user").and_then(|mid| extract_nested(&mid, "name"));
    assert_eq!(via_full, via_steps);
  }

  #[test]
  fn test_segment_parsing() {
    assert_eq!(parse_segment("items[2]"), Some(("items", 2)));
    assert_eq!(parse_segment("plain"), None);
    assert_eq!(parse_segment("[2]"), None);
    assert_eq!(parse_segment("items[x]"), None);
  }
}
