use bytes::Bytes;
use indexmap::IndexMap;

/// A node result: output port id to value, in production order.
///
/// Insertion order matters — "first available value" fallbacks pick the
/// earliest-produced port, matching how the editor routes loose data.
pub type ValueMap = IndexMap<String, Value>;

/// A dynamic port value.
///
/// JSON-shaped values (arrays and objects) stay as [`serde_json::Value`] so
/// extraction and re-serialization are lossless; `Map` is reserved for nested
/// port maps such as a whole upstream result passed through a `trigger` port.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Null,
  Bool(bool),
  Number(f64),
  Text(String),
  Bytes(Bytes),
  Json(serde_json::Value),
  Map(ValueMap),
}

impl Value {
  /// Convert a JSON value, unwrapping scalars into their native variants.
  pub fn from_json(value: serde_json::Value) -> Self {
    match value {
      serde_json::Value::Null => Value::Null,
      serde_json::Value::Bool(b) => Value::Bool(b),
      serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
      serde_json::Value::String(s) => Value::Text(s),
      other => Value::Json(other),
    }
  }

  /// Re-serialize as JSON. Bytes become a base64 string, which is the only
  /// JSON-representable form of binary data.
  pub fn to_json(&self) -> serde_json::Value {
    use base64::Engine as _;
    match self {
      Value::Null => serde_json::Value::Null,
      Value::Bool(b) => serde_json::Value::Bool(*b),
      // Integral floats serialize as JSON integers so round-trips stay clean.
      Value::Number(n) => {
        if n.fract() == 0.0 && n.abs() < 1e15 {
          serde_json::Value::Number((*n as i64).into())
        } else {
          serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
        }
      }
      Value::Text(s) => serde_json::Value::String(s.clone()),
      Value::Bytes(b) => {
        serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
      }
      Value::Json(v) => v.clone(),
      Value::Map(m) => {
        serde_json::Value::Object(m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
      }
    }
  }

  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null) || matches!(self, Value::Json(serde_json::Value::Null))
  }

  /// Truthiness, matching the editor's loose-boolean rules: empty strings,
  /// zero, empty containers and null are false.
  pub fn is_truthy(&self) -> bool {
    match self {
      Value::Null => false,
      Value::Bool(b) => *b,
      Value::Number(n) => *n != 0.0,
      Value::Text(s) => !s.is_empty(),
      Value::Bytes(b) => !b.is_empty(),
      Value::Json(v) => match v {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(a) => !a.is_empty(),
        serde_json::Value::Object(o) => !o.is_empty(),
      },
      Value::Map(m) => !m.is_empty(),
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Text(s) => Some(s),
      Value::Json(serde_json::Value::String(s)) => Some(s),
      _ => None,
    }
  }

  pub fn as_bytes(&self) -> Option<&Bytes> {
    match self {
      Value::Bytes(b) => Some(b),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&ValueMap> {
    match self {
      Value::Map(m) => Some(m),
      _ => None,
    }
  }

  /// Numeric coercion: numbers pass through, numeric strings parse, booleans
  /// read as 1/0.
  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Number(n) => Some(*n),
      Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
      Value::Text(s) => s.trim().parse().ok(),
      Value::Json(serde_json::Value::Number(n)) => n.as_f64(),
      Value::Json(serde_json::Value::String(s)) => s.trim().parse().ok(),
      _ => None,
    }
  }

  /// The JSON array behind this value, if there is one.
  pub fn as_array(&self) -> Option<&Vec<serde_json::Value>> {
    match self {
      Value::Json(serde_json::Value::Array(a)) => Some(a),
      _ => None,
    }
  }

  /// Human-readable string form, used for templates, text output ports, and
  /// text comparisons. Integral numbers drop their fraction; JSON values
  /// render compactly; binary renders lossily.
  pub fn to_display_string(&self) -> String {
    match self {
      Value::Null => "null".to_string(),
      Value::Bool(b) => b.to_string(),
      Value::Number(n) => format_number(*n),
      Value::Text(s) => s.clone(),
      Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
      Value::Json(v) => match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
      },
      Value::Map(m) => serde_json::Value::Object(
        m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
      )
      .to_string(),
    }
  }
}

/// Render a float without a trailing `.0` when it is integral.
pub(crate) fn format_number(n: f64) -> String {
  if n.fract() == 0.0 && n.abs() < 1e15 {
    format!("{}", n as i64)
  } else {
    format!("{}", n)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::Text(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::Text(s)
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<f64> for Value {
  fn from(n: f64) -> Self {
    Value::Number(n)
  }
}
