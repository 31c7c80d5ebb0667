use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ClientError;
use crate::session::Session;

/// Adapter for the server-side HTTP relay at `POST /api/proxy/http`.
///
/// The proxy flattens the remote response into `{status, headers, is_binary,
/// content}` where binary content arrives base64-encoded. This adapter
/// decodes that envelope and, for text responses, opportunistically parses
/// JSON so downstream routing can use it without re-parsing.
#[derive(Debug, Clone)]
pub struct ProxyClient {
  session: Arc<Session>,
}

/// An outbound request to relay.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyRequest {
  pub url: String,
  pub method: String,
  pub headers: serde_json::Value,
  pub body: serde_json::Value,
  pub timeout: u64,
}

impl ProxyRequest {
  pub fn new(url: impl Into<String>, method: impl Into<String>) -> Self {
    Self {
      url: url.into(),
      method: method.into(),
      headers: serde_json::json!({}),
      body: serde_json::Value::Null,
      timeout: 30,
    }
  }
}

#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
  #[serde(default)]
  status: u16,
  #[serde(default)]
  headers: HashMap<String, String>,
  #[serde(default)]
  is_binary: bool,
  #[serde(default)]
  content: String,
}

/// A decoded proxy response.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
  pub status: u16,
  pub headers: HashMap<String, String>,
  pub content_type: String,
  pub body: FetchedBody,
}

/// Response payload, already decoded.
#[derive(Debug, Clone)]
pub enum FetchedBody {
  /// Base64-decoded bytes from a binary response.
  Binary(Bytes),
  /// Text content; `json` is present when the text parses as JSON.
  Text {
    text: String,
    json: Option<serde_json::Value>,
  },
}

impl ProxyClient {
  pub fn new(session: Arc<Session>) -> Self {
    Self { session }
  }

  /// Relay a request through the proxy and decode the response.
  pub async fn fetch(&self, request: &ProxyRequest) -> Result<FetchedResponse, ClientError> {
    debug!(url = %request.url, method = %request.method, "relaying request through proxy");

    let response = self
      .session
      .send(self.session.post_json("/api/proxy/http", request))
      .await?;

    let status = response.status().as_u16();
    if status != 200 {
      return Err(ClientError::Status {
        status,
        path: request.url.clone(),
        message: response.text().await.unwrap_or_default(),
      });
    }

    let envelope: ProxyEnvelope =
      response.json().await.map_err(|e| ClientError::InvalidBody {
        path: request.url.clone(),
        message: e.to_string(),
      })?;

    let content_type = envelope
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
      .map(|(_, v)| v.clone())
      .unwrap_or_else(|| "unknown".to_string());

    let body = if envelope.is_binary {
      let bytes = BASE64
        .decode(envelope.content.as_bytes())
        .map_err(|e| ClientError::InvalidBody {
          path: request.url.clone(),
          message: format!("invalid base64 content: {}", e),
        })?;
      FetchedBody::Binary(Bytes::from(bytes))
    } else {
      // A parse failure is not an error; plenty of text endpoints are not JSON.
      let json = serde_json::from_str(&envelope.content).ok();
      FetchedBody::Text {
        text: envelope.content,
        json,
      }
    };

    Ok(FetchedResponse {
      status: envelope.status,
      headers: envelope.headers,
      content_type,
      body,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_proxy_request_defaults() {
    let req = ProxyRequest::new("https://example.com", "GET");
    assert_eq!(req.timeout, 30);
    assert_eq!(req.headers, serde_json::json!({}));
    assert!(req.body.is_null());
  }

  #[test]
  fn test_proxy_request_serializes_flat() {
    let mut req = ProxyRequest::new("https://example.com/api", "POST");
    req.body = serde_json::json!({"q": 1});
    let wire = serde_json::to_value(&req).unwrap();
    assert_eq!(wire["url"], "https://example.com/api");
    assert_eq!(wire["method"], "POST");
    assert_eq!(wire["body"]["q"], 1);
    assert_eq!(wire["timeout"], 30);
  }
}
