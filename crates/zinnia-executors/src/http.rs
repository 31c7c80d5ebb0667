use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use zinnia_client::{FetchedBody, ProxyClient, ProxyRequest};
use zinnia_config::NodeDef;
use zinnia_data::{replace_input_placeholders, replace_time_placeholders, Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext};

/// Outbound HTTP through the server-side proxy.
///
/// The request body undergoes placeholder substitution against the node's
/// input before parsing. Binary responses route onto `data`/`binary`/`blob`
/// (plus `image_data`/`audio_data` when the content type says so); text
/// responses carry `response`/`data`/`text` and, when the body parses,
/// `parsed_json`/`json`.
pub struct HttpExecutor {
  proxy: Arc<ProxyClient>,
}

impl HttpExecutor {
  pub fn new(proxy: Arc<ProxyClient>) -> Self {
    Self { proxy }
  }
}

#[async_trait]
impl NodeExecutor for HttpExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["http"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let url = node.config_str_or("url", "");
    let method = node.config_str_or("method", "GET");
    let headers_str = node.config_str_or("headers", "");
    let body_str = node.config_str_or("body", "");

    if url.is_empty() {
      return Err(ExecutorError::contract("http node requires a url"));
    }

    let mut request = ProxyRequest::new(url, method);

    if !headers_str.trim().is_empty() {
      match serde_json::from_str(&headers_str) {
        Ok(headers) => request.headers = headers,
        Err(_) => warn!(node_id = %node.id, "invalid headers JSON, sending none"),
      }
    }

    if !body_str.trim().is_empty() {
      let substituted = match &input {
        Some(value) => replace_input_placeholders(&body_str, value),
        None => body_str.clone(),
      };
      let substituted = replace_time_placeholders(&substituted);
      request.body = serde_json::from_str(&substituted)
        .unwrap_or(serde_json::Value::String(substituted));
    }

    let response = self.proxy.fetch(&request).await?;
    debug!(
      node_id = %node.id,
      status = response.status,
      content_type = %response.content_type,
      "proxy response received"
    );

    let mut out = ValueMap::new();
    match response.body {
      FetchedBody::Binary(bytes) => {
        let data = Value::Bytes(bytes);
        if response.content_type.contains("image") {
          out.insert("image_data".to_string(), data.clone());
        } else if response.content_type.contains("audio") {
          out.insert("audio_data".to_string(), data.clone());
        }
        out.insert("data".to_string(), data.clone());
        out.insert("binary".to_string(), data.clone());
        out.insert("blob".to_string(), data);
      }
      FetchedBody::Text { text, json } => {
        out.insert("response".to_string(), Value::Text(text.clone()));
        out.insert("data".to_string(), Value::Text(text.clone()));
        out.insert("text".to_string(), Value::Text(text));
        let parsed = json.map(Value::Json).unwrap_or(Value::Null);
        out.insert("parsed_json".to_string(), parsed.clone());
        out.insert("json".to_string(), parsed);
      }
    }
    out.insert(
      "content_type".to_string(),
      Value::Text(response.content_type),
    );
    out.insert("status".to_string(), Value::Number(response.status as f64));

    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};
  use zinnia_client::Session;

  fn node(config: serde_json::Value) -> NodeDef {
    serde_json::from_value(serde_json::json!({
      "id": "fetch", "type": "http", "config": config,
    }))
    .unwrap()
  }

  async fn executor(server: &MockServer) -> HttpExecutor {
    let session = Arc::new(Session::new(server.uri(), "t").unwrap());
    HttpExecutor::new(Arc::new(ProxyClient::new(session)))
  }

  #[tokio::test]
  async fn test_text_response_routes_json_alias() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/proxy/http"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "status": 200,
        "headers": { "content-type": "application/json" },
        "is_binary": false,
        "content": "{\"ok\":true}",
      })))
      .mount(&server)
      .await;

    let out = executor(&server)
      .await
      .execute(
        &node(serde_json::json!({ "url": { "value": "https://x.test/api" }, "method": { "value": "GET" } })),
        None,
        &RunContext::empty(),
      )
      .await
      .unwrap();

    assert_eq!(out.get("response").unwrap().as_str(), Some("{\"ok\":true}"));
    assert_eq!(
      out.get("json").unwrap(),
      &Value::Json(serde_json::json!({"ok": true}))
    );
    assert_eq!(out.get("parsed_json").unwrap(), out.get("json").unwrap());
  }

  #[tokio::test]
  async fn test_binary_image_response_routes_image_port() {
    use base64::Engine as _;
    let payload = vec![137u8, 80, 78, 71];
    let encoded = base64::engine::general_purpose::STANDARD.encode(&payload);

    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/proxy/http"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "status": 200,
        "headers": { "content-type": "image/png" },
        "is_binary": true,
        "content": encoded,
      })))
      .mount(&server)
      .await;

    let out = executor(&server)
      .await
      .execute(
        &node(serde_json::json!({ "url": { "value": "https://x.test/img.png" }, "method": { "value": "GET" } })),
        None,
        &RunContext::empty(),
      )
      .await
      .unwrap();

    let bytes = out.get("binary").unwrap().as_bytes().unwrap();
    assert_eq!(bytes.to_vec(), payload);
    assert_eq!(out.get("image_data").unwrap(), out.get("data").unwrap());
    assert_eq!(
      out.get("content_type").unwrap().as_str(),
      Some("image/png")
    );
  }

  #[tokio::test]
  async fn test_body_placeholder_substitution() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/proxy/http"))
      .and(wiremock::matchers::body_partial_json(serde_json::json!({
        "body": { "query": "Ada" }
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "status": 200, "headers": {}, "is_binary": false, "content": "ok",
      })))
      .mount(&server)
      .await;

    let mut input = ValueMap::new();
    input.insert("data".to_string(), Value::Text("Ada".into()));

    let out = executor(&server)
      .await
      .execute(
        &node(serde_json::json!({
          "url": { "value": "https://x.test/api" },
          "method": { "value": "POST" },
          "body": { "value": "{\"query\": \"{{data}}\"}" },
        })),
        Some(Value::Map(input)),
        &RunContext::empty(),
      )
      .await
      .unwrap();

    assert_eq!(out.get("text").unwrap().as_str(), Some("ok"));
  }
}
