use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use zinnia_client::Session;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext};

/// Chat completion against an OpenAI-style endpoint.
///
/// The prompt arrives on the `prompt` port (or as the stringified input);
/// the endpoint, model, and sampling parameters are configured on the node.
pub struct LlmChatExecutor {
  session: Arc<Session>,
}

impl LlmChatExecutor {
  pub fn new(session: Arc<Session>) -> Self {
    Self { session }
  }
}

#[async_trait]
impl NodeExecutor for LlmChatExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["llm_chat"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let endpoint = node.config_str_or("endpoint", "");
    let model = node.config_str_or("model", "");
    let temperature = node.config_f64("temperature", 0.7);
    let max_tokens = node.config_i64("max_tokens", 256);
    let system_prompt = node.config_str_or("system_prompt", "");

    if endpoint.is_empty() {
      return Err(ExecutorError::contract("llm_chat node requires an endpoint"));
    }

    let prompt = match &input {
      Some(Value::Map(map)) => map
        .get("prompt")
        .map(|v| v.to_display_string())
        .unwrap_or_else(|| Value::Map(map.clone()).to_display_string()),
      Some(other) => other.to_display_string(),
      None => "Hello, how can you help me?".to_string(),
    };

    let mut messages = Vec::new();
    if !system_prompt.is_empty() {
      messages.push(serde_json::json!({ "role": "system", "content": system_prompt }));
    }
    messages.push(serde_json::json!({ "role": "user", "content": prompt }));

    let body = serde_json::json!({
      "model": model,
      "messages": messages,
      "options": {
        "temperature": temperature,
        "num_predict": max_tokens,
      },
    });

    debug!(node_id = %node.id, model = %model, "llm chat request");

    let builder = self
      .session
      .client()
      .post(format!("{}/chat/completions", endpoint.trim_end_matches('/')))
      .json(&body);
    let response = self.session.send(builder).await?;

    let status = response.status().as_u16();
    if status != 200 {
      let text = response.text().await.unwrap_or_default();
      return Err(ExecutorError::contract(format!(
        "API request failed: {} - {}",
        status, text
      )));
    }

    let result: serde_json::Value = response
      .json()
      .await
      .map_err(|e| ExecutorError::contract(format!("invalid chat response: {}", e)))?;

    let message = result["choices"][0]["message"]["content"]
      .as_str()
      .unwrap_or_default()
      .to_string();
    let tokens_used = result["usage"]["total_tokens"].as_f64().unwrap_or(0.0);

    let mut out = ValueMap::new();
    out.insert("response".to_string(), Value::Text(message));
    out.insert("tokens_used".to_string(), Value::Number(tokens_used));
    out.insert("model_used".to_string(), Value::Text(model));
    out.insert("full_response".to_string(), Value::Json(result));
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use wiremock::matchers::{body_partial_json, method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn node(endpoint: &str) -> NodeDef {
    serde_json::from_value(serde_json::json!({
      "id": "chat", "type": "llm_chat",
      "config": {
        "endpoint": { "value": endpoint },
        "model": { "value": "test-model" },
        "temperature": { "value": "0.2" },
        "max_tokens": { "value": "64" },
        "system_prompt": { "value": "be brief" },
      },
    }))
    .unwrap()
  }

  #[tokio::test]
  async fn test_chat_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(body_partial_json(serde_json::json!({
        "model": "test-model",
        "messages": [
          { "role": "system", "content": "be brief" },
          { "role": "user", "content": "hi there" },
        ],
      })))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "choices": [ { "message": { "content": "hello back" } } ],
        "usage": { "total_tokens": 12 },
      })))
      .mount(&server)
      .await;

    let session = Arc::new(Session::new(server.uri(), "t").unwrap());
    let mut map = ValueMap::new();
    map.insert("prompt".to_string(), Value::Text("hi there".into()));

    let out = LlmChatExecutor::new(session)
      .execute(
        &node(&server.uri()),
        Some(Value::Map(map)),
        &RunContext::empty(),
      )
      .await
      .unwrap();

    assert_eq!(out.get("response").unwrap().as_str(), Some("hello back"));
    assert_eq!(out.get("tokens_used").unwrap(), &Value::Number(12.0));
    assert_eq!(out.get("model_used").unwrap().as_str(), Some("test-model"));
  }

  #[tokio::test]
  async fn test_upstream_error_is_contract_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
      .mount(&server)
      .await;

    let session = Arc::new(Session::new(server.uri(), "t").unwrap());
    let err = LlmChatExecutor::new(session)
      .execute(&node(&server.uri()), None, &RunContext::empty())
      .await
      .unwrap_err();
    assert!(err.to_string().contains("API request failed: 400"));
  }
}
