use async_trait::async_trait;
use zinnia_config::NodeDef;
use zinnia_data::{Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext};

/// Literal text source.
pub struct TextExecutor;

#[async_trait]
impl NodeExecutor for TextExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["text"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    _input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let mut out = ValueMap::new();
    out.insert(
      "text".to_string(),
      Value::Text(node.config_str_or("text_content", "")),
    );
    Ok(out)
  }
}
