use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};
use zinnia_client::VfsClient;
use zinnia_config::NodeDefinition;

/// Process-wide cache of node-type definitions.
///
/// Definitions live in the VFS at `/nodes/<type>.node` as JSON. The cache is
/// read-mostly: load on miss, no invalidation within a run. A missing or
/// malformed definition yields the permissive default so unknown node types
/// never fail the workflow at load time.
pub struct DefinitionStore {
  vfs: Arc<VfsClient>,
  cache: RwLock<HashMap<String, Arc<NodeDefinition>>>,
}

impl DefinitionStore {
  pub fn new(vfs: Arc<VfsClient>) -> Self {
    Self {
      vfs,
      cache: RwLock::new(HashMap::new()),
    }
  }

  /// Definition for a node type; never fails.
  pub async fn get(&self, node_type: &str) -> Arc<NodeDefinition> {
    if let Some(def) = self.cache.read().await.get(node_type) {
      return def.clone();
    }

    let def = Arc::new(self.load(node_type).await);
    self
      .cache
      .write()
      .await
      .entry(node_type.to_string())
      .or_insert_with(|| def.clone())
      .clone()
  }

  async fn load(&self, node_type: &str) -> NodeDefinition {
    let path = format!("/nodes/{}.node", node_type);
    match self.vfs.read(&path).await {
      Ok(content) => match serde_json::from_str::<NodeDefinition>(&content) {
        Ok(def) => {
          debug!(node_type, "node definition loaded");
          def
        }
        Err(e) => {
          warn!(node_type, error = %e, "malformed node definition, using default");
          NodeDefinition::permissive(node_type)
        }
      },
      Err(e) => {
        debug!(node_type, error = %e, "no node definition, using default");
        NodeDefinition::permissive(node_type)
      }
    }
  }
}
