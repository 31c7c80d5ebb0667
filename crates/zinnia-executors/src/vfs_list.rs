use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use zinnia_client::{DirEntry, VfsClient};
use zinnia_config::NodeDef;
use zinnia_data::{replace_time_placeholders, Value, ValueMap};
use zinnia_node::{ExecutorError, NodeExecutor, RunContext};

/// Directory listing over the VFS, with extension filtering and optional
/// recursion. When the server does not inline `children`, recursion re-lists
/// each subdirectory.
pub struct VfsDirectoryListExecutor {
  vfs: Arc<VfsClient>,
}

#[derive(Default)]
struct Listing {
  file_list: Vec<serde_json::Value>,
  file_paths: Vec<String>,
  file_names: Vec<String>,
  directories: Vec<String>,
}

impl VfsDirectoryListExecutor {
  pub fn new(vfs: Arc<VfsClient>) -> Self {
    Self { vfs }
  }

  async fn collect(
    &self,
    entries: &[DirEntry],
    base_path: &str,
    extensions: &[String],
    include_directories: bool,
    recursive: bool,
    out: &mut Listing,
  ) -> Result<(), ExecutorError> {
    for entry in entries {
      let entry_path = format!("{}/{}", base_path.trim_end_matches('/'), entry.name);

      if entry.is_dir() {
        if include_directories {
          out.file_list.push(serde_json::json!({
            "name": entry.name,
            "path": entry_path,
            "type": "directory",
          }));
          out.directories.push(entry_path.clone());
        }

        if recursive {
          match &entry.children {
            Some(children) => {
              Box::pin(self.collect(
                children,
                &entry_path,
                extensions,
                include_directories,
                recursive,
                out,
              ))
              .await?;
            }
            None => match self.vfs.list(&entry_path).await {
              Ok(listing) => {
                Box::pin(self.collect(
                  &listing.items,
                  &entry_path,
                  extensions,
                  include_directories,
                  recursive,
                  out,
                ))
                .await?;
              }
              Err(e) => {
                warn!(path = %entry_path, error = %e, "failed to list subdirectory");
              }
            },
          }
        }
      } else {
        if !extensions.is_empty() {
          let ext = entry
            .name
            .rsplit_once('.')
            .map(|(_, e)| e.to_lowercase())
            .unwrap_or_default();
          if !extensions.contains(&ext) {
            continue;
          }
        }

        out.file_list.push(serde_json::json!({
          "name": entry.name,
          "path": entry_path,
          "type": "file",
        }));
        out.file_paths.push(entry_path.clone());
        out.file_names.push(entry.name.clone());
      }
    }

    Ok(())
  }
}

#[async_trait]
impl NodeExecutor for VfsDirectoryListExecutor {
  fn node_types(&self) -> &'static [&'static str] {
    &["vfs_directory_list"]
  }

  async fn execute(
    &self,
    node: &NodeDef,
    input: Option<Value>,
    _ctx: &RunContext,
  ) -> Result<ValueMap, ExecutorError> {
    let mut directory_path = node.config_str_or("directory_path", "/");
    if let Some(Value::Map(map)) = &input {
      if let Some(path) = map.get("directory_path") {
        directory_path = path.to_display_string();
      }
    }
    let directory_path = replace_time_placeholders(&directory_path);

    let extensions: Vec<String> = node
      .config_str_or("filter_extensions", "")
      .split(',')
      .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
      .filter(|ext| !ext.is_empty())
      .collect();
    let include_directories = node.config_bool("include_directories", true);
    let recursive = node.config_bool("recursive", false);

    debug!(
      node_id = %node.id,
      directory_path = %directory_path,
      recursive,
      "listing directory"
    );

    let listing = self.vfs.list(&directory_path).await?;

    let mut out = Listing::default();
    self
      .collect(
        &listing.items,
        &directory_path,
        &extensions,
        include_directories,
        recursive,
        &mut out,
      )
      .await?;

    let mut result = ValueMap::new();
    result.insert(
      "file_list".to_string(),
      Value::Json(serde_json::Value::Array(out.file_list)),
    );
    result.insert(
      "file_paths".to_string(),
      Value::Json(serde_json::json!(out.file_paths)),
    );
    result.insert(
      "file_names".to_string(),
      Value::Json(serde_json::json!(out.file_names)),
    );
    result.insert(
      "count".to_string(),
      Value::Number(out.file_paths.len() as f64),
    );
    result.insert(
      "directories".to_string(),
      Value::Json(serde_json::json!(out.directories)),
    );
    result.insert(
      "files_only".to_string(),
      Value::Json(serde_json::json!(out.file_paths)),
    );

    Ok(result)
  }
}
