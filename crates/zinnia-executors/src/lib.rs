//! Zinnia Executors
//!
//! The built-in node executors. Each module implements [`NodeExecutor`] for
//! one node family; [`builtin_registry`] wires them all into an
//! [`ExecutorRegistry`] with the unknown-type fallback.
//!
//! Executors are thin: remote access goes through `zinnia-client`, and all
//! data shaping (port mapping, extraction, templates, normalization) goes
//! through `zinnia-data`.
//!
//! [`NodeExecutor`]: zinnia_node::NodeExecutor
//! [`ExecutorRegistry`]: zinnia_node::ExecutorRegistry

mod array_ops;
mod condition;
mod for_each;
mod http;
mod json_extract;
mod llm;
mod logical_gate;
mod math;
mod random;
mod reference;
mod string_ops;
mod text;
mod timer;
mod unknown;
mod vfs;
mod vfs_list;

use std::sync::Arc;

use zinnia_client::{ProxyClient, Session, VfsClient};
use zinnia_node::{DefinitionStore, ExecutorRegistry};

pub use array_ops::ArrayExecutor;
pub use condition::ConditionExecutor;
pub use for_each::ForEachExecutor;
pub use http::HttpExecutor;
pub use json_extract::JsonExtractExecutor;
pub use llm::LlmChatExecutor;
pub use logical_gate::LogicalGateExecutor;
pub use math::MathExecutor;
pub use random::RandomExecutor;
pub use reference::NodeReferenceExecutor;
pub use string_ops::StringExecutor;
pub use text::TextExecutor;
pub use timer::TimerExecutor;
pub use unknown::UnknownExecutor;
pub use vfs::VfsExecutor;
pub use vfs_list::VfsDirectoryListExecutor;

/// Build the registry of built-in executors.
pub fn builtin_registry(
  session: Arc<Session>,
  vfs: Arc<VfsClient>,
  proxy: Arc<ProxyClient>,
  definitions: Arc<DefinitionStore>,
) -> ExecutorRegistry {
  let mut registry = ExecutorRegistry::new(Arc::new(UnknownExecutor::new(definitions)));

  registry.register(Arc::new(HttpExecutor::new(proxy)));
  registry.register(Arc::new(VfsExecutor::new(vfs.clone())));
  registry.register(Arc::new(VfsDirectoryListExecutor::new(vfs)));
  registry.register(Arc::new(ForEachExecutor));
  registry.register(Arc::new(TimerExecutor));
  registry.register(Arc::new(TextExecutor));
  registry.register(Arc::new(JsonExtractExecutor));
  registry.register(Arc::new(StringExecutor));
  registry.register(Arc::new(MathExecutor));
  registry.register(Arc::new(ArrayExecutor));
  registry.register(Arc::new(RandomExecutor));
  registry.register(Arc::new(NodeReferenceExecutor));
  registry.register(Arc::new(ConditionExecutor));
  registry.register(Arc::new(LogicalGateExecutor));
  registry.register(Arc::new(LlmChatExecutor::new(session)));

  registry
}
