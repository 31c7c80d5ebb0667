//! Zinnia Node
//!
//! The executor contract and the two runtime services around it:
//!
//! - [`NodeExecutor`] — the trait every built-in node kind implements, plus
//!   [`RunContext`] with the shared state an execution may consult.
//! - [`ExecutorRegistry`] — dispatch from `node.type` to an executor, with an
//!   unknown-type fallback. Executor failures never escape the registry;
//!   they come back as an `error` port on the result map.
//! - [`DefinitionStore`] — the process-wide cache of node-type definitions
//!   loaded lazily from the VFS, with a permissive default on miss.

mod definitions;
mod executor;
mod registry;

pub use definitions::DefinitionStore;
pub use executor::{
  has_error, is_for_each_control, is_stop_signal, ExecutorError, IterationScope, NodeExecutor,
  RunContext, ERROR_PORT, FOR_EACH_CONTROL_PORT, STOP_EXECUTION_PORT,
};
pub use registry::ExecutorRegistry;
