//! Zinnia Engine
//!
//! The execution manager: takes a classified [`Workflow`] and an executor
//! registry and runs the graph to completion.
//!
//! # Scheduling
//!
//! Execution proceeds in ready-sets. A node is ready when every input port
//! its incoming edges terminate at has at least one completed source. Ready
//! nodes run concurrently on spawned tasks behind a bounded semaphore; the
//! next set is computed only after the whole batch completes. Input bundles
//! are assembled per port from upstream results, with fallback field mapping
//! and last-write-wins fan-in in authored connection order.
//!
//! # Control flow
//!
//! - A `for_each` result expands in place: downstream nodes are captured out
//!   of the outer schedule and re-run once per array element against an
//!   overlay of the results map, tagged with their iteration.
//! - A `repeater` node puts the whole workflow in cycle mode: every cycle
//!   clears the executed set and re-runs the executable subset.
//! - A `__stop_execution` result terminates the enclosing scheduler level
//!   and propagates outward through loop scopes, preserving results.
//! - Cancellation aborts the run at the next suspension point and returns
//!   the partial report.
//!
//! [`Workflow`]: zinnia_workflow::Workflow

mod error;
mod inputs;
mod manager;
mod report;

pub use error::EngineError;
pub use manager::{EngineConfig, ExecutionManager};
pub use report::{IterationTag, NodeRecord, RunReport};
