//! Zinnia Workflow
//!
//! The classified workflow representation: an authored [`WorkflowDef`]
//! combined with node definitions becomes a [`Workflow`] ready for
//! scheduling.
//!
//! Classification decides which nodes the backend executes at all
//! (frontend-only nodes and repeater loop drivers are excluded), rewires
//! edges that pass through excluded nodes to their nearest executable
//! upstream source, validates edge endpoints, and rejects cycles among
//! executable nodes up front.
//!
//! [`WorkflowDef`]: zinnia_config::WorkflowDef

mod error;
mod graph;
mod workflow;

pub use error::WorkflowError;
pub use graph::{Graph, RoutedEdge};
pub use workflow::Workflow;
