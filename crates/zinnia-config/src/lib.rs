//! Zinnia Config
//!
//! This crate contains the serializable workflow types for Zinnia. These
//! represent workflow documents as authored by the flow editor, before the
//! engine classifies them for execution.
//!
//! A workflow is a flat list of nodes plus port-to-port connections:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "fetch", "type": "http", "config": { "url": { "value": "…" } } }
//!   ],
//!   "connections": [
//!     { "from": { "nodeId": "fetch", "portName": "json" },
//!       "to": { "nodeId": "extract", "portName": "json" } }
//!   ]
//! }
//! ```
//!
//! Node definitions (`NodeDefinition`) describe a node *type* — its ports and
//! execution mode — and are loaded separately from the VFS at
//! `/nodes/<type>.node`.

mod definition;
mod node;
mod workflow;

pub use definition::{ExecutionMode, NodeDefinition, PortSpec};
pub use node::{ConfigValue, NodeDef};
pub use workflow::{Connection, Endpoint, WorkflowDef};
