//! Zinnia Data
//!
//! Port values and the pure data utilities shared by the engine and every
//! executor:
//!
//! - [`Value`] — the dynamic value that flows between ports, and
//!   [`ValueMap`] — an insertion-ordered map of port id to value.
//! - [`extract_nested`] — dotted-path extraction with `items[0].name` array
//!   access.
//! - [`map_input_for_node`] / [`fallback_fields`] — the port-mapping rules
//!   that route loosely-named upstream fields onto declared input ports.
//! - Template substitution for `{{DATE}}`-style placeholders and
//!   `{{field}}` input references.
//! - [`normalize_for_vfs`] — coercing an arbitrary value into bytes plus a
//!   detected storage format.
//!
//! Everything here is synchronous and side-effect free; executors must not
//! re-implement these rules locally.

mod extract;
mod mapping;
mod normalize;
mod template;
mod value;

pub use extract::extract_nested;
pub use mapping::{fallback_fields, map_input_for_node};
pub use normalize::{looks_like_base64, normalize_for_vfs, VfsFormat};
pub use template::{
  replace_input_placeholders, replace_iteration_placeholders, replace_time_placeholders,
};
pub use value::{Value, ValueMap};
