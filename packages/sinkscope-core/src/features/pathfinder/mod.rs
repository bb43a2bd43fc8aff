//! Targeted path discovery
//!
//! Plugin-driven depth-first traversal of the call graph, enumerating
//! acyclic call chains from the synthetic root to target statements.

pub mod domain;
pub mod infrastructure;

pub use domain::{CallPath, CallStep};
pub use infrastructure::enumerator::{EnumerationStats, PathEnumerator};
pub use infrastructure::plugins::{FieldWritePlugin, SearchPlugin, SinkSearchPlugin};
