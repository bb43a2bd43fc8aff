//! Call-graph construction
//!
//! Directed multigraph over (method, call-site) pairs, plus the builder
//! that walks invoke units reachable from the synthetic root.

pub mod domain;
pub mod infrastructure;

pub use domain::{CallEdge, CallEdgeKind, CallGraph};
pub use infrastructure::builder::{CallGraphBuilder, CallGraphStats};
