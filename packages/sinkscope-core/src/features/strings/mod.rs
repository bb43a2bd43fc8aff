//! String-parameter resolution
//!
//! Reconstructs the value flowing into each file-path parameter of a sink
//! invocation and classifies it as hard-coded, partially controlled, or
//! fully controlled.

pub mod domain;
pub mod infrastructure;

pub use domain::{ConstructionOp, PathType, StringParamConstraint};
pub use infrastructure::resolver::StringParamResolver;
