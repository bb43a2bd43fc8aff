//! Path-conditioned constraint extraction
//!
//! Per-path forward symbolic dataflow composing expression sets and branch
//! predicates across the call chain.

pub mod domain;
pub mod infrastructure;

pub use domain::{DataMap, HeapLoc};
pub use infrastructure::engine::{
    ConstraintEngine, ConstraintStatus, PathEvaluation, SinkArgument, WorkBudget,
};
