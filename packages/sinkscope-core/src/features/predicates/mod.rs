//! Predicate algebra
//!
//! Symbolic variables, expression trees, expression sets, and boolean
//! predicates, plus the equivalence-preserving minimizer and the
//! satisfiability oracle port.

pub mod domain;
pub mod infrastructure;

pub use domain::{
    BoolJoin, Expr, ExprSet, HeapBase, PathId, Predicate, SymbolicVar, VarArena, VarId,
};
pub use infrastructure::minimize::minimize;
pub use infrastructure::oracle::{GroundTermOracle, SatOracle, Satisfiability};
