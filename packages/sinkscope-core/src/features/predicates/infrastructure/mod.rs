//! Predicate infrastructure: minimization and the satisfiability oracle.

pub mod minimize;
pub mod oracle;
