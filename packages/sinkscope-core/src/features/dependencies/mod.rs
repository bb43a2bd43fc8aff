//! Heap-dependency resolution
//!
//! For each heap variable in a root event's constraint, finds other paths
//! that write the field and re-drives the constraint engine on them.

pub mod infrastructure;

pub use infrastructure::resolver::DependencyResolver;
