//! Feature modules, one vertical slice per analysis stage.

pub mod callgraph;
pub mod constraints;
pub mod dependencies;
pub mod entrypoints;
pub mod icc;
pub mod pathfinder;
pub mod predicates;
pub mod reporting;
pub mod strings;
pub mod taint;
