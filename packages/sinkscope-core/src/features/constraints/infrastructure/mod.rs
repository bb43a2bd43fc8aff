//! Constraint-engine infrastructure

pub mod engine;
