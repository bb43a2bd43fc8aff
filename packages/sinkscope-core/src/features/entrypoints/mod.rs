//! Entry-point synthesis
//!
//! Builds the single synthetic root method that drives the call graph: one
//! allocation plus lifecycle invocations per declared component.

pub mod domain;
pub mod infrastructure;

pub use domain::{lifecycle_table, LifecycleShape, LifecycleSpec};
pub use infrastructure::synthesizer::{EntryPointSynthesizer, SynthesisOutcome};
