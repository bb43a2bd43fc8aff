//! Event model and report emission
//!
//! Events classify discovered paths; the emitter serializes them into the
//! per-package on-disk layout consumed by downstream tools.

pub mod domain;
pub mod infrastructure;

pub use domain::{Event, EventChain, EventKind, PathOutcome, SupportingEvent, VulnerabilityKind};
pub use infrastructure::emitter::Emitter;
