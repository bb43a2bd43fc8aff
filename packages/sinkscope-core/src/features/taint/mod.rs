//! Taint tracking
//!
//! Classifies symbolic variables as clean, partially, or fully
//! attacker-influenced, with a provenance set of external input sources.

pub mod domain;
pub mod infrastructure;

pub use domain::{Classification, InputSource, SourceKind, TaintClass};
pub use infrastructure::classifier::TaintClassifier;
