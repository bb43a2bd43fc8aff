/*
 * Sinkscope - whole-program reachability and path-constraint analysis
 * for file-system sinks in compiled mobile application packages.
 *
 * Feature-First Architecture:
 * - shared/   : Common models (signatures, three-operand IR, manifest, app inventory)
 * - features/ : Vertical slices (predicates → taint → entrypoints → icc →
 *               callgraph → pathfinder → constraints → strings →
 *               dependencies → reporting)
 * - pipeline/ : Driver orchestration + bounded worker pool
 *
 * Data flow:
 *   manifest inventory → synthetic root → call graph (+ ICC splice)
 *   → acyclic sink paths → per-path symbolic execution → string-parameter
 *   classification → supporting-event resolution → on-disk report
 */

// Crate-level lint configuration
#![allow(dead_code)] // Several accessors reserved for downstream consumers
#![allow(clippy::too_many_arguments)] // Analysis transfer functions carry wide state
#![allow(clippy::type_complexity)]
#![allow(clippy::upper_case_acronyms)] // ICC, IR naming
#![allow(clippy::module_inception)]

/// Shared models and utilities
pub mod shared;

/// Feature modules (analysis stages)
pub mod features;

/// Pipeline orchestration
pub mod pipeline;

/// Configuration record
pub mod config;

/// Error types
pub mod errors;

pub use config::AnalysisConfig;
pub use errors::{AnalysisError, AnalysisResult};
pub use pipeline::driver::{Analyzer, AppReport};
pub use pipeline::targets::TargetSet;
pub use shared::models::app::AppModel;
