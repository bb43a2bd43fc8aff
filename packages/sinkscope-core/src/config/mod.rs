//! Analysis configuration
//!
//! One immutable record threaded through the driver. No process-wide
//! singletons; every stage borrows the same validated instance.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::{AnalysisError, AnalysisResult};

/// Immutable analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Class-name prefixes identifying application-owned components.
    /// Empty means "use the manifest package name".
    pub package_prefixes: Vec<String>,

    /// Worker pool size for per-path constraint work.
    pub workers: usize,

    /// Wall-clock budget for a single path. `None` disables the check.
    pub per_path_timeout: Option<Duration>,

    /// Wall-clock budget for the whole run. `None` disables the check.
    pub global_timeout: Option<Duration>,

    /// Expression-Set truncation bound (widening-by-replacement drops the
    /// least recent member once the bound is hit).
    pub max_expr_set: usize,

    /// Bound on worklist pops per intraprocedural fixpoint.
    pub max_fixpoint_iters: usize,

    /// Cap on enumerated sink paths per run.
    pub max_paths: usize,

    /// Recursion bound for supporting-event resolution.
    pub max_support_depth: usize,

    /// Cap on candidate write paths examined per heap dependency.
    pub max_support_paths: usize,

    /// Drop paths whose entry point is a UI click handler.
    pub drop_ui_entries: bool,

    /// Connect unresolved intent sites to every exported component of the
    /// matching kind (paths stay flagged imprecise either way).
    pub fanout_imprecise: bool,

    /// Memo-table capacity for the taint classifier.
    pub taint_memo_cap: usize,

    /// Atom budget for the built-in ground-term oracle.
    pub oracle_max_atoms: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            package_prefixes: Vec::new(),
            workers: num_cpus::get(),
            per_path_timeout: Some(Duration::from_secs(60)),
            global_timeout: Some(Duration::from_secs(1800)),
            max_expr_set: 8,
            max_fixpoint_iters: 4096,
            max_paths: 4096,
            max_support_depth: 2,
            max_support_paths: 16,
            drop_ui_entries: true,
            fanout_imprecise: false,
            taint_memo_cap: 1024,
            oracle_max_atoms: 64,
        }
    }
}

impl AnalysisConfig {
    /// Validate bounds. Called once at startup; a violation is a
    /// configuration error (exit code 2).
    pub fn validate(&self) -> AnalysisResult<()> {
        if self.workers == 0 {
            return Err(AnalysisError::Config("workers must be at least 1".into()));
        }
        if self.max_expr_set == 0 {
            return Err(AnalysisError::Config(
                "max_expr_set must be at least 1".into(),
            ));
        }
        if self.max_fixpoint_iters == 0 {
            return Err(AnalysisError::Config(
                "max_fixpoint_iters must be at least 1".into(),
            ));
        }
        if self.max_paths == 0 {
            return Err(AnalysisError::Config("max_paths must be at least 1".into()));
        }
        if self.taint_memo_cap == 0 {
            return Err(AnalysisError::Config(
                "taint_memo_cap must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// True when `class_name` belongs to the application under analysis.
    pub fn owns_class(&self, manifest_package: &str, class_name: &str) -> bool {
        if self.package_prefixes.is_empty() {
            return class_name.starts_with(manifest_package);
        }
        self.package_prefixes
            .iter()
            .any(|p| class_name.starts_with(p.as_str()))
    }
}
