//! Depth-first path enumeration
//!
//! Cycles are suppressed by keeping the method sequence simple: a method
//! already on the current path is never re-entered. One path is reported
//! per distinct acyclic method sequence reaching a target statement.

use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::features::callgraph::domain::CallGraph;
use crate::shared::models::app::AppModel;
use crate::shared::models::ir::{MethodSig, UnitRef};

use super::super::domain::{CallPath, CallStep};
use super::plugins::SearchPlugin;

/// Enumeration statistics.
#[derive(Debug, Default, Clone)]
pub struct EnumerationStats {
    pub paths: usize,
    pub ui_dropped: usize,
    /// The path cap was hit; coverage is partial.
    pub truncated: bool,
}

pub struct PathEnumerator<'a> {
    app: &'a AppModel,
    graph: &'a CallGraph,
    config: &'a AnalysisConfig,
}

impl<'a> PathEnumerator<'a> {
    pub fn new(app: &'a AppModel, graph: &'a CallGraph, config: &'a AnalysisConfig) -> Self {
        Self { app, graph, config }
    }

    /// Enumerate target paths from `root`, reporting each to `plugin`.
    pub fn enumerate(&self, root: &MethodSig, plugin: &mut dyn SearchPlugin) -> EnumerationStats {
        let mut stats = EnumerationStats::default();
        let mut trail: Vec<CallStep> = Vec::new();
        let mut on_path: FxHashSet<String> = FxHashSet::default();
        on_path.insert(root.canonical());
        self.dfs(&root.canonical(), &mut trail, &mut on_path, plugin, &mut stats);
        if stats.truncated {
            warn!(cap = self.config.max_paths, "path enumeration truncated");
        }
        debug!(paths = stats.paths, ui_dropped = stats.ui_dropped, "paths enumerated");
        stats
    }

    fn dfs(
        &self,
        current: &str,
        trail: &mut Vec<CallStep>,
        on_path: &mut FxHashSet<String>,
        plugin: &mut dyn SearchPlugin,
        stats: &mut EnumerationStats,
    ) {
        if stats.paths >= self.config.max_paths {
            stats.truncated = true;
            return;
        }
        let Some(body) = self.app.body_of(current) else {
            return;
        };
        let Ok(current_sig) = MethodSig::parse(current) else {
            return;
        };

        for (index, stmt) in body.units.iter().enumerate() {
            if plugin.is_target(self.app, &current_sig, index, stmt, self.graph) {
                if let Some(path) = self.build_path(trail, current, index, on_path) {
                    if self.is_ui_entry(&path.entry) && self.config.drop_ui_entries {
                        stats.ui_dropped += 1;
                    } else if stats.paths < self.config.max_paths {
                        stats.paths += 1;
                        plugin.on_path(path);
                    } else {
                        stats.truncated = true;
                    }
                }
            }

            let unit = UnitRef::new(&current_sig, index);
            let callees: Vec<String> = self
                .graph
                .callees_at(&unit)
                .into_iter()
                .map(|s| s.to_string())
                .collect();
            for callee in callees {
                if on_path.contains(&callee) {
                    continue; // method-simple paths only
                }
                trail.push(CallStep {
                    caller: current.to_string(),
                    unit: unit.clone(),
                    callee: callee.clone(),
                });
                on_path.insert(callee.clone());
                self.dfs(&callee, trail, on_path, plugin, stats);
                on_path.remove(&callee);
                trail.pop();
            }
        }
    }

    fn build_path(
        &self,
        trail: &[CallStep],
        current: &str,
        index: usize,
        on_path: &FxHashSet<String>,
    ) -> Option<CallPath> {
        let entry_key = trail
            .first()
            .map(|s| s.callee.as_str())
            .unwrap_or(current);
        let entry = MethodSig::parse(entry_key).ok()?;
        let current_sig = MethodSig::parse(current).ok()?;
        Some(CallPath {
            entry,
            steps: trail.to_vec(),
            terminal: UnitRef::new(&current_sig, index),
            methods: on_path.clone(),
        })
    }

    /// UI click-handler entry policy: `onClick` entries and classes wired
    /// as click listeners are routing noise for this analysis.
    fn is_ui_entry(&self, entry: &MethodSig) -> bool {
        entry.name == "onClick"
            || self
                .app
                .extends(&entry.class, "android.view.View$OnClickListener")
    }
}
