//! Top-level analysis driver
//!
//! Stage order: entry-point synthesis → call-graph construction → ICC
//! splice → path enumeration → per-path constraint work on the bounded
//! pool → string classification → dependency resolution → chain assembly.
//! The call graph is read-only once built; per-path state never crosses
//! worker boundaries.

use tracing::{debug, info};

use crate::config::AnalysisConfig;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::features::callgraph::domain::CallGraph;
use crate::features::callgraph::infrastructure::builder::CallGraphBuilder;
use crate::features::constraints::infrastructure::engine::{
    ConstraintEngine, ConstraintStatus, WorkBudget,
};
use crate::features::dependencies::infrastructure::resolver::DependencyResolver;
use crate::features::entrypoints::infrastructure::synthesizer::EntryPointSynthesizer;
use crate::features::icc::infrastructure::resolver::IccResolver;
use crate::features::pathfinder::domain::CallPath;
use crate::features::pathfinder::infrastructure::enumerator::PathEnumerator;
use crate::features::pathfinder::infrastructure::plugins::SinkSearchPlugin;
use crate::features::predicates::infrastructure::oracle::{
    GroundTermOracle, SatOracle, Satisfiability,
};
use crate::features::reporting::domain::{
    Event, EventChain, EventKind, PathOutcome, VulnerabilityKind,
};
use crate::features::reporting::infrastructure::emitter::StagingBuffer;
use crate::features::strings::infrastructure::resolver::StringParamResolver;
use crate::features::taint::infrastructure::classifier::TaintClassifier;
use crate::shared::models::app::AppModel;

use super::scheduler::PathScheduler;
use super::targets::TargetSet;

/// Run-wide counters, surfaced in the summary log.
#[derive(Debug, Default, Clone)]
pub struct AnalysisStats {
    pub components: usize,
    pub lifecycle_calls: usize,
    pub cg_nodes: usize,
    pub cg_edges: usize,
    pub opaque_calls: usize,
    pub icc_sites: usize,
    pub icc_spliced: usize,
    pub icc_imprecise: usize,
    pub paths_found: usize,
    pub paths_infeasible: usize,
    pub paths_timeout: usize,
    pub paths_error: usize,
    pub chains_unsat: usize,
    pub chains: usize,
}

/// Analysis result for one package.
#[derive(Debug)]
pub struct AppReport {
    pub package: String,
    pub chains: Vec<EventChain>,
    pub stats: AnalysisStats,
    pub warnings: Vec<String>,
}

pub struct Analyzer {
    config: AnalysisConfig,
    oracle: GroundTermOracle,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> AnalysisResult<Self> {
        config.validate()?;
        let oracle = GroundTermOracle::new(config.oracle_max_atoms);
        Ok(Self { config, oracle })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the whole pipeline over one application model.
    pub fn analyze(&self, app: &mut AppModel, targets: &TargetSet) -> AnalysisResult<AppReport> {
        if targets.is_empty() {
            return Err(AnalysisError::Config("no target methods supplied".into()));
        }
        let mut stats = AnalysisStats::default();

        // Entry-point synthesis installs the root into the model.
        let synthesis = EntryPointSynthesizer::new(app, &self.config).synthesize();
        let root_sig = synthesis.root.sig.clone();
        stats.components = synthesis.components.len();
        stats.lifecycle_calls = synthesis.lifecycle_calls;
        let warnings = synthesis.warnings.clone();
        app.add_method(synthesis.root);
        // Read-only from here on; workers share the model.
        let app: &AppModel = app;

        // Call graph plus ICC splice; read-only afterwards.
        let (mut graph, cg_stats) = CallGraphBuilder::new(app).build(&root_sig);
        stats.opaque_calls = cg_stats.opaque_calls;
        let icc = IccResolver::new(app, &self.config);
        let sites = icc.scan(&graph);
        let resolutions: Vec<_> = sites.iter().map(|s| icc.resolve(s)).collect();
        let icc_stats = icc.splice(&mut graph, &resolutions);
        stats.icc_sites = icc_stats.sites;
        stats.icc_spliced = icc_stats.spliced_edges;
        stats.icc_imprecise = icc_stats.imprecise_sites;
        stats.cg_nodes = graph.node_count();
        stats.cg_edges = graph.edge_count();
        let graph = graph; // frozen

        // Path enumeration.
        let mut plugin = SinkSearchPlugin::new(targets.canonical_set());
        let enum_stats =
            PathEnumerator::new(app, &graph, &self.config).enumerate(&root_sig, &mut plugin);
        let paths = plugin.found;
        stats.paths_found = enum_stats.paths;
        info!(
            paths = paths.len(),
            ui_dropped = enum_stats.ui_dropped,
            "sink paths enumerated"
        );

        // Per-path constraint work on the bounded pool.
        let scheduler = PathScheduler::new(&self.config);
        let _watchdog = scheduler.watchdog();
        let outcomes = scheduler.run(
            &paths,
            |index, path, budget| self.evaluate_path(app, index, path, budget),
            |index, path, panic_msg| {
                Some(self.failed_event(app, index as u32, path, PathOutcome::Error(panic_msg)))
            },
        )?;

        for event in outcomes.iter().flatten() {
            match &event.outcome {
                PathOutcome::Timeout => stats.paths_timeout += 1,
                PathOutcome::Error(_) => stats.paths_error += 1,
                PathOutcome::Analyzed => {}
            }
        }
        // Dropped outcomes are infeasible paths, or cancelled ones once the
        // global budget fires.
        stats.paths_infeasible = outcomes.iter().filter(|o| o.is_none()).count();

        // Chain assembly with dependency resolution.
        let staging = StagingBuffer::new();
        let mut next_id = paths.len() as u32 + 1;
        let mut chain_id = 0u32;
        for event in outcomes.into_iter().flatten() {
            chain_id += 1;
            match self.assemble_chain(app, &graph, &root_sig, event, &mut next_id, chain_id, &scheduler)
            {
                Some(chain) => staging.push(chain),
                None => stats.chains_unsat += 1,
            }
        }

        let chains = staging.drain();
        stats.chains = chains.len();
        info!(
            chains = stats.chains,
            infeasible = stats.paths_infeasible,
            timeout = stats.paths_timeout,
            error = stats.paths_error,
            "analysis complete"
        );

        Ok(AppReport {
            package: app.package().to_string(),
            chains,
            stats,
            warnings,
        })
    }

    /// Worker-side path analysis. `None` drops the path (infeasible or
    /// cancelled); errors become structured events.
    fn evaluate_path(
        &self,
        app: &AppModel,
        index: usize,
        path: &CallPath,
        budget: &WorkBudget,
    ) -> Option<Event> {
        let engine = ConstraintEngine::new(app, &self.config, &self.oracle);
        match engine.evaluate(path, index as u32, budget) {
            Ok(eval) => {
                if eval.status == ConstraintStatus::TriviallyFalse {
                    debug!(path = index, "path constraint infeasible; dropped");
                    return None;
                }
                let mut classifier = TaintClassifier::new(self.config.taint_memo_cap);
                let mut resolver =
                    StringParamResolver::new(&eval.arena, &mut classifier, app.package());
                let params = resolver.resolve_event(&eval);
                let vulnerability = VulnerabilityKind::from_params(&params);
                Some(Event {
                    id: index as u32,
                    kind: EventKind::classify(app, &path.entry),
                    component: path.entry.class.clone(),
                    entry: path.entry.clone(),
                    path: path.clone(),
                    outcome: PathOutcome::Analyzed,
                    evaluation: Some(eval),
                    params,
                    vulnerability,
                })
            }
            Err(AnalysisError::Cancelled) => None,
            Err(AnalysisError::PathTimeout(_)) => {
                Some(self.failed_event(app, index as u32, path, PathOutcome::Timeout))
            }
            Err(err) => Some(self.failed_event(
                app,
                index as u32,
                path,
                PathOutcome::Error(err.to_string()),
            )),
        }
    }

    /// Timeout and error events keep the partial path, no evaluation.
    fn failed_event(
        &self,
        app: &AppModel,
        id: u32,
        path: &CallPath,
        outcome: PathOutcome,
    ) -> Event {
        Event {
            id,
            kind: EventKind::classify(app, &path.entry),
            component: path.entry.class.clone(),
            entry: path.entry.clone(),
            path: path.clone(),
            outcome,
            evaluation: None,
            params: Vec::new(),
            vulnerability: VulnerabilityKind::ExecutionOnly,
        }
    }

    /// Resolve heap dependencies and wrap the event into a chain. `None`
    /// when the chain conjunction is refuted.
    #[allow(clippy::too_many_arguments)]
    fn assemble_chain(
        &self,
        app: &AppModel,
        graph: &CallGraph,
        root_sig: &crate::shared::models::ir::MethodSig,
        mut event: Event,
        next_id: &mut u32,
        chain_id: u32,
        scheduler: &PathScheduler,
    ) -> Option<EventChain> {
        let mut supports = Vec::new();
        let mut satisfiable = Satisfiability::Unknown;

        if let Some(eval) = event.evaluation.as_mut() {
            if eval.heap_vars.is_empty() {
                satisfiable = self.oracle.check(&eval.constraint, &eval.arena);
            } else if !scheduler.cancelled() {
                let resolver =
                    DependencyResolver::new(app, graph, &self.config, &self.oracle, root_sig);
                match resolver.resolve(eval, next_id, &scheduler.follow_up_budget()) {
                    Ok((found, verdict)) => {
                        supports = found;
                        satisfiable = verdict;
                    }
                    Err(err) => {
                        debug!(error = %err, "dependency resolution aborted");
                    }
                }
            }
        }

        if satisfiable == Satisfiability::Unsat {
            return None;
        }
        Some(EventChain {
            id: chain_id,
            root: event,
            supports,
            satisfiable,
        })
    }
}
