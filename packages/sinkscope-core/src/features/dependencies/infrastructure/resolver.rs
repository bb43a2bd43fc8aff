//! Supporting-event resolution
//!
//! A root event whose constraint references a heap variable depends on some
//! other path writing that field first. The resolver enumerates field-write
//! paths with a specialized plugin, re-drives the constraint engine on
//! each, and records a dependence constraint equating the heap variable
//! with the written value. Supporters may recursively require further
//! supporters, bounded by the configured depth.
//!
//! Dependence predicates are imported into the root event's arena, so the
//! chain conjunction `root ∧ ⋀ dependence_i` is a single-arena formula the
//! oracle can decide.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::errors::AnalysisResult;
use crate::features::callgraph::domain::CallGraph;
use crate::features::constraints::infrastructure::engine::{
    ConstraintEngine, ConstraintStatus, PathEvaluation, WorkBudget,
};
use crate::features::pathfinder::infrastructure::enumerator::PathEnumerator;
use crate::features::pathfinder::infrastructure::plugins::FieldWritePlugin;
use crate::features::predicates::domain::{Expr, Predicate, SymbolicVar, VarId};
use crate::features::predicates::infrastructure::oracle::{SatOracle, Satisfiability};
use crate::features::reporting::domain::{Event, EventKind, PathOutcome, VulnerabilityKind};
use crate::shared::models::app::AppModel;
use crate::shared::models::ir::{ArithOp, MethodSig};

use crate::features::reporting::domain::SupportingEvent;

pub struct DependencyResolver<'a> {
    app: &'a AppModel,
    graph: &'a CallGraph,
    config: &'a AnalysisConfig,
    oracle: &'a dyn SatOracle,
    /// Enumeration root (the synthetic root method).
    root_sig: &'a MethodSig,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(
        app: &'a AppModel,
        graph: &'a CallGraph,
        config: &'a AnalysisConfig,
        oracle: &'a dyn SatOracle,
        root_sig: &'a MethodSig,
    ) -> Self {
        Self {
            app,
            graph,
            config,
            oracle,
            root_sig,
        }
    }

    /// Resolve the heap dependencies of `root_eval`. Returns the supporting
    /// events plus the oracle's verdict on the chain conjunction.
    pub fn resolve(
        &self,
        root_eval: &mut PathEvaluation,
        next_id: &mut u32,
        budget: &WorkBudget,
    ) -> AnalysisResult<(Vec<SupportingEvent>, Satisfiability)> {
        let mut supports: Vec<SupportingEvent> = Vec::new();
        let mut chain_constraint = root_eval.constraint.clone();

        let mut frontier: Vec<VarId> = root_eval.heap_vars.clone();
        let mut depth = 0usize;

        while !frontier.is_empty() && depth < self.config.max_support_depth {
            budget.checkpoint()?;
            let mut next_frontier: Vec<VarId> = Vec::new();

            for heap_var in std::mem::take(&mut frontier) {
                let SymbolicVar::Heap { field, .. } = root_eval.arena.get(heap_var).clone()
                else {
                    continue;
                };

                let mut plugin = FieldWritePlugin::new(field.clone());
                PathEnumerator::new(self.app, self.graph, self.config)
                    .enumerate(self.root_sig, &mut plugin);
                debug!(
                    field = %field,
                    candidates = plugin.found.len(),
                    "field-write paths for heap dependency"
                );

                let engine = ConstraintEngine::new(self.app, self.config, self.oracle);
                for path in plugin
                    .found
                    .into_iter()
                    .take(self.config.max_support_paths)
                {
                    budget.checkpoint()?;
                    *next_id += 1;
                    let eval = match engine.evaluate(&path, *next_id, budget) {
                        Ok(eval) => eval,
                        Err(err) if err.is_path_local() => return Err(err),
                        Err(err) => {
                            debug!(error = %err, "support path evaluation failed");
                            continue;
                        }
                    };
                    if eval.status == ConstraintStatus::TriviallyFalse {
                        continue;
                    }
                    let Some(stored) = eval.stored_value.clone() else {
                        continue;
                    };

                    // Import the supporter's constraint and stored value
                    // into the root arena, then assert the heap value is
                    // established.
                    let mut memo = FxHashMap::default();
                    let imported_constraint =
                        root_eval
                            .arena
                            .import_predicate(&eval.arena, &eval.constraint, &mut memo);
                    let imported_stored =
                        root_eval.arena.import_set(&eval.arena, &stored, &mut memo);
                    let mut establishes: Option<Predicate> = None;
                    for value in imported_stored.iter() {
                        let atom = Predicate::Expr(Expr::arith(
                            ArithOp::Eq,
                            Expr::var(heap_var),
                            value.clone(),
                        ));
                        establishes = Some(match establishes {
                            None => atom,
                            Some(p) => p.or(atom),
                        });
                    }
                    let dependence =
                        imported_constraint.and(establishes.unwrap_or(Predicate::True));

                    // Recursive requirements of the supporter surface as
                    // further frontier entries, already in the root arena.
                    for nested in &eval.heap_vars {
                        let mapped = root_eval.arena.import_var(&eval.arena, *nested, &mut memo);
                        next_frontier.push(mapped);
                    }

                    chain_constraint = chain_constraint.and(dependence.clone());
                    supports.push(SupportingEvent {
                        event: self.support_event(*next_id, &path, eval),
                        heap_var,
                        dependence,
                    });
                }
            }

            frontier = next_frontier;
            depth += 1;
        }

        let satisfiable = if supports.is_empty() {
            // Nothing to conjoin beyond the root constraint.
            self.oracle.check(&root_eval.constraint, &root_eval.arena)
        } else {
            self.oracle.check(&chain_constraint, &root_eval.arena)
        };
        Ok((supports, satisfiable))
    }

    fn support_event(
        &self,
        id: u32,
        path: &crate::features::pathfinder::domain::CallPath,
        eval: PathEvaluation,
    ) -> Event {
        Event {
            id,
            kind: EventKind::classify(self.app, &path.entry),
            component: path.entry.class.clone(),
            entry: path.entry.clone(),
            path: path.clone(),
            outcome: PathOutcome::Analyzed,
            evaluation: Some(eval),
            // Field writes have no sink arguments to classify.
            params: Vec::new(),
            vulnerability: VulnerabilityKind::ExecutionOnly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::callgraph::domain::CallEdgeKind;
    use crate::features::predicates::infrastructure::oracle::GroundTermOracle;
    use crate::shared::models::ir::{
        BodyBuilder, FieldRef, InvokeExpr, InvokeKind, MethodDef, Operand, Rvalue, Stmt, UnitRef,
    };
    use crate::features::pathfinder::domain::{CallPath, CallStep};
    use rustc_hash::FxHashSet;

    /// App with a reader path (field → sink) and a writer path
    /// (parameter → field).
    fn fixture() -> (AppModel, MethodSig, MethodSig, MethodSig, usize, usize) {
        let mut app = AppModel::default();
        let field = FieldRef::new("a.A", "path", "java.lang.String");

        let reader = MethodSig::new("a.A", "void", "read", vec![]);
        let mut rb = BodyBuilder::new().instance("this");
        rb.push(Stmt::Assign {
            dest: "x".into(),
            value: Rvalue::FieldLoad {
                base: Some("this".into()),
                field: field.clone(),
            },
        });
        let cond = rb.push(Stmt::If {
            op: crate::shared::models::ir::ArithOp::Ne,
            lhs: Operand::local("x"),
            rhs: Operand::null(),
        });
        let sink = rb.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: MethodSig::new("java.io.FileOutputStream", "void", "write", vec![
                    "java.lang.String".into(),
                ]),
                receiver: Some("fos".into()),
                args: vec![Operand::local("x")],
            },
        });
        let ret = rb.push(Stmt::Return { value: None });
        rb.set_branch(cond, sink, ret);
        app.add_method(MethodDef {
            sig: reader.clone(),
            is_static: false,
            body: Some(rb.finish()),
        });

        let writer = MethodSig::new("a.A", "void", "configure", vec!["java.lang.String".into()]);
        let mut wb = BodyBuilder::new().instance("this").params(&["p"]);
        let store = wb.push(Stmt::FieldStore {
            base: Some("this".into()),
            field: field.clone(),
            value: Operand::local("p"),
        });
        wb.push(Stmt::Return { value: None });
        app.add_method(MethodDef {
            sig: writer.clone(),
            is_static: false,
            body: Some(wb.finish()),
        });

        let root = MethodSig::new("synthetic.ApplicationRoot", "void", "root", vec![]);
        let mut root_b = BodyBuilder::new();
        root_b.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: reader.clone(),
                receiver: Some("c0".into()),
                args: vec![],
            },
        });
        root_b.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: writer.clone(),
                receiver: Some("c0".into()),
                args: vec![Operand::null()],
            },
        });
        root_b.push(Stmt::Return { value: None });
        app.add_method(MethodDef {
            sig: root.clone(),
            is_static: true,
            body: Some(root_b.finish()),
        });

        (app, root, reader, writer, sink, store)
    }

    #[test]
    fn test_supporting_event_found_and_chain_sat() {
        let (app, root, reader, writer, sink, _store) = fixture();
        let mut graph = CallGraph::new();
        graph.add_edge(
            &root.canonical(),
            UnitRef::new(&root, 0),
            &reader.canonical(),
            CallEdgeKind::Direct,
        );
        graph.add_edge(
            &root.canonical(),
            UnitRef::new(&root, 1),
            &writer.canonical(),
            CallEdgeKind::Direct,
        );

        let config = AnalysisConfig::default();
        let oracle = GroundTermOracle::default();
        let engine = ConstraintEngine::new(&app, &config, &oracle);

        let reader_path = CallPath {
            entry: reader.clone(),
            steps: vec![CallStep {
                caller: root.canonical(),
                unit: UnitRef::new(&root, 0),
                callee: reader.canonical(),
            }],
            terminal: UnitRef::new(&reader, sink),
            methods: FxHashSet::default(),
        };
        let mut root_eval = engine
            .evaluate(&reader_path, 0, &WorkBudget::unbounded())
            .unwrap();
        assert_eq!(root_eval.heap_vars.len(), 1);

        let resolver = DependencyResolver::new(&app, &graph, &config, &oracle, &root);
        let mut next_id = 100;
        let (supports, satisfiable) = resolver
            .resolve(&mut root_eval, &mut next_id, &WorkBudget::unbounded())
            .unwrap();

        assert_eq!(supports.len(), 1);
        let support = &supports[0];
        assert_eq!(support.event.entry, writer);
        // The dependence constraint mentions the root's heap variable.
        assert!(support.dependence.mentions_var(support.heap_var));
        assert!(root_eval.heap_vars.contains(&support.heap_var));
        assert_ne!(satisfiable, Satisfiability::Unsat);
    }
}
