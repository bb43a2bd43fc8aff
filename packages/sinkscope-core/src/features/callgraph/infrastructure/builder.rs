//! Call-graph builder
//!
//! Breadth-first walk over bodies reachable from the synthetic root. Static
//! and special invokes resolve to their declared signature; virtual and
//! interface invokes resolve through the receiver's static-type lineage.
//! Calls into bodies we do not have (framework, native, reflective) are
//! counted as opaque and left to the constraint engine's method-reference
//! handling.

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::shared::models::app::AppModel;
use crate::shared::models::ir::{InvokeKind, MethodSig, Stmt, UnitRef};

use super::super::domain::{CallEdgeKind, CallGraph};

/// Builder statistics, surfaced by the driver summary.
#[derive(Debug, Default, Clone)]
pub struct CallGraphStats {
    pub reachable_methods: usize,
    pub direct_edges: usize,
    /// Invocations with no analyzable body (framework, native, reflection).
    pub opaque_calls: usize,
}

pub struct CallGraphBuilder<'a> {
    app: &'a AppModel,
}

impl<'a> CallGraphBuilder<'a> {
    pub fn new(app: &'a AppModel) -> Self {
        Self { app }
    }

    /// Build the direct-call graph from `root`.
    pub fn build(&self, root: &MethodSig) -> (CallGraph, CallGraphStats) {
        let mut graph = CallGraph::new();
        let mut stats = CallGraphStats::default();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut queue: VecDeque<String> = VecDeque::new();

        let root_key = root.canonical();
        graph.ensure_node(&root_key);
        seen.insert(root_key.clone());
        queue.push_back(root_key);

        while let Some(current) = queue.pop_front() {
            let Some(body) = self.app.body_of(&current) else {
                continue;
            };
            stats.reachable_methods += 1;

            for (index, stmt) in body.units.iter().enumerate() {
                let Stmt::Invoke { call, .. } = stmt else {
                    continue;
                };
                let Some(target) = self.resolve(call.kind, &call.sig) else {
                    stats.opaque_calls += 1;
                    continue;
                };

                let unit = UnitRef {
                    method: current.clone(),
                    index,
                };
                graph.add_edge(&current, unit, &target, CallEdgeKind::Direct);
                stats.direct_edges += 1;

                if seen.insert(target.clone()) {
                    queue.push_back(target);
                }
            }
        }

        debug!(
            methods = stats.reachable_methods,
            edges = stats.direct_edges,
            opaque = stats.opaque_calls,
            "call graph built"
        );
        (graph, stats)
    }

    /// Resolve an invocation to a method with a body, or None for opaque
    /// targets.
    fn resolve(&self, kind: InvokeKind, sig: &MethodSig) -> Option<String> {
        match kind {
            InvokeKind::Static | InvokeKind::Special => self
                .app
                .method(&sig.canonical())
                .filter(|m| m.body.is_some())
                .map(|m| m.sig.canonical()),
            InvokeKind::Virtual | InvokeKind::Interface => self
                .app
                .resolve_virtual(&sig.class, &sig.subsignature())
                .filter(|m| m.body.is_some())
                .map(|m| m.sig.canonical()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::app::ClassDef;
    use crate::shared::models::ir::{BodyBuilder, InvokeExpr, MethodDef, Operand};

    fn method_with_call(class: &str, name: &str, callee: MethodSig) -> MethodDef {
        let sig = MethodSig::new(class, "void", name, vec![]);
        let mut b = BodyBuilder::new().instance("this");
        b.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: callee,
                receiver: Some("this".into()),
                args: vec![],
            },
        });
        b.push(Stmt::Return { value: None });
        MethodDef {
            sig,
            is_static: false,
            body: Some(b.finish()),
        }
    }

    fn leaf(class: &str, name: &str) -> MethodDef {
        let sig = MethodSig::new(class, "void", name, vec![]);
        let mut b = BodyBuilder::new().instance("this");
        b.push(Stmt::Return { value: None });
        MethodDef {
            sig,
            is_static: false,
            body: Some(b.finish()),
        }
    }

    #[test]
    fn test_transitive_reachability() {
        let mut app = AppModel::default();
        app.add_class(ClassDef {
            name: "a.A".into(),
            ..Default::default()
        });
        let b_sig = MethodSig::new("a.A", "void", "b", vec![]);
        let c_sig = MethodSig::new("a.A", "void", "c", vec![]);
        app.add_method(method_with_call("a.A", "a", b_sig.clone()));
        app.add_method(method_with_call("a.A", "b", c_sig.clone()));
        app.add_method(leaf("a.A", "c"));

        let root = MethodSig::new("a.A", "void", "a", vec![]);
        let (graph, stats) = CallGraphBuilder::new(&app).build(&root);

        assert!(graph.contains_node(&b_sig.canonical()));
        assert!(graph.contains_node(&c_sig.canonical()));
        assert_eq!(stats.direct_edges, 2);
        assert_eq!(stats.reachable_methods, 3);
    }

    #[test]
    fn test_opaque_framework_call_counted() {
        let mut app = AppModel::default();
        let sink = MethodSig::new("java.io.FileOutputStream", "void", "write", vec!["byte[]".into()]);
        app.add_method(method_with_call("a.A", "a", sink));

        let root = MethodSig::new("a.A", "void", "a", vec![]);
        let (graph, stats) = CallGraphBuilder::new(&app).build(&root);

        assert_eq!(stats.opaque_calls, 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_virtual_resolution_through_lineage() {
        let mut app = AppModel::default();
        app.add_class(ClassDef {
            name: "a.Base".into(),
            ..Default::default()
        });
        app.add_class(ClassDef {
            name: "a.Derived".into(),
            superclass: Some("a.Base".into()),
            ..Default::default()
        });
        app.add_method(leaf("a.Base", "hook"));
        // Call declared against the derived type resolves to the base body.
        app.add_method(method_with_call(
            "a.Main",
            "run",
            MethodSig::new("a.Derived", "void", "hook", vec![]),
        ));

        let root = MethodSig::new("a.Main", "void", "run", vec![]);
        let (graph, _) = CallGraphBuilder::new(&app).build(&root);
        assert!(graph.contains_node("<a.Base: void hook()>"));
    }
}
