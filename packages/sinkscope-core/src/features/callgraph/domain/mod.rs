//! Call-graph model
//!
//! Nodes are canonical method signatures; parallel edges are distinguished
//! by their call-site unit. The add-edge operation is public so the ICC
//! resolver can splice edges without touching graph internals.

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::features::icc::domain::IccKind;
use crate::shared::models::ir::UnitRef;

/// Edge provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallEdgeKind {
    /// Statically resolved invocation.
    Direct,
    /// Spliced inter-component edge.
    Icc(IccKind),
}

/// One call edge: the invoking unit plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEdge {
    pub unit: UnitRef,
    pub kind: CallEdgeKind,
}

/// Directed call multigraph.
#[derive(Debug, Default)]
pub struct CallGraph {
    graph: StableDiGraph<String, CallEdge>,
    index: FxHashMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a node for `sig`, returning its index.
    pub fn ensure_node(&mut self, sig: &str) -> NodeIndex {
        if let Some(ix) = self.index.get(sig) {
            return *ix;
        }
        let ix = self.graph.add_node(sig.to_string());
        self.index.insert(sig.to_string(), ix);
        ix
    }

    pub fn contains_node(&self, sig: &str) -> bool {
        self.index.contains_key(sig)
    }

    /// Public add-edge operation: `src` calls `dst` at `unit`.
    pub fn add_edge(&mut self, src: &str, unit: UnitRef, dst: &str, kind: CallEdgeKind) {
        let s = self.ensure_node(src);
        let d = self.ensure_node(dst);
        self.graph.add_edge(s, d, CallEdge { unit, kind });
    }

    /// Outgoing edges of `sig` as `(edge, target signature)` pairs.
    pub fn outgoing(&self, sig: &str) -> Vec<(&CallEdge, &str)> {
        let Some(ix) = self.index.get(sig) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(*ix, Direction::Outgoing)
            .map(|e| (e.weight(), self.graph[e.target()].as_str()))
            .collect()
    }

    /// Targets reachable from a specific call-site unit.
    pub fn callees_at(&self, unit: &UnitRef) -> Vec<&str> {
        self.outgoing(&unit.method)
            .into_iter()
            .filter(|(edge, _)| edge.unit == *unit)
            .map(|(_, target)| target)
            .collect()
    }

    /// True when an edge `src --unit--> dst` is retrievable through the
    /// outgoing-edge query.
    pub fn has_edge(&self, src: &str, unit: &UnitRef, dst: &str) -> bool {
        self.outgoing(src)
            .iter()
            .any(|(edge, target)| edge.unit == *unit && *target == dst)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(|s| s.as_str())
    }
}
