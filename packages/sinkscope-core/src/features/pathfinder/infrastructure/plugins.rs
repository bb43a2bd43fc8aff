//! Search plugins
//!
//! A plugin observes every statement during traversal, declares targets,
//! and receives a callback per discovered path. The sink plugin drives the
//! main analysis; the field-write plugin drives supporting-path discovery
//! for heap dependencies.

use rustc_hash::FxHashSet;

use crate::features::callgraph::domain::CallGraph;
use crate::shared::models::app::AppModel;
use crate::shared::models::ir::{FieldRef, MethodSig, Stmt, UnitRef};

use super::super::domain::CallPath;

/// Traversal observer.
pub trait SearchPlugin {
    /// Declare `stmt` a target statement.
    fn is_target(
        &self,
        app: &AppModel,
        method: &MethodSig,
        unit_index: usize,
        stmt: &Stmt,
        graph: &CallGraph,
    ) -> bool;

    /// Callback per discovered target path.
    fn on_path(&mut self, path: CallPath);
}

/// Matches invocations of user-listed sink methods, either by the declared
/// signature or through the graph edges out of the statement.
pub struct SinkSearchPlugin {
    targets: FxHashSet<String>,
    pub found: Vec<CallPath>,
}

impl SinkSearchPlugin {
    pub fn new(targets: FxHashSet<String>) -> Self {
        Self {
            targets,
            found: Vec::new(),
        }
    }

    /// The sink signature matched at `unit`, for downstream classification.
    pub fn matched_sink(&self, app: &AppModel, unit: &UnitRef) -> Option<MethodSig> {
        let body = app.body_of(&unit.method)?;
        match body.unit(unit.index)? {
            Stmt::Invoke { call, .. } => Some(call.sig.clone()),
            _ => None,
        }
    }
}

impl SearchPlugin for SinkSearchPlugin {
    fn is_target(
        &self,
        _app: &AppModel,
        method: &MethodSig,
        unit_index: usize,
        stmt: &Stmt,
        graph: &CallGraph,
    ) -> bool {
        let Stmt::Invoke { call, .. } = stmt else {
            return false;
        };
        if self.targets.contains(&call.sig.canonical()) {
            return true;
        }
        // Resolved targets via the graph edges out of this statement.
        let unit = UnitRef::new(method, unit_index);
        graph
            .callees_at(&unit)
            .iter()
            .any(|callee| self.targets.contains(*callee))
    }

    fn on_path(&mut self, path: CallPath) {
        self.found.push(path);
    }
}

/// Matches stores to a specific field; used by the dependency resolver to
/// find paths that establish a heap value.
pub struct FieldWritePlugin {
    field: FieldRef,
    pub found: Vec<CallPath>,
}

impl FieldWritePlugin {
    pub fn new(field: FieldRef) -> Self {
        Self {
            field,
            found: Vec::new(),
        }
    }
}

impl SearchPlugin for FieldWritePlugin {
    fn is_target(
        &self,
        _app: &AppModel,
        _method: &MethodSig,
        _unit_index: usize,
        stmt: &Stmt,
        _graph: &CallGraph,
    ) -> bool {
        match stmt {
            Stmt::FieldStore { field, .. } => {
                field.class == self.field.class && field.name == self.field.name
            }
            _ => false,
        }
    }

    fn on_path(&mut self, path: CallPath) {
        self.found.push(path);
    }
}
