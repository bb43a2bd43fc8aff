//! Call-path model

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::shared::models::ir::{MethodSig, UnitRef};

/// One edge on a call path: `caller` invokes `callee` at `unit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStep {
    pub caller: String,
    pub unit: UnitRef,
    pub callee: String,
}

/// Ordered call chain from the synthetic root to the statement invoking a
/// target. The method set is used to prune re-entry during traversal, so
/// every path is method-simple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPath {
    /// Entry method: the first component method after the root.
    pub entry: MethodSig,
    pub steps: Vec<CallStep>,
    /// The statement that fires the target.
    pub terminal: UnitRef,
    pub methods: FxHashSet<String>,
}

impl CallPath {
    /// Canonical signature of the method containing the terminal unit.
    pub fn terminal_method(&self) -> &str {
        &self.terminal.method
    }

    /// Method sequence root-first, ending at the terminal method.
    pub fn method_sequence(&self) -> Vec<&str> {
        let mut seq = Vec::with_capacity(self.steps.len() + 1);
        if let Some(first) = self.steps.first() {
            seq.push(first.caller.as_str());
        }
        for step in &self.steps {
            seq.push(step.callee.as_str());
        }
        if seq.is_empty() {
            seq.push(self.terminal.method.as_str());
        }
        seq
    }
}
