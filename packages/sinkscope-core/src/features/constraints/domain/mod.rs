//! Dataflow fact model
//!
//! The per-program-point fact: local and heap expression sets plus the
//! accumulated control-flow constraint. Merging at a join point is
//! pointwise union of sets and Or of constraints.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::features::predicates::domain::{ExprSet, HeapBase, Predicate};
use crate::shared::models::ir::{FieldRef, LocalId};

/// Abstract heap location: (receiver variable, field) for instance fields,
/// (declaring class, field) for statics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeapLoc {
    pub base: HeapBase,
    pub field: FieldRef,
}

/// Per-program-point dataflow fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataMap {
    pub locals: FxHashMap<LocalId, ExprSet>,
    pub heap: FxHashMap<HeapLoc, ExprSet>,
    /// Conjunction of all branch conditions taken to reach this point;
    /// widened by Or at joins.
    pub constraint: Predicate,
}

impl Default for DataMap {
    fn default() -> Self {
        Self::new()
    }
}

impl DataMap {
    pub fn new() -> Self {
        Self {
            locals: FxHashMap::default(),
            heap: FxHashMap::default(),
            constraint: Predicate::True,
        }
    }

    /// Merge `other` into `self` at a join point. Returns true when the
    /// fact changed, which re-queues the node in the fixpoint.
    pub fn merge_from(&mut self, other: &DataMap, cap: usize) -> bool {
        let mut changed = false;

        for (local, set) in &other.locals {
            match self.locals.get_mut(local) {
                Some(existing) => {
                    let before = existing.clone();
                    existing.union(set, cap);
                    if *existing != before {
                        changed = true;
                    }
                }
                None => {
                    self.locals.insert(local.clone(), set.clone());
                    changed = true;
                }
            }
        }

        for (loc, set) in &other.heap {
            match self.heap.get_mut(loc) {
                Some(existing) => {
                    let before = existing.clone();
                    existing.union(set, cap);
                    if *existing != before {
                        changed = true;
                    }
                }
                None => {
                    self.heap.insert(loc.clone(), set.clone());
                    changed = true;
                }
            }
        }

        if !other.constraint.structurally_eq(&self.constraint) {
            let widened = self.constraint.clone().or(other.constraint.clone());
            if !widened.structurally_eq(&self.constraint) {
                self.constraint = widened;
                changed = true;
            }
        }

        changed
    }
}
