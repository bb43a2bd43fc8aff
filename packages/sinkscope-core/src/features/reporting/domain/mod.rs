//! Event model

use serde::{Deserialize, Serialize};

use crate::features::constraints::infrastructure::engine::PathEvaluation;
use crate::features::pathfinder::domain::CallPath;
use crate::features::predicates::domain::{Predicate, VarId};
use crate::features::predicates::infrastructure::oracle::Satisfiability;
use crate::features::strings::domain::{PathType, StringParamConstraint};
use crate::shared::models::app::AppModel;
use crate::shared::models::ir::{ClassName, MethodSig};

/// Entry-point classification, derived from the entry class's lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Activity,
    Service,
    Receiver,
    Ui,
    None,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Activity => "activity",
            EventKind::Service => "service",
            EventKind::Receiver => "receiver",
            EventKind::Ui => "ui",
            EventKind::None => "none",
        }
    }

    /// Classify an entry method by its declaring class's lineage.
    pub fn classify(app: &AppModel, entry: &MethodSig) -> EventKind {
        if entry.name == "onClick"
            || app.extends(&entry.class, "android.view.View$OnClickListener")
        {
            return EventKind::Ui;
        }
        if app.extends(&entry.class, "android.app.Activity") {
            return EventKind::Activity;
        }
        if app.extends(&entry.class, "android.app.Service") {
            return EventKind::Service;
        }
        if app.extends(&entry.class, "android.content.BroadcastReceiver") {
            return EventKind::Receiver;
        }
        EventKind::None
    }
}

/// Vulnerability classification of one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VulnerabilityKind {
    Hijacking,
    TraversalPartial,
    TraversalFull,
    ExecutionOnly,
}

impl VulnerabilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VulnerabilityKind::Hijacking => "hijacking",
            VulnerabilityKind::TraversalPartial => "traversal_partial",
            VulnerabilityKind::TraversalFull => "traversal_full",
            VulnerabilityKind::ExecutionOnly => "execution_only",
        }
    }

    /// On-disk category directory.
    pub fn category_dir(&self) -> &'static str {
        match self {
            VulnerabilityKind::Hijacking => "hijacking",
            VulnerabilityKind::TraversalPartial => "traversal/partial",
            VulnerabilityKind::TraversalFull => "traversal/full",
            VulnerabilityKind::ExecutionOnly => "execution_only",
        }
    }

    /// Most severe classification across the sink's arguments.
    pub fn from_params(params: &[StringParamConstraint]) -> VulnerabilityKind {
        let mut worst = VulnerabilityKind::ExecutionOnly;
        for p in params {
            let kind = match p.path_type {
                PathType::FullyControlled => VulnerabilityKind::TraversalFull,
                PathType::PartiallyControlled => VulnerabilityKind::TraversalPartial,
                PathType::HardCoded => VulnerabilityKind::Hijacking,
                PathType::ExecutionOnly => VulnerabilityKind::ExecutionOnly,
            };
            if Self::rank(kind) > Self::rank(worst) {
                worst = kind;
            }
        }
        worst
    }

    fn rank(kind: VulnerabilityKind) -> u8 {
        match kind {
            VulnerabilityKind::ExecutionOnly => 0,
            VulnerabilityKind::Hijacking => 1,
            VulnerabilityKind::TraversalPartial => 2,
            VulnerabilityKind::TraversalFull => 3,
        }
    }
}

/// Terminal status of one path's worker-side analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum PathOutcome {
    Analyzed,
    /// Per-path budget exhausted; the partial path is recorded.
    Timeout,
    /// Internal failure, caught at the worker boundary.
    Error(String),
}

/// One classified path: the root unit of an event chain, or a supporter.
#[derive(Debug)]
pub struct Event {
    pub id: u32,
    pub kind: EventKind,
    /// Component class hosting the entry method.
    pub component: ClassName,
    pub entry: MethodSig,
    pub path: CallPath,
    pub outcome: PathOutcome,
    /// Absent for timeout and error outcomes.
    pub evaluation: Option<PathEvaluation>,
    pub params: Vec<StringParamConstraint>,
    pub vulnerability: VulnerabilityKind,
}

impl Event {
    /// Method sequence plus the terminal unit, rendered for the report.
    pub fn path_strings(&self, app: &AppModel) -> Vec<String> {
        let mut out: Vec<String> = self
            .path
            .method_sequence()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        let terminal = app
            .body_of(&self.path.terminal.method)
            .and_then(|b| b.unit(self.path.terminal.index))
            .map(|stmt| stmt.to_string())
            .unwrap_or_else(|| self.path.terminal.to_string());
        out.push(terminal);
        out
    }
}

/// A supporter: its own event plus the dependence constraint asserting
/// that executing its path establishes the heap value the root consumes.
/// The dependence predicate lives in the root event's arena so the chain
/// conjunction stays well-formed.
#[derive(Debug)]
pub struct SupportingEvent {
    pub event: Event,
    /// Heap variable (root arena) this supporter satisfies.
    pub heap_var: VarId,
    pub dependence: Predicate,
}

/// Root event plus its supporters.
#[derive(Debug)]
pub struct EventChain {
    pub id: u32,
    pub root: Event,
    pub supports: Vec<SupportingEvent>,
    /// Verdict on root constraint ∧ all dependence constraints.
    pub satisfiable: Satisfiability,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::strings::domain::ConstructionOp;

    fn param(path_type: PathType) -> StringParamConstraint {
        StringParamConstraint {
            arg_index: Some(0),
            path_type,
            literal: None,
            prefix: None,
            sources: vec![],
            construction: ConstructionOp::Direct,
        }
    }

    #[test]
    fn test_vulnerability_from_params_takes_worst() {
        let params = vec![param(PathType::HardCoded), param(PathType::FullyControlled)];
        assert_eq!(
            VulnerabilityKind::from_params(&params),
            VulnerabilityKind::TraversalFull
        );
        assert_eq!(
            VulnerabilityKind::from_params(&[param(PathType::HardCoded)]),
            VulnerabilityKind::Hijacking
        );
        assert_eq!(
            VulnerabilityKind::from_params(&[]),
            VulnerabilityKind::ExecutionOnly
        );
    }

    #[test]
    fn test_category_dirs() {
        assert_eq!(VulnerabilityKind::TraversalPartial.category_dir(), "traversal/partial");
        assert_eq!(VulnerabilityKind::ExecutionOnly.category_dir(), "execution_only");
    }

    #[test]
    fn test_event_kind_classification() {
        use crate::shared::models::app::ClassDef;
        let mut app = AppModel::default();
        app.add_class(ClassDef {
            name: "a.Main".into(),
            superclass: Some("android.app.Activity".into()),
            interfaces: vec![],
        });
        let entry = MethodSig::new("a.Main", "void", "onCreate", vec![]);
        assert_eq!(EventKind::classify(&app, &entry), EventKind::Activity);

        let click = MethodSig::new("a.Main", "void", "onClick", vec![]);
        assert_eq!(EventKind::classify(&app, &click), EventKind::Ui);

        let unknown = MethodSig::new("a.Helper", "void", "run", vec![]);
        assert_eq!(EventKind::classify(&app, &unknown), EventKind::None);
    }
}
