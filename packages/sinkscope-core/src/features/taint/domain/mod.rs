//! Taint domain models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Taint lattice: Clean < Partial, Full < Partial under `combine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaintClass {
    Clean,
    Partial,
    Full,
}

impl TaintClass {
    /// Binary combination: equal classes keep the class, any mixture is
    /// Partial.
    pub fn combine(a: TaintClass, b: TaintClass) -> TaintClass {
        if a == b {
            a
        } else {
            TaintClass::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaintClass::Clean => "clean",
            TaintClass::Partial => "partial",
            TaintClass::Full => "full",
        }
    }
}

/// Kind of external input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    IntentExtra,
    UriQuery,
    BundleValue,
    ContentValues,
    Preference,
    Field,
    Parameter,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::IntentExtra => "intent_extra",
            SourceKind::UriQuery => "uri_query",
            SourceKind::BundleValue => "bundle_value",
            SourceKind::ContentValues => "content_values",
            SourceKind::Preference => "preference",
            SourceKind::Field => "field",
            SourceKind::Parameter => "parameter",
        }
    }
}

/// One external input source: accessor plus the literal key when the call
/// site carried one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSource {
    pub kind: SourceKind,
    /// `Class.method` for accessors, the parameter name for parameters,
    /// `Class.field` for fields.
    pub accessor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl InputSource {
    pub fn parameter(name: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Parameter,
            accessor: name.into(),
            key: None,
        }
    }

    pub fn field(accessor: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Field,
            accessor: accessor.into(),
            key: None,
        }
    }

    pub fn accessor(kind: SourceKind, accessor: impl Into<String>, key: Option<String>) -> Self {
        Self {
            kind,
            accessor: accessor.into(),
            key,
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.kind, &self.key) {
            (SourceKind::Parameter, _) => write!(f, "parameter({})", self.accessor),
            (SourceKind::Field, _) => write!(f, "field({})", self.accessor),
            (_, Some(key)) => write!(f, "{}(\"{}\")", self.accessor, key),
            (_, None) => write!(f, "{}()", self.accessor),
        }
    }
}

/// Classification result: lattice value plus unioned provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub class: TaintClass,
    pub sources: Vec<InputSource>,
}

impl Classification {
    pub fn clean() -> Self {
        Self {
            class: TaintClass::Clean,
            sources: Vec::new(),
        }
    }

    pub fn full(sources: Vec<InputSource>) -> Self {
        Self {
            class: TaintClass::Full,
            sources,
        }
    }

    /// Combine two classifications, unioning provenance.
    pub fn combine(a: &Classification, b: &Classification) -> Classification {
        let mut sources = a.sources.clone();
        for s in &b.sources {
            if !sources.contains(s) {
                sources.push(s.clone());
            }
        }
        Classification {
            class: TaintClass::combine(a.class, b.class),
            sources,
        }
    }
}
