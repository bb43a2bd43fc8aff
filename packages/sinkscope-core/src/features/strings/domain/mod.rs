//! String-parameter constraint model

use serde::{Deserialize, Serialize};

use crate::features::taint::domain::InputSource;

/// Control classification of one sink path argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathType {
    #[serde(rename = "HARD_CODED")]
    HardCoded,
    #[serde(rename = "PARTIALLY_CONTROLLED")]
    PartiallyControlled,
    #[serde(rename = "FULLY_CONTROLLED")]
    FullyControlled,
    #[serde(rename = "EXECUTION_ONLY")]
    ExecutionOnly,
}

impl PathType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PathType::HardCoded => "HARD_CODED",
            PathType::PartiallyControlled => "PARTIALLY_CONTROLLED",
            PathType::FullyControlled => "FULLY_CONTROLLED",
            PathType::ExecutionOnly => "EXECUTION_ONLY",
        }
    }

    /// Severity order used when one argument resolves to several values.
    pub fn severity(&self) -> u8 {
        match self {
            PathType::ExecutionOnly => 0,
            PathType::HardCoded => 1,
            PathType::PartiallyControlled => 2,
            PathType::FullyControlled => 3,
        }
    }
}

/// Root construction operation observed while walking the argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructionOp {
    Direct,
    Concatenation,
    Builder,
    Format,
    FileConstructor,
}

impl ConstructionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstructionOp::Direct => "direct",
            ConstructionOp::Concatenation => "concatenation",
            ConstructionOp::Builder => "builder",
            ConstructionOp::Format => "format",
            ConstructionOp::FileConstructor => "file_constructor",
        }
    }
}

/// Constraint for one string argument of one sink invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StringParamConstraint {
    /// Argument slot; `None` when the path was recovered from the sink's
    /// file-valued receiver.
    pub arg_index: Option<usize>,
    pub path_type: PathType,
    /// Reconstructed literal for HARD_CODED arguments, when materializable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
    /// Fixed prefix for PARTIALLY_CONTROLLED arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    pub sources: Vec<InputSource>,
    pub construction: ConstructionOp,
}

impl StringParamConstraint {
    pub fn execution_only() -> Self {
        Self {
            arg_index: None,
            path_type: PathType::ExecutionOnly,
            literal: None,
            prefix: None,
            sources: Vec::new(),
            construction: ConstructionOp::Direct,
        }
    }
}
