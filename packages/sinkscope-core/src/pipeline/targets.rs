//! Target-method list
//!
//! One canonical `<declaringClass: returnType name(paramTypes)>` signature
//! per line; `#` comments and blank lines ignored. A malformed line is a
//! configuration error.

use rustc_hash::FxHashSet;
use std::path::Path;

use crate::errors::{AnalysisError, AnalysisResult};
use crate::shared::models::ir::MethodSig;

/// User-supplied sink set, keyed by canonical signature.
#[derive(Debug, Clone, Default)]
pub struct TargetSet {
    sigs: FxHashSet<String>,
}

impl TargetSet {
    pub fn from_sigs(sigs: impl IntoIterator<Item = MethodSig>) -> Self {
        Self {
            sigs: sigs.into_iter().map(|s| s.canonical()).collect(),
        }
    }

    pub fn from_str(text: &str) -> AnalysisResult<Self> {
        let mut sigs = FxHashSet::default();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let sig = MethodSig::parse(line).map_err(|_| {
                AnalysisError::Config(format!(
                    "malformed target signature on line {}: {line:?}",
                    lineno + 1
                ))
            })?;
            sigs.insert(sig.canonical());
        }
        if sigs.is_empty() {
            return Err(AnalysisError::Config("target list is empty".into()));
        }
        Ok(Self { sigs })
    }

    pub fn from_file(path: &Path) -> AnalysisResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.sigs.contains(canonical)
    }

    pub fn canonical_set(&self) -> FxHashSet<String> {
        self.sigs.clone()
    }

    pub fn len(&self) -> usize {
        self.sigs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sigs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_comments() {
        let text = "\
# file sinks
<java.io.FileOutputStream: void write(byte[])>

<java.io.FileOutputStream: void write(int)>
";
        let targets = TargetSet::from_str(text).unwrap();
        assert_eq!(targets.len(), 2);
        assert!(targets.contains("<java.io.FileOutputStream: void write(byte[])>"));
    }

    #[test]
    fn test_malformed_line_is_config_error() {
        let err = TargetSet::from_str("not a signature\n").unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_empty_list_rejected() {
        let err = TargetSet::from_str("# only comments\n").unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }
}
