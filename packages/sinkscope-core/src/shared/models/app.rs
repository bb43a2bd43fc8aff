//! Application inventory
//!
//! The lifted view of one package: class hierarchy, method bodies, and the
//! manifest inventory. Produced externally as a JSON descriptor; read-only
//! for every stage except the entry-point synthesizer, which installs the
//! synthetic root before the call graph is built.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::ir::{ClassName, MethodBody, MethodDef, MethodSig};
use super::manifest::AppManifest;
use crate::errors::AnalysisResult;

/// Class declaration with its superclass lineage hooks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: ClassName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superclass: Option<ClassName>,
    #[serde(default)]
    pub interfaces: Vec<ClassName>,
}

/// Whole-program model for one application package.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppModel {
    pub manifest: AppManifest,
    #[serde(default)]
    pub classes: FxHashMap<ClassName, ClassDef>,
    /// Keyed by canonical signature.
    #[serde(default)]
    pub methods: FxHashMap<String, MethodDef>,
}

impl AppModel {
    pub fn package(&self) -> &str {
        &self.manifest.package
    }

    pub fn from_json_str(text: &str) -> AnalysisResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> AnalysisResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn add_class(&mut self, class: ClassDef) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn add_method(&mut self, method: MethodDef) {
        self.methods.insert(method.sig.canonical(), method);
    }

    pub fn method(&self, canonical: &str) -> Option<&MethodDef> {
        self.methods.get(canonical)
    }

    pub fn method_by_sig(&self, sig: &MethodSig) -> Option<&MethodDef> {
        self.methods.get(&sig.canonical())
    }

    pub fn body_of(&self, canonical: &str) -> Option<&MethodBody> {
        self.methods.get(canonical).and_then(|m| m.body.as_ref())
    }

    /// Superclass chain starting at `class` itself. Cycle-safe.
    pub fn lineage<'a>(&'a self, class: &'a str) -> Vec<&'a str> {
        let mut chain = Vec::new();
        let mut current = Some(class);
        while let Some(name) = current {
            if chain.contains(&name) {
                break;
            }
            chain.push(name);
            current = self
                .classes
                .get(name)
                .and_then(|c| c.superclass.as_deref());
        }
        chain
    }

    /// True when `class` (transitively) extends `ancestor` or lists it as an
    /// interface anywhere on the chain.
    pub fn extends(&self, class: &str, ancestor: &str) -> bool {
        for name in self.lineage(class) {
            if name == ancestor {
                return true;
            }
            if let Some(def) = self.classes.get(name) {
                if def.interfaces.iter().any(|i| i == ancestor) {
                    return true;
                }
            }
        }
        false
    }

    /// Resolve `subsignature` against the lineage of `class`: the first
    /// declaring class wins, mirroring virtual dispatch over the static
    /// receiver type.
    pub fn resolve_virtual(&self, class: &str, sub: &str) -> Option<&MethodDef> {
        for name in self.lineage(class) {
            for method in self.methods.values() {
                if method.sig.class == name && method.sig.subsignature() == sub {
                    return Some(method);
                }
            }
        }
        None
    }

    /// Find a declared method on `class`'s lineage by bare name.
    pub fn find_method_named(&self, class: &str, name: &str) -> Option<&MethodDef> {
        for cls in self.lineage(class) {
            for method in self.methods.values() {
                if method.sig.class == cls && method.sig.name == name {
                    return Some(method);
                }
            }
        }
        None
    }
}
