//! Manifest inventory
//!
//! The manifest reader itself is an external collaborator; these types are
//! the interface it fills in. The maps below are what the ICC resolver
//! consults for implicit-intent and content-URI routing.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::ir::ClassName;

/// Declared component kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Activity,
    Service,
    Receiver,
    Provider,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Activity => "activity",
            ComponentKind::Service => "service",
            ComponentKind::Receiver => "receiver",
            ComponentKind::Provider => "provider",
        }
    }
}

/// Intent filter attached to a component declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentFilter {
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// One declared component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDecl {
    pub class_name: ClassName,
    pub kind: ComponentKind,
    #[serde(default)]
    pub exported: bool,
    #[serde(default)]
    pub intent_filters: Vec<IntentFilter>,
    /// Content authority, providers only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

/// Component inventory for one application package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppManifest {
    pub package: String,
    #[serde(default)]
    pub components: Vec<ComponentDecl>,
}

impl AppManifest {
    /// Intent action → declaring components.
    pub fn action_map(&self) -> FxHashMap<&str, Vec<&ComponentDecl>> {
        let mut map: FxHashMap<&str, Vec<&ComponentDecl>> = FxHashMap::default();
        for component in &self.components {
            for filter in &component.intent_filters {
                for action in &filter.actions {
                    map.entry(action.as_str()).or_default().push(component);
                }
            }
        }
        map
    }

    /// Content authority → provider component.
    pub fn authority_map(&self) -> FxHashMap<&str, &ComponentDecl> {
        self.components
            .iter()
            .filter(|c| c.kind == ComponentKind::Provider)
            .filter_map(|c| c.authority.as_deref().map(|a| (a, c)))
            .collect()
    }

    pub fn exported_of_kind(&self, kind: ComponentKind) -> Vec<&ComponentDecl> {
        self.components
            .iter()
            .filter(|c| c.kind == kind && c.exported)
            .collect()
    }

    pub fn component(&self, class_name: &str) -> Option<&ComponentDecl> {
        self.components.iter().find(|c| c.class_name == class_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> AppManifest {
        AppManifest {
            package: "com.example.app".into(),
            components: vec![
                ComponentDecl {
                    class_name: "com.example.app.MainActivity".into(),
                    kind: ComponentKind::Activity,
                    exported: true,
                    intent_filters: vec![IntentFilter {
                        actions: vec!["android.intent.action.MAIN".into()],
                        categories: vec![],
                    }],
                    authority: None,
                },
                ComponentDecl {
                    class_name: "com.example.app.DataProvider".into(),
                    kind: ComponentKind::Provider,
                    exported: false,
                    intent_filters: vec![],
                    authority: Some("com.example.app.data".into()),
                },
            ],
        }
    }

    #[test]
    fn test_action_map() {
        let m = manifest();
        let map = m.action_map();
        let hits = map.get("android.intent.action.MAIN").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].class_name, "com.example.app.MainActivity");
    }

    #[test]
    fn test_authority_map() {
        let m = manifest();
        let map = m.authority_map();
        assert_eq!(
            map.get("com.example.app.data").unwrap().class_name,
            "com.example.app.DataProvider"
        );
    }

    #[test]
    fn test_exported_filter() {
        let m = manifest();
        assert_eq!(m.exported_of_kind(ComponentKind::Activity).len(), 1);
        assert!(m.exported_of_kind(ComponentKind::Provider).is_empty());
    }
}
