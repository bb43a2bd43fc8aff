//! Lifecycle method tables
//!
//! Exactly one signature per component kind is required; the others are
//! attempted and silently skipped when the class does not declare them.
//! Intent-filter actions are routing selectors, not lifecycle calls, so no
//! entry is synthesized for them.

use once_cell::sync::Lazy;

use crate::shared::models::ir::MethodSig;
use crate::shared::models::manifest::ComponentKind;

/// Class-independent method shape; bound to a concrete component class at
/// synthesis time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleShape {
    pub ret: &'static str,
    pub name: &'static str,
    pub params: &'static [&'static str],
}

impl LifecycleShape {
    pub const fn new(ret: &'static str, name: &'static str, params: &'static [&'static str]) -> Self {
        Self { ret, name, params }
    }

    pub fn sig_for(&self, class: &str) -> MethodSig {
        MethodSig::new(
            class,
            self.ret,
            self.name,
            self.params.iter().map(|p| p.to_string()).collect(),
        )
    }

    pub fn subsignature(&self) -> String {
        format!("{} {}({})", self.ret, self.name, self.params.join(","))
    }
}

/// Lifecycle table entry for one component kind.
#[derive(Debug, Clone)]
pub struct LifecycleSpec {
    pub kind: ComponentKind,
    pub required: LifecycleShape,
    pub optional: Vec<LifecycleShape>,
}

static LIFECYCLE_TABLE: Lazy<Vec<LifecycleSpec>> = Lazy::new(|| {
    vec![
        LifecycleSpec {
            kind: ComponentKind::Activity,
            required: LifecycleShape::new("void", "onCreate", &["android.os.Bundle"]),
            optional: vec![
                LifecycleShape::new("void", "onStart", &[]),
                LifecycleShape::new("void", "onResume", &[]),
                LifecycleShape::new("void", "onPause", &[]),
                LifecycleShape::new("void", "onStop", &[]),
                LifecycleShape::new("void", "onRestart", &[]),
                LifecycleShape::new("void", "onDestroy", &[]),
                LifecycleShape::new("void", "onNewIntent", &["android.content.Intent"]),
            ],
        },
        LifecycleSpec {
            kind: ComponentKind::Service,
            required: LifecycleShape::new("void", "onCreate", &[]),
            optional: vec![
                LifecycleShape::new(
                    "int",
                    "onStartCommand",
                    &["android.content.Intent", "int", "int"],
                ),
                LifecycleShape::new("android.os.IBinder", "onBind", &["android.content.Intent"]),
                LifecycleShape::new("void", "onDestroy", &[]),
            ],
        },
        LifecycleSpec {
            kind: ComponentKind::Receiver,
            required: LifecycleShape::new(
                "void",
                "onReceive",
                &["android.content.Context", "android.content.Intent"],
            ),
            optional: vec![],
        },
        LifecycleSpec {
            kind: ComponentKind::Provider,
            required: LifecycleShape::new("boolean", "onCreate", &[]),
            optional: vec![
                LifecycleShape::new(
                    "android.database.Cursor",
                    "query",
                    &[
                        "android.net.Uri",
                        "java.lang.String[]",
                        "java.lang.String",
                        "java.lang.String[]",
                        "java.lang.String",
                    ],
                ),
                LifecycleShape::new(
                    "android.net.Uri",
                    "insert",
                    &["android.net.Uri", "android.content.ContentValues"],
                ),
                LifecycleShape::new(
                    "int",
                    "update",
                    &[
                        "android.net.Uri",
                        "android.content.ContentValues",
                        "java.lang.String",
                        "java.lang.String[]",
                    ],
                ),
                LifecycleShape::new(
                    "int",
                    "delete",
                    &["android.net.Uri", "java.lang.String", "java.lang.String[]"],
                ),
            ],
        },
    ]
});

/// Lifecycle spec for a component kind.
pub fn lifecycle_table(kind: ComponentKind) -> &'static LifecycleSpec {
    LIFECYCLE_TABLE
        .iter()
        .find(|s| s.kind == kind)
        .expect("table covers every component kind")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_covers_all_kinds() {
        for kind in [
            ComponentKind::Activity,
            ComponentKind::Service,
            ComponentKind::Receiver,
            ComponentKind::Provider,
        ] {
            assert_eq!(lifecycle_table(kind).kind, kind);
        }
    }

    #[test]
    fn test_required_signatures() {
        assert_eq!(
            lifecycle_table(ComponentKind::Activity).required.name,
            "onCreate"
        );
        assert_eq!(
            lifecycle_table(ComponentKind::Receiver).required.name,
            "onReceive"
        );
        assert_eq!(
            lifecycle_table(ComponentKind::Provider).required.ret,
            "boolean"
        );
    }

    #[test]
    fn test_shape_binding() {
        let shape = &lifecycle_table(ComponentKind::Activity).required;
        let sig = shape.sig_for("com.example.Main");
        assert_eq!(
            sig.canonical(),
            "<com.example.Main: void onCreate(android.os.Bundle)>"
        );
    }
}
