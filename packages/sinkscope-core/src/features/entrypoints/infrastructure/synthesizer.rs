//! Synthetic root construction
//!
//! The root method allocates one instance of every in-package component and
//! invokes its required lifecycle method plus every optional one the class
//! actually declares. Parameters irrelevant to reachability get defaults:
//! null for references, 0 for integral and boolean types.
//!
//! Public non-lifecycle methods of components are NOT promoted to entry
//! points; they are reachable only through lifecycle paths.

use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::shared::models::app::AppModel;
use crate::shared::models::ir::{
    BodyBuilder, ConstValue, InvokeExpr, InvokeKind, MethodDef, MethodSig, Operand, Rvalue, Stmt,
};
use crate::shared::models::manifest::ComponentDecl;

use super::super::domain::{lifecycle_table, LifecycleShape};

/// Canonical class and name of the synthetic root.
pub const ROOT_CLASS: &str = "synthetic.ApplicationRoot";
pub const ROOT_METHOD: &str = "root";

/// Result of synthesis: the root method plus bookkeeping for the driver.
#[derive(Debug)]
pub struct SynthesisOutcome {
    pub root: MethodDef,
    /// Components that contributed at least one lifecycle invocation.
    pub components: Vec<ComponentDecl>,
    pub lifecycle_calls: usize,
    pub warnings: Vec<String>,
}

impl SynthesisOutcome {
    pub fn root_sig(&self) -> &MethodSig {
        &self.root.sig
    }
}

pub struct EntryPointSynthesizer<'a> {
    app: &'a AppModel,
    config: &'a AnalysisConfig,
}

impl<'a> EntryPointSynthesizer<'a> {
    pub fn new(app: &'a AppModel, config: &'a AnalysisConfig) -> Self {
        Self { app, config }
    }

    pub fn root_signature() -> MethodSig {
        MethodSig::new(ROOT_CLASS, "void", ROOT_METHOD, vec![])
    }

    /// Build the synthetic root over the manifest inventory.
    pub fn synthesize(&self) -> SynthesisOutcome {
        let mut body = BodyBuilder::new();
        let mut components = Vec::new();
        let mut warnings = Vec::new();
        let mut lifecycle_calls = 0usize;

        for (i, component) in self.app.manifest.components.iter().enumerate() {
            let class = component.class_name.as_str();
            if !self.config.owns_class(self.app.package(), class) {
                debug!(class, "skipping out-of-package component");
                continue;
            }
            if !self.app.has_class(class) {
                warnings.push(format!("component class unavailable: {class}"));
                continue;
            }

            let local = format!("c{i}");
            body.push(Stmt::Assign {
                dest: local.clone(),
                value: Rvalue::New {
                    class: class.to_string(),
                },
            });

            let spec = lifecycle_table(component.kind);
            let mut emitted = 0usize;

            if self.declares(class, &spec.required) {
                body.push(self.lifecycle_invoke(class, &local, &spec.required));
                emitted += 1;
            } else {
                warnings.push(format!(
                    "component {class} is missing required lifecycle method {}",
                    spec.required.subsignature()
                ));
            }

            for shape in &spec.optional {
                if self.declares(class, shape) {
                    body.push(self.lifecycle_invoke(class, &local, shape));
                    emitted += 1;
                }
            }

            if emitted > 0 {
                components.push(component.clone());
                lifecycle_calls += emitted;
            }
        }

        body.push(Stmt::Return { value: None });

        for w in &warnings {
            warn!("{w}");
        }

        SynthesisOutcome {
            root: MethodDef {
                sig: Self::root_signature(),
                is_static: true,
                body: Some(body.finish()),
            },
            components,
            lifecycle_calls,
            warnings,
        }
    }

    /// The class (or an ancestor) declares the shape with a body we can
    /// analyze.
    fn declares(&self, class: &str, shape: &LifecycleShape) -> bool {
        self.app
            .resolve_virtual(class, &shape.subsignature())
            .map(|m| m.body.is_some())
            .unwrap_or(false)
    }

    fn lifecycle_invoke(&self, class: &str, local: &str, shape: &LifecycleShape) -> Stmt {
        let sig = shape.sig_for(class);
        let args = sig.params.iter().map(|ty| default_value(ty)).collect();
        Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig,
                receiver: Some(local.to_string()),
                args,
            },
        }
    }
}

/// Default argument for a parameter type: 0 for integral/boolean types,
/// null for references.
fn default_value(ty: &str) -> Operand {
    match ty {
        "int" | "long" | "short" | "byte" | "char" | "boolean" => {
            Operand::Const(ConstValue::Int(0))
        }
        _ => Operand::Const(ConstValue::Null),
    }
}
