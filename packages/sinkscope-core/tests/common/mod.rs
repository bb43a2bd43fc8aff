//! Shared fixtures for the integration suites: a small application-model
//! builder mirroring the lifted-descriptor shape.

#![allow(dead_code)]

use sinkscope_core::shared::models::app::{AppModel, ClassDef};
use sinkscope_core::shared::models::ir::{
    BodyBuilder, InvokeExpr, InvokeKind, MethodDef, MethodSig, Operand, Rvalue, Stmt,
};
use sinkscope_core::shared::models::manifest::{
    AppManifest, ComponentDecl, ComponentKind, IntentFilter,
};

pub const PKG: &str = "com.example.app";

pub fn sink_write_bytes() -> MethodSig {
    MethodSig::new(
        "java.io.FileOutputStream",
        "void",
        "write",
        vec!["byte[]".into()],
    )
}

pub fn sink_write_int() -> MethodSig {
    MethodSig::new("java.io.FileOutputStream", "void", "write", vec!["int".into()])
}

pub fn fos_ctor() -> MethodSig {
    MethodSig::new(
        "java.io.FileOutputStream",
        "void",
        "<init>",
        vec!["java.lang.String".into()],
    )
}

/// Base model with the framework lineage classes the classifier consults.
pub fn base_app() -> AppModel {
    let mut app = AppModel {
        manifest: AppManifest {
            package: PKG.into(),
            components: vec![],
        },
        ..Default::default()
    };
    for framework in [
        "android.app.Activity",
        "android.app.Service",
        "android.content.BroadcastReceiver",
        "android.content.ContentProvider",
    ] {
        app.add_class(ClassDef {
            name: framework.into(),
            superclass: None,
            interfaces: vec![],
        });
    }
    app
}

/// Declare an activity component extending the framework class.
pub fn add_activity(app: &mut AppModel, class: &str) {
    app.add_class(ClassDef {
        name: class.into(),
        superclass: Some("android.app.Activity".into()),
        interfaces: vec![],
    });
    app.manifest.components.push(ComponentDecl {
        class_name: class.into(),
        kind: ComponentKind::Activity,
        exported: true,
        intent_filters: vec![IntentFilter {
            actions: vec!["android.intent.action.MAIN".into()],
            categories: vec![],
        }],
        authority: None,
    });
}

/// Declare a service component extending the framework class.
pub fn add_service(app: &mut AppModel, class: &str) {
    app.add_class(ClassDef {
        name: class.into(),
        superclass: Some("android.app.Service".into()),
        interfaces: vec![],
    });
    app.manifest.components.push(ComponentDecl {
        class_name: class.into(),
        kind: ComponentKind::Service,
        exported: false,
        intent_filters: vec![],
        authority: None,
    });
}

/// `onCreate(android.os.Bundle)` with the given body.
pub fn on_create(class: &str, body: BodyBuilder) -> MethodDef {
    MethodDef {
        sig: MethodSig::new(class, "void", "onCreate", vec!["android.os.Bundle".into()]),
        is_static: false,
        body: Some(body.finish()),
    }
}

pub fn invoke(
    kind: InvokeKind,
    sig: MethodSig,
    receiver: Option<&str>,
    args: Vec<Operand>,
) -> Stmt {
    Stmt::Invoke {
        dest: None,
        call: InvokeExpr {
            kind,
            sig,
            receiver: receiver.map(|r| r.to_string()),
            args,
        },
    }
}

pub fn invoke_assign(
    dest: &str,
    kind: InvokeKind,
    sig: MethodSig,
    receiver: Option<&str>,
    args: Vec<Operand>,
) -> Stmt {
    Stmt::Invoke {
        dest: Some(dest.to_string()),
        call: InvokeExpr {
            kind,
            sig,
            receiver: receiver.map(|r| r.to_string()),
            args,
        },
    }
}

/// `fos = new FileOutputStream(<path operand>)` as its two-unit idiom.
pub fn push_new_fos(body: &mut BodyBuilder, local: &str, path: Operand) {
    body.push(Stmt::Assign {
        dest: local.into(),
        value: Rvalue::New {
            class: "java.io.FileOutputStream".into(),
        },
    });
    body.push(invoke(
        InvokeKind::Special,
        fos_ctor(),
        Some(local),
        vec![path],
    ));
}

/// `bytes = <literal>.getBytes()` payload idiom.
pub fn push_payload_bytes(body: &mut BodyBuilder, local: &str, literal: &str) {
    body.push(Stmt::Assign {
        dest: "payload_str".into(),
        value: Rvalue::Use(Operand::str(literal)),
    });
    body.push(invoke_assign(
        local,
        InvokeKind::Virtual,
        MethodSig::new("java.lang.String", "byte[]", "getBytes", vec![]),
        Some("payload_str"),
        vec![],
    ));
}
