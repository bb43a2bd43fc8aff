//! End-to-end scenarios over the full pipeline: synthetic root, call
//! graph, ICC splice, path enumeration, constraint extraction, and
//! classification, driven through literal application models.

mod common;

use common::*;
use pretty_assertions::assert_eq;

use sinkscope_core::features::constraints::infrastructure::engine::{
    ConstraintEngine, WorkBudget,
};
use sinkscope_core::features::pathfinder::domain::{CallPath, CallStep};
use sinkscope_core::features::predicates::infrastructure::oracle::GroundTermOracle;
use sinkscope_core::features::reporting::domain::{EventKind, VulnerabilityKind};
use sinkscope_core::features::reporting::infrastructure::python::PythonRenderer;
use sinkscope_core::features::strings::domain::PathType;
use sinkscope_core::features::strings::infrastructure::resolver::StringParamResolver;
use sinkscope_core::features::taint::infrastructure::classifier::TaintClassifier;
use sinkscope_core::shared::models::ir::{
    ArithOp, BodyBuilder, InvokeKind, MethodDef, MethodSig, Operand, Rvalue, Stmt, UnitRef,
};
use sinkscope_core::{AnalysisConfig, Analyzer, TargetSet};
use rustc_hash::FxHashSet;

fn run_analysis(
    mut app: sinkscope_core::AppModel,
    targets: TargetSet,
) -> sinkscope_core::AppReport {
    let config = AnalysisConfig {
        workers: 2,
        global_timeout: None,
        ..Default::default()
    };
    let analyzer = Analyzer::new(config).unwrap();
    analyzer.analyze(&mut app, &targets).unwrap()
}

/// Scenario 1: hard-coded path, hijacking classification.
#[test]
fn test_hijacking_hard_coded() {
    let mut app = base_app();
    add_activity(&mut app, "com.example.app.MainActivity");

    let mut body = BodyBuilder::new().instance("this").params(&["bundle"]);
    push_new_fos(&mut body, "fos", Operand::str("/data/hijack1.txt"));
    push_payload_bytes(&mut body, "b", "hijack test 1");
    body.push(invoke(
        InvokeKind::Virtual,
        sink_write_bytes(),
        Some("fos"),
        vec![Operand::local("b")],
    ));
    body.push(Stmt::Return { value: None });
    app.add_method(on_create("com.example.app.MainActivity", body));

    let report = run_analysis(app, TargetSet::from_sigs([sink_write_bytes()]));

    assert_eq!(report.chains.len(), 1);
    let root = &report.chains[0].root;
    assert_eq!(root.kind, EventKind::Activity);
    assert_eq!(root.vulnerability, VulnerabilityKind::Hijacking);
    assert_eq!(root.params.len(), 1);
    let param = &root.params[0];
    assert_eq!(param.path_type, PathType::HardCoded);
    assert_eq!(param.literal.as_deref(), Some("/data/hijack1.txt"));
    assert_eq!(param.arg_index, None); // recovered from the stream receiver
}

/// Scenario 2: fixed prefix plus tainted suffix, entry-parameter input.
#[test]
fn test_partial_traversal_prefix_and_conditions() {
    let mut app = base_app();
    let entry = MethodSig::new(
        "com.example.app.FileHelper",
        "void",
        "save",
        vec!["java.lang.String".into()],
    );
    let mut b = BodyBuilder::new().instance("this").params(&["userInput"]);
    let null_check = b.push(Stmt::If {
        op: ArithOp::Eq,
        lhs: Operand::local("userInput"),
        rhs: Operand::null(),
    });
    let len_assign = b.push(invoke_assign(
        "len",
        InvokeKind::Virtual,
        MethodSig::new("java.lang.String", "int", "length", vec![]),
        Some("userInput"),
        vec![],
    ));
    let len_check = b.push(Stmt::If {
        op: ArithOp::Le,
        lhs: Operand::local("len"),
        rhs: Operand::int(0),
    });
    b.push(Stmt::Assign {
        dest: "p".into(),
        value: Rvalue::Concat {
            lhs: Operand::str("/data/user/"),
            rhs: Operand::local("userInput"),
        },
    });
    b.push(Stmt::Assign {
        dest: "p2".into(),
        value: Rvalue::Concat {
            lhs: Operand::local("p"),
            rhs: Operand::str(".txt"),
        },
    });
    push_new_fos(&mut b, "fos", Operand::local("p2"));
    push_payload_bytes(&mut b, "bytes", "data");
    let sink = b.push(invoke(
        InvokeKind::Virtual,
        sink_write_bytes(),
        Some("fos"),
        vec![Operand::local("bytes")],
    ));
    let ret = b.push(Stmt::Return { value: None });
    b.set_branch(null_check, ret, len_assign);
    b.set_branch(len_check, ret, len_check + 1);
    app.add_method(MethodDef {
        sig: entry.clone(),
        is_static: false,
        body: Some(b.finish()),
    });

    let config = AnalysisConfig::default();
    let oracle = GroundTermOracle::default();
    let engine = ConstraintEngine::new(&app, &config, &oracle);
    let root = MethodSig::new("synthetic.ApplicationRoot", "void", "root", vec![]);
    let path = CallPath {
        entry: entry.clone(),
        steps: vec![CallStep {
            caller: root.canonical(),
            unit: UnitRef::new(&root, 0),
            callee: entry.canonical(),
        }],
        terminal: UnitRef::new(&entry, sink),
        methods: FxHashSet::default(),
    };
    let eval = engine.evaluate(&path, 0, &WorkBudget::unbounded()).unwrap();

    let mut classifier = TaintClassifier::new(128);
    let mut resolver = StringParamResolver::new(&eval.arena, &mut classifier, PKG);
    let params = resolver.resolve_event(&eval);

    assert_eq!(params.len(), 1);
    assert_eq!(params[0].path_type, PathType::PartiallyControlled);
    assert_eq!(params[0].prefix.as_deref(), Some("/data/user/"));
    assert!(params[0]
        .sources
        .iter()
        .any(|s| s.to_string() == "parameter(userInput)"));

    // execution.py encodes userInput != null and length(userInput) > 0.
    let script = PythonRenderer::new(&eval.arena).render_script(
        &eval.constraint,
        &entry.canonical(),
        "fos.write(bytes)",
    );
    assert!(script.contains("userInput != StringVal(\"\")"));
    assert!(script.contains("Length(userInput) > 0"));
}

/// Scenario 3: fully controlled path from an intent extra.
#[test]
fn test_full_traversal_via_intent_extra() {
    let mut app = base_app();
    add_activity(&mut app, "com.example.app.MainActivity");

    let mut body = BodyBuilder::new().instance("this").params(&["bundle"]);
    body.push(invoke_assign(
        "i",
        InvokeKind::Virtual,
        MethodSig::new(
            "android.app.Activity",
            "android.content.Intent",
            "getIntent",
            vec![],
        ),
        Some("this"),
        vec![],
    ));
    body.push(invoke_assign(
        "p",
        InvokeKind::Virtual,
        MethodSig::new(
            "android.content.Intent",
            "java.lang.String",
            "getStringExtra",
            vec!["java.lang.String".into()],
        ),
        Some("i"),
        vec![Operand::str("filename")],
    ));
    push_new_fos(&mut body, "fos", Operand::local("p"));
    push_payload_bytes(&mut body, "b", "data");
    body.push(invoke(
        InvokeKind::Virtual,
        sink_write_bytes(),
        Some("fos"),
        vec![Operand::local("b")],
    ));
    body.push(Stmt::Return { value: None });
    app.add_method(on_create("com.example.app.MainActivity", body));

    let report = run_analysis(app, TargetSet::from_sigs([sink_write_bytes()]));

    assert_eq!(report.chains.len(), 1);
    let root = &report.chains[0].root;
    assert_eq!(root.vulnerability, VulnerabilityKind::TraversalFull);
    let param = &root.params[0];
    assert_eq!(param.path_type, PathType::FullyControlled);
    assert!(param
        .sources
        .iter()
        .any(|s| s.to_string() == "Intent.getStringExtra(\"filename\")"));
}

/// Scenario 4: scalar write proves reachability only.
#[test]
fn test_execution_only_scalar_write() {
    let mut app = base_app();
    add_activity(&mut app, "com.example.app.MainActivity");

    let mut body = BodyBuilder::new().instance("this").params(&["bundle"]);
    body.push(invoke_assign(
        "t",
        InvokeKind::Static,
        MethodSig::new("java.lang.System", "long", "currentTimeMillis", vec![]),
        None,
        vec![],
    ));
    let cond = body.push(Stmt::If {
        op: ArithOp::Gt,
        lhs: Operand::local("t"),
        rhs: Operand::int(0),
    });
    push_new_fos(&mut body, "fos", Operand::str("/data/exec1.bin"));
    body.push(invoke(
        InvokeKind::Virtual,
        sink_write_int(),
        Some("fos"),
        vec![Operand::int(42)],
    ));
    let ret = body.push(Stmt::Return { value: None });
    body.set_branch(cond, cond + 1, ret);
    app.add_method(on_create("com.example.app.MainActivity", body));

    let report = run_analysis(app, TargetSet::from_sigs([sink_write_int()]));

    assert_eq!(report.chains.len(), 1);
    let root = &report.chains[0].root;
    assert_eq!(root.vulnerability, VulnerabilityKind::ExecutionOnly);
    assert!(root.params.is_empty());
    assert!(root.evaluation.is_some());
}

/// Scenario 5: activity starts a service explicitly; the path crosses the
/// spliced ICC edge into onStartCommand.
#[test]
fn test_icc_hop_into_service() {
    let mut app = base_app();
    add_activity(&mut app, "com.example.app.MainActivity");
    add_service(&mut app, "com.example.app.WorkService");

    // Activity: new Intent(this, WorkService.class); startService(i).
    let mut body = BodyBuilder::new().instance("this").params(&["bundle"]);
    body.push(Stmt::Assign {
        dest: "i".into(),
        value: Rvalue::New {
            class: "android.content.Intent".into(),
        },
    });
    body.push(invoke(
        InvokeKind::Special,
        MethodSig::new(
            "android.content.Intent",
            "void",
            "<init>",
            vec!["android.content.Context".into(), "java.lang.Class".into()],
        ),
        Some("i"),
        vec![
            Operand::local("this"),
            Operand::Const(sinkscope_core::shared::models::ir::ConstValue::Class(
                "com.example.app.WorkService".into(),
            )),
        ],
    ));
    body.push(invoke(
        InvokeKind::Virtual,
        MethodSig::new(
            "android.app.Activity",
            "android.content.ComponentName",
            "startService",
            vec!["android.content.Intent".into()],
        ),
        Some("this"),
        vec![Operand::local("i")],
    ));
    body.push(Stmt::Return { value: None });
    app.add_method(on_create("com.example.app.MainActivity", body));

    // Service lifecycle bodies.
    let mut sc = BodyBuilder::new().instance("this");
    sc.push(Stmt::Return { value: None });
    app.add_method(MethodDef {
        sig: MethodSig::new("com.example.app.WorkService", "void", "onCreate", vec![]),
        is_static: false,
        body: Some(sc.finish()),
    });

    let mut osc = BodyBuilder::new()
        .instance("this")
        .params(&["intent", "flags", "startId"]);
    push_new_fos(&mut osc, "fos", Operand::str("/data/service.txt"));
    push_payload_bytes(&mut osc, "b", "payload");
    osc.push(invoke(
        InvokeKind::Virtual,
        sink_write_bytes(),
        Some("fos"),
        vec![Operand::local("b")],
    ));
    osc.push(Stmt::Return {
        value: Some(Operand::int(0)),
    });
    app.add_method(MethodDef {
        sig: MethodSig::new(
            "com.example.app.WorkService",
            "int",
            "onStartCommand",
            vec!["android.content.Intent".into(), "int".into(), "int".into()],
        ),
        is_static: false,
        body: Some(osc.finish()),
    });

    let report = run_analysis(app, TargetSet::from_sigs([sink_write_bytes()]));
    assert!(report.stats.icc_spliced >= 1);

    // One chain starts in the activity lifecycle and crosses into the
    // service entry.
    let onstart = "<com.example.app.WorkService: int onStartCommand(android.content.Intent,int,int)>";
    let oncreate = "<com.example.app.MainActivity: void onCreate(android.os.Bundle)>";
    let hop = report
        .chains
        .iter()
        .find(|c| {
            let seq = c.root.path.method_sequence();
            seq.contains(&oncreate) && seq.contains(&onstart)
        })
        .expect("chain crossing the ICC edge");
    assert_eq!(hop.root.kind, EventKind::Activity);
    assert_eq!(hop.root.path.terminal.method, onstart);
}

/// Scenario 6: a constant-false guard makes the path infeasible; nothing
/// is emitted for the sink occurrence.
#[test]
fn test_infeasible_branch_dropped() {
    let mut app = base_app();
    add_activity(&mut app, "com.example.app.MainActivity");

    let mut body = BodyBuilder::new().instance("this").params(&["bundle"]);
    let cond = body.push(Stmt::If {
        op: ArithOp::Eq,
        lhs: Operand::Const(sinkscope_core::shared::models::ir::ConstValue::Bool(false)),
        rhs: Operand::Const(sinkscope_core::shared::models::ir::ConstValue::Bool(true)),
    });
    push_new_fos(&mut body, "fos", Operand::str("/data/never.txt"));
    push_payload_bytes(&mut body, "b", "never");
    body.push(invoke(
        InvokeKind::Virtual,
        sink_write_bytes(),
        Some("fos"),
        vec![Operand::local("b")],
    ));
    let ret = body.push(Stmt::Return { value: None });
    body.set_branch(cond, cond + 1, ret);
    app.add_method(on_create("com.example.app.MainActivity", body));

    let report = run_analysis(app, TargetSet::from_sigs([sink_write_bytes()]));

    assert!(report.chains.is_empty());
    assert_eq!(report.stats.paths_infeasible, 1);
}
