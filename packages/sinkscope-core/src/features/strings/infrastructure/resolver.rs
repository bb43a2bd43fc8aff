//! Sink-argument reconstruction
//!
//! One walk over each argument's expression set collects component
//! literals, external input sources, and the root construction operation.
//! File-valued receivers are resolved by descending through constructor
//! method-call variables and well-known directory accessors; builder
//! chains are followed through their append spine.

use crate::features::constraints::infrastructure::engine::PathEvaluation;
use crate::features::predicates::domain::{Expr, ExprSet, SymbolicVar, VarArena};
use crate::features::taint::domain::{Classification, InputSource, TaintClass};
use crate::features::taint::infrastructure::classifier::TaintClassifier;
use crate::shared::models::ir::{ConstValue, MethodSig};

use super::super::domain::{ConstructionOp, PathType, StringParamConstraint};

/// Nesting bound for constructor/builder descent.
const MAX_DEPTH: usize = 16;

/// Classes whose constructors open or name files as (path) or
/// (parent, child) pairs.
const FILE_CLASSES: &[&str] = &[
    "java.io.File",
    "java.io.FileOutputStream",
    "java.io.FileInputStream",
    "java.io.FileWriter",
    "java.io.FileReader",
    "java.io.RandomAccessFile",
];

/// Types a sink argument may carry a path in.
const STRINGISH_TYPES: &[&str] = &[
    "java.lang.String",
    "java.lang.CharSequence",
    "java.io.File",
];

/// Content types worth a receiver-side path resolution: a sink writing
/// sequence payload to a file is path-classified through the stream's
/// constructor; scalar writes only prove reachability.
const PAYLOAD_TYPES: &[&str] = &["byte[]", "char[]", "java.lang.String", "java.lang.CharSequence"];

/// One reconstructed component of the argument value.
#[derive(Debug, Clone)]
struct Piece {
    /// Materialized text, when the component is a resolvable literal.
    text: Option<String>,
    class: Classification,
}

impl Piece {
    fn literal(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            class: Classification::clean(),
        }
    }

    fn opaque(class: Classification) -> Self {
        Self { text: None, class }
    }
}

pub struct StringParamResolver<'a> {
    arena: &'a VarArena,
    classifier: &'a mut TaintClassifier,
    package: &'a str,
}

impl<'a> StringParamResolver<'a> {
    pub fn new(arena: &'a VarArena, classifier: &'a mut TaintClassifier, package: &'a str) -> Self {
        Self {
            arena,
            classifier,
            package,
        }
    }

    /// Resolve every path-carrying parameter of the sink invocation. When
    /// no argument is string-typed, the sink receiver is resolved instead;
    /// an empty result means the event is execution-only.
    pub fn resolve_event(&mut self, eval: &PathEvaluation) -> Vec<StringParamConstraint> {
        let mut constraints = Vec::new();

        for arg in &eval.sink_args {
            if !STRINGISH_TYPES.contains(&arg.static_ty.as_str()) {
                continue;
            }
            if let Some(c) = self.resolve_set(&arg.exprs, Some(arg.index)) {
                constraints.push(c);
            }
        }

        let writes_payload = eval
            .sink_args
            .iter()
            .any(|a| PAYLOAD_TYPES.contains(&a.static_ty.as_str()));
        if constraints.is_empty() && writes_payload {
            if let Some(receiver) = &eval.sink_receiver {
                if let Some(c) = self.resolve_set(receiver, None) {
                    constraints.push(c);
                }
            }
        }

        constraints
    }

    /// Resolve one expression set. `None` when the set is empty or nothing
    /// path-like could be recovered.
    pub fn resolve_set(
        &mut self,
        set: &ExprSet,
        arg_index: Option<usize>,
    ) -> Option<StringParamConstraint> {
        let mut best: Option<StringParamConstraint> = None;
        let mut all_sources: Vec<InputSource> = Vec::new();

        for expr in set.iter() {
            let mut pieces = Vec::new();
            let mut op = ConstructionOp::Direct;
            self.flatten_expr(expr, &mut pieces, &mut op, 0);
            if pieces.is_empty() {
                continue;
            }
            let candidate = Self::classify_pieces(arg_index, &pieces, op);
            for s in &candidate.sources {
                if !all_sources.contains(s) {
                    all_sources.push(s.clone());
                }
            }
            best = Some(match best {
                None => candidate,
                Some(prev) => {
                    if candidate.path_type.severity() > prev.path_type.severity() {
                        candidate
                    } else {
                        prev
                    }
                }
            });
        }

        best.map(|mut c| {
            c.sources = all_sources;
            c
        })
    }

    fn classify_pieces(
        arg_index: Option<usize>,
        pieces: &[Piece],
        construction: ConstructionOp,
    ) -> StringParamConstraint {
        let all_clean = pieces.iter().all(|p| p.class.class == TaintClass::Clean);
        let all_full = pieces.iter().all(|p| p.class.class == TaintClass::Full);

        let mut sources = Vec::new();
        for p in pieces {
            for s in &p.class.sources {
                if !sources.contains(s) {
                    sources.push(s.clone());
                }
            }
        }

        let path_type = if all_clean {
            PathType::HardCoded
        } else if all_full {
            PathType::FullyControlled
        } else {
            PathType::PartiallyControlled
        };

        let literal = if path_type == PathType::HardCoded {
            pieces
                .iter()
                .map(|p| p.text.clone())
                .collect::<Option<Vec<_>>>()
                .map(|parts| collapse_separators(&parts.concat()))
        } else {
            None
        };

        let prefix = if path_type == PathType::PartiallyControlled {
            let mut acc = String::new();
            for p in pieces {
                if p.class.class != TaintClass::Clean {
                    break;
                }
                match &p.text {
                    Some(t) => acc.push_str(t),
                    None => break,
                }
            }
            (!acc.is_empty()).then(|| collapse_separators(&acc))
        } else {
            None
        };

        StringParamConstraint {
            arg_index,
            path_type,
            literal,
            prefix,
            sources,
            construction,
        }
    }

    /// Flatten one expression into ordered pieces, descending through
    /// concatenation, builders, and file constructors.
    fn flatten_expr(
        &mut self,
        expr: &Expr,
        out: &mut Vec<Piece>,
        op: &mut ConstructionOp,
        depth: usize,
    ) {
        if depth > MAX_DEPTH {
            out.push(Piece::opaque(self.classifier.classify_expr(self.arena, expr)));
            return;
        }
        match expr {
            Expr::Concat { lhs, rhs } => {
                if *op == ConstructionOp::Direct {
                    *op = ConstructionOp::Concatenation;
                }
                self.flatten_expr(lhs, out, op, depth + 1);
                self.flatten_expr(rhs, out, op, depth + 1);
            }
            Expr::Arith { .. } => {
                out.push(Piece::opaque(self.classifier.classify_expr(self.arena, expr)));
            }
            Expr::Var(v) => match self.arena.get(*v) {
                SymbolicVar::Constant { value } => match value {
                    ConstValue::Str(s) => out.push(Piece::literal(s.clone())),
                    ConstValue::Int(i) => out.push(Piece::literal(i.to_string())),
                    _ => out.push(Piece::opaque(self.classifier.classify(self.arena, *v))),
                },
                SymbolicVar::MethodCall {
                    sig,
                    receiver,
                    args,
                    string_args,
                    ..
                } => self.flatten_call(*v, sig, receiver.as_ref(), args, string_args, out, op, depth),
                _ => out.push(Piece::opaque(self.classifier.classify(self.arena, *v))),
            },
        }
    }

    fn flatten_call(
        &mut self,
        var: crate::features::predicates::domain::VarId,
        sig: &MethodSig,
        receiver: Option<&ExprSet>,
        args: &[ExprSet],
        string_args: &[(usize, String)],
        out: &mut Vec<Piece>,
        op: &mut ConstructionOp,
        depth: usize,
    ) {
        // File constructor: resolve (path) or (parent, child) recursively.
        if sig.is_constructor() && FILE_CLASSES.contains(&sig.class.as_str()) {
            *op = ConstructionOp::FileConstructor;
            if let Some(parent) = args.first() {
                self.flatten_set(parent, out, op, depth + 1);
            }
            if let Some(child) = args.get(1) {
                out.push(Piece::literal("/"));
                self.flatten_set(child, out, op, depth + 1);
            }
            return;
        }

        // Well-known directory accessors yield canonical literal paths.
        if let Some(dir) = self.well_known_dir(sig, string_args) {
            out.push(Piece::literal(dir));
            return;
        }

        // Context.openFileOutput(name, mode): app files dir plus name.
        if sig.name == "openFileOutput" {
            out.push(Piece::literal(format!("/data/data/{}/files/", self.package)));
            if let Some(name) = args.first() {
                self.flatten_set(name, out, op, depth + 1);
            }
            return;
        }

        // Builder spine: append chains end in toString at the argument.
        if sig.class == "java.lang.StringBuilder" || sig.class == "java.lang.StringBuffer" {
            match sig.name.as_str() {
                "toString" => {
                    *op = ConstructionOp::Builder;
                    if let Some(recv) = receiver {
                        self.flatten_set(recv, out, op, depth + 1);
                    }
                    return;
                }
                "append" => {
                    *op = ConstructionOp::Builder;
                    if let Some(recv) = receiver {
                        self.flatten_set(recv, out, op, depth + 1);
                    }
                    if let Some(arg) = args.first() {
                        self.flatten_set(arg, out, op, depth + 1);
                    }
                    return;
                }
                "<init>" => {
                    if let Some(seed) = args.first() {
                        self.flatten_set(seed, out, op, depth + 1);
                    }
                    return;
                }
                _ => {}
            }
        }

        // String.format: the pattern and arguments all contribute.
        if sig.class == "java.lang.String" && sig.name == "format" {
            *op = ConstructionOp::Format;
            for arg in args {
                self.flatten_set(arg, out, op, depth + 1);
            }
            return;
        }

        // toString passes its receiver through unchanged.
        if sig.name == "toString" {
            if let Some(recv) = receiver {
                if !recv.is_empty() {
                    self.flatten_set(recv, out, op, depth + 1);
                    return;
                }
            }
        }

        // Everything else (external accessors included) is one opaque
        // component classified by the taint tracker.
        out.push(Piece::opaque(self.classifier.classify(self.arena, var)));
    }

    /// Descend into an argument set: single-expression sets keep their
    /// structure, wider sets degrade to one classified component.
    fn flatten_set(
        &mut self,
        set: &ExprSet,
        out: &mut Vec<Piece>,
        op: &mut ConstructionOp,
        depth: usize,
    ) {
        match set.len() {
            0 => {}
            1 => {
                let expr = set.first().cloned().expect("len checked");
                self.flatten_expr(&expr, out, op, depth);
            }
            _ => out.push(Piece::opaque(self.classifier.classify_set(self.arena, set))),
        }
    }

    fn well_known_dir(&self, sig: &MethodSig, string_args: &[(usize, String)]) -> Option<String> {
        match sig.name.as_str() {
            "getFilesDir" => Some(format!("/data/data/{}/files", self.package)),
            "getCacheDir" => Some(format!("/data/data/{}/cache", self.package)),
            "getExternalFilesDir" => {
                Some(format!("/sdcard/Android/data/{}/files", self.package))
            }
            "getExternalStorageDirectory" => Some("/sdcard".to_string()),
            "getDataDirectory" => Some("/data".to_string()),
            "getDir" => string_args
                .iter()
                .find(|(slot, _)| *slot == 0)
                .map(|(_, name)| format!("/data/data/{}/app_{}", self.package, name)),
            _ => None,
        }
    }
}

/// Collapse duplicate path separators introduced by constructor joins.
fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !last_slash {
                out.push(c);
            }
            last_slash = true;
        } else {
            out.push(c);
            last_slash = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::predicates::domain::SymbolicVar;
    use crate::shared::models::ir::UnitRef;

    fn site() -> UnitRef {
        UnitRef {
            method: "<t.T: void m()>".into(),
            index: 0,
        }
    }

    fn str_const(arena: &mut VarArena, s: &str) -> Expr {
        Expr::var(arena.constant(ConstValue::Str(s.into())))
    }

    fn input(arena: &mut VarArena, name: &str) -> Expr {
        Expr::var(arena.alloc(SymbolicVar::Input {
            path: 0,
            slot: 0,
            ty: "java.lang.String".into(),
            name: name.into(),
        }))
    }

    #[test]
    fn test_hard_coded_literal() {
        let mut arena = VarArena::new();
        let expr = str_const(&mut arena, "/data/hijack1.txt");
        let mut classifier = TaintClassifier::new(64);
        let mut resolver = StringParamResolver::new(&arena, &mut classifier, "com.example.app");
        let c = resolver
            .resolve_set(&ExprSet::singleton(expr), Some(0))
            .unwrap();
        assert_eq!(c.path_type, PathType::HardCoded);
        assert_eq!(c.literal.as_deref(), Some("/data/hijack1.txt"));
    }

    #[test]
    fn test_partial_with_prefix() {
        let mut arena = VarArena::new();
        let lhs = str_const(&mut arena, "/data/user/");
        let mid = input(&mut arena, "userInput");
        let tail = str_const(&mut arena, ".txt");
        let expr = Expr::concat(Expr::concat(lhs, mid), tail);
        let mut classifier = TaintClassifier::new(64);
        let mut resolver = StringParamResolver::new(&arena, &mut classifier, "com.example.app");
        let c = resolver
            .resolve_set(&ExprSet::singleton(expr), Some(0))
            .unwrap();
        assert_eq!(c.path_type, PathType::PartiallyControlled);
        assert_eq!(c.prefix.as_deref(), Some("/data/user/"));
        assert_eq!(c.construction, ConstructionOp::Concatenation);
        assert!(c
            .sources
            .iter()
            .any(|s| s.accessor == "userInput"));
    }

    #[test]
    fn test_fully_controlled() {
        let mut arena = VarArena::new();
        let expr = input(&mut arena, "p");
        let mut classifier = TaintClassifier::new(64);
        let mut resolver = StringParamResolver::new(&arena, &mut classifier, "com.example.app");
        let c = resolver
            .resolve_set(&ExprSet::singleton(expr), Some(0))
            .unwrap();
        assert_eq!(c.path_type, PathType::FullyControlled);
        assert!(c.literal.is_none());
    }

    #[test]
    fn test_file_constructor_parent_child() {
        let mut arena = VarArena::new();
        // new File(getFilesDir(), "cache.txt")
        let dir_call = arena.alloc(SymbolicVar::MethodCall {
            site: site(),
            sig: MethodSig::new("android.content.Context", "java.io.File", "getFilesDir", vec![]),
            receiver: None,
            args: vec![],
            string_args: vec![],
        });
        let child = arena.constant(ConstValue::Str("cache.txt".into()));
        let file_ctor = arena.alloc(SymbolicVar::MethodCall {
            site: site(),
            sig: MethodSig::new(
                "java.io.File",
                "void",
                "<init>",
                vec!["java.io.File".into(), "java.lang.String".into()],
            ),
            receiver: None,
            args: vec![
                ExprSet::singleton(Expr::var(dir_call)),
                ExprSet::singleton(Expr::var(child)),
            ],
            string_args: vec![(1, "cache.txt".into())],
        });

        let mut classifier = TaintClassifier::new(64);
        let mut resolver = StringParamResolver::new(&arena, &mut classifier, "com.example.app");
        let c = resolver
            .resolve_set(&ExprSet::singleton(Expr::var(file_ctor)), None)
            .unwrap();
        assert_eq!(c.path_type, PathType::HardCoded);
        assert_eq!(
            c.literal.as_deref(),
            Some("/data/data/com.example.app/files/cache.txt")
        );
        assert_eq!(c.construction, ConstructionOp::FileConstructor);
    }

    #[test]
    fn test_builder_chain_reconstruction() {
        let mut arena = VarArena::new();
        // new StringBuilder("/logs/") . append(name) . toString()
        let seed = arena.constant(ConstValue::Str("/logs/".into()));
        let ctor = arena.alloc(SymbolicVar::MethodCall {
            site: site(),
            sig: MethodSig::new(
                "java.lang.StringBuilder",
                "void",
                "<init>",
                vec!["java.lang.String".into()],
            ),
            receiver: None,
            args: vec![ExprSet::singleton(Expr::var(seed))],
            string_args: vec![(0, "/logs/".into())],
        });
        let name = arena.constant(ConstValue::Str("app.log".into()));
        let append = arena.alloc(SymbolicVar::MethodCall {
            site: site(),
            sig: MethodSig::new(
                "java.lang.StringBuilder",
                "java.lang.StringBuilder",
                "append",
                vec!["java.lang.String".into()],
            ),
            receiver: Some(ExprSet::singleton(Expr::var(ctor))),
            args: vec![ExprSet::singleton(Expr::var(name))],
            string_args: vec![(0, "app.log".into())],
        });
        let to_string = arena.alloc(SymbolicVar::MethodCall {
            site: site(),
            sig: MethodSig::new("java.lang.StringBuilder", "java.lang.String", "toString", vec![]),
            receiver: Some(ExprSet::singleton(Expr::var(append))),
            args: vec![],
            string_args: vec![],
        });

        let mut classifier = TaintClassifier::new(64);
        let mut resolver = StringParamResolver::new(&arena, &mut classifier, "com.example.app");
        let c = resolver
            .resolve_set(&ExprSet::singleton(Expr::var(to_string)), Some(0))
            .unwrap();
        assert_eq!(c.path_type, PathType::HardCoded);
        assert_eq!(c.literal.as_deref(), Some("/logs/app.log"));
        assert_eq!(c.construction, ConstructionOp::Builder);
    }

    #[test]
    fn test_intent_extra_is_fully_controlled_with_source() {
        let mut arena = VarArena::new();
        let extra = arena.alloc(SymbolicVar::MethodCall {
            site: site(),
            sig: MethodSig::new(
                "android.content.Intent",
                "java.lang.String",
                "getStringExtra",
                vec!["java.lang.String".into()],
            ),
            receiver: None,
            args: vec![],
            string_args: vec![(0, "filename".into())],
        });
        let mut classifier = TaintClassifier::new(64);
        let mut resolver = StringParamResolver::new(&arena, &mut classifier, "com.example.app");
        let c = resolver
            .resolve_set(&ExprSet::singleton(Expr::var(extra)), Some(0))
            .unwrap();
        assert_eq!(c.path_type, PathType::FullyControlled);
        assert_eq!(c.sources.len(), 1);
        assert_eq!(c.sources[0].key.as_deref(), Some("filename"));
    }

    #[test]
    fn test_collapse_separators() {
        assert_eq!(collapse_separators("/data//user///x"), "/data/user/x");
        assert_eq!(collapse_separators("plain"), "plain");
    }
}
