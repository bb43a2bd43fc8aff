//! z3py-dialect rendering of predicates
//!
//! `execution.py` encodes the minimized path constraint for the external
//! oracle. The file starts with two comment lines naming the entry method
//! and the terminal sink statement. String operations with solver-native
//! counterparts render as such (`length()` becomes `Length`, `equals`
//! becomes `==`); everything else declares a fresh symbol.
//!
//! Reference-null comparisons are proxied per type: the empty string for
//! string-typed operands, zero for everything else. The proxy is recorded
//! in the script as a comment so the downstream oracle knows the encoding.

use std::collections::BTreeMap;

use crate::features::predicates::domain::{Expr, Predicate, SymbolicVar, VarArena};
use crate::features::taint::domain::InputSource;
use crate::shared::models::ir::{ArithOp, ConstValue};

/// Operand type lattice for rendering decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PyType {
    Str,
    Int,
    Bool,
}

fn type_of_name(ty: &str) -> PyType {
    match ty {
        "java.lang.String" | "java.lang.CharSequence" | "java.lang.StringBuilder" => PyType::Str,
        "boolean" => PyType::Bool,
        _ => PyType::Int,
    }
}

/// Rendering context: symbol declarations accumulate as expressions are
/// visited.
struct RenderCtx<'a> {
    arena: &'a VarArena,
    decls: BTreeMap<String, PyType>,
    notes: Vec<String>,
}

impl<'a> RenderCtx<'a> {
    fn declare(&mut self, name: &str, ty: PyType) -> String {
        let sanitized = sanitize(name);
        self.decls.entry(sanitized.clone()).or_insert(ty);
        sanitized
    }
}

fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() || out.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        out.insert(0, 'v');
    }
    out
}

pub struct PythonRenderer<'a> {
    arena: &'a VarArena,
}

impl<'a> PythonRenderer<'a> {
    pub fn new(arena: &'a VarArena) -> Self {
        Self { arena }
    }

    /// Render the full `execution.py` script.
    pub fn render_script(&self, constraint: &Predicate, entry: &str, sink: &str) -> String {
        let mut ctx = RenderCtx {
            arena: self.arena,
            decls: BTreeMap::new(),
            notes: Vec::new(),
        };

        // Top-level conjunctions become individual assertions.
        let assertions: Vec<String> = match constraint {
            Predicate::And(ps) => ps.iter().map(|p| Self::pred_py(p, &mut ctx)).collect(),
            other => vec![Self::pred_py(other, &mut ctx)],
        };

        let mut lines = Vec::new();
        lines.push(format!("# entry: {entry}"));
        lines.push(format!("# sink: {sink}"));
        lines.push("from z3 import *".to_string());
        lines.push(String::new());
        lines.push("s = Solver()".to_string());
        for (name, ty) in &ctx.decls {
            let ctor = match ty {
                PyType::Str => "String",
                PyType::Int => "Int",
                PyType::Bool => "Bool",
            };
            lines.push(format!("{name} = {ctor}('{name}')"));
        }
        for note in &ctx.notes {
            lines.push(format!("# {note}"));
        }
        for assertion in assertions {
            lines.push(format!("s.add({assertion})"));
        }
        lines.push("print(s.check())".to_string());
        lines.push(String::new());
        lines.join("\n")
    }

    fn pred_py(p: &Predicate, ctx: &mut RenderCtx<'_>) -> String {
        match p {
            Predicate::True => "BoolVal(True)".to_string(),
            Predicate::False => "BoolVal(False)".to_string(),
            Predicate::Not(inner) => format!("Not({})", Self::pred_py(inner, ctx)),
            Predicate::And(ps) => {
                let parts: Vec<_> = ps.iter().map(|q| Self::pred_py(q, ctx)).collect();
                format!("And({})", parts.join(", "))
            }
            Predicate::Or(ps) => {
                let parts: Vec<_> = ps.iter().map(|q| Self::pred_py(q, ctx)).collect();
                format!("Or({})", parts.join(", "))
            }
            Predicate::Expr(e) => Self::atom_py(e, ctx),
        }
    }

    /// Atomic expression under the truthiness interpretation.
    fn atom_py(e: &Expr, ctx: &mut RenderCtx<'_>) -> String {
        if let Expr::Arith { op, lhs, rhs } = e {
            if op.is_relational() {
                return Self::relation_py(*op, lhs, rhs, ctx);
            }
        }
        let (text, ty) = Self::expr_py(e, ctx);
        match ty {
            PyType::Bool => text,
            PyType::Str => format!("{text} != StringVal(\"\")"),
            PyType::Int => format!("{text} != 0"),
        }
    }

    fn relation_py(op: ArithOp, lhs: &Expr, rhs: &Expr, ctx: &mut RenderCtx<'_>) -> String {
        let (mut l, lt) = Self::expr_py(lhs, ctx);
        let (mut r, rt) = Self::expr_py(rhs, ctx);
        // Null proxies take the type of the opposite side.
        if Self::is_null(lhs, ctx.arena) {
            l = Self::null_proxy(rt, ctx);
        } else if Self::is_null(rhs, ctx.arena) {
            r = Self::null_proxy(lt, ctx);
        }
        format!("{l} {} {r}", op.symbol())
    }

    fn is_null(e: &Expr, arena: &VarArena) -> bool {
        matches!(
            e,
            Expr::Var(v) if matches!(arena.get(*v), SymbolicVar::Constant { value: ConstValue::Null })
        )
    }

    fn null_proxy(other_side: PyType, ctx: &mut RenderCtx<'_>) -> String {
        match other_side {
            PyType::Str => {
                if !ctx.notes.iter().any(|n| n.contains("null proxied")) {
                    ctx.notes
                        .push("null proxied as the empty string for string operands".to_string());
                }
                "StringVal(\"\")".to_string()
            }
            _ => "0".to_string(),
        }
    }

    fn expr_py(e: &Expr, ctx: &mut RenderCtx<'_>) -> (String, PyType) {
        match e {
            Expr::Concat { lhs, rhs } => {
                let (l, _) = Self::expr_py(lhs, ctx);
                let (r, _) = Self::expr_py(rhs, ctx);
                (format!("Concat({l}, {r})"), PyType::Str)
            }
            Expr::Arith { op, lhs, rhs } => {
                let (l, _) = Self::expr_py(lhs, ctx);
                let (r, _) = Self::expr_py(rhs, ctx);
                let ty = if op.is_relational() {
                    PyType::Bool
                } else {
                    PyType::Int
                };
                (format!("({l} {} {r})", op.symbol()), ty)
            }
            Expr::Var(v) => Self::var_py(*v, ctx),
        }
    }

    fn var_py(v: crate::features::predicates::domain::VarId, ctx: &mut RenderCtx<'_>) -> (String, PyType) {
        match ctx.arena.get(v) {
            SymbolicVar::Constant { value } => match value {
                ConstValue::Str(s) => (format!("StringVal(\"{}\")", escape(s)), PyType::Str),
                ConstValue::Int(i) => (i.to_string(), PyType::Int),
                ConstValue::Bool(b) => {
                    (format!("BoolVal({})", if *b { "True" } else { "False" }), PyType::Bool)
                }
                ConstValue::Null => ("0".to_string(), PyType::Int),
                ConstValue::Class(c) => (format!("StringVal(\"{}\")", escape(c)), PyType::Str),
            },
            SymbolicVar::Input { name, ty, .. } => {
                let py = type_of_name(ty);
                (ctx.declare(name, py), py)
            }
            SymbolicVar::FieldAccess { field, .. } => {
                let py = type_of_name(&field.ty);
                (ctx.declare(&format!("field_{}", field.name), py), py)
            }
            SymbolicVar::Heap { field, .. } => {
                let py = type_of_name(&field.ty);
                (ctx.declare(&ctx.arena.label(v), py), py)
            }
            SymbolicVar::MethodCall { sig, receiver, args, .. } => {
                // Solver-native string operations.
                let recv = receiver.clone();
                let arg0 = args.first().cloned();
                match (sig.class.as_str(), sig.name.as_str()) {
                    ("java.lang.String", "length") => {
                        if let Some(inner) = Self::sole_py(recv.as_ref(), ctx) {
                            return (format!("Length({inner})"), PyType::Int);
                        }
                    }
                    ("java.lang.String", "isEmpty") => {
                        if let Some(inner) = Self::sole_py(recv.as_ref(), ctx) {
                            return (format!("(Length({inner}) == 0)"), PyType::Bool);
                        }
                    }
                    ("java.lang.String", "equals") => {
                        if let (Some(l), Some(r)) = (
                            Self::sole_py(recv.as_ref(), ctx),
                            Self::sole_py(arg0.as_ref(), ctx),
                        ) {
                            return (format!("({l} == {r})"), PyType::Bool);
                        }
                    }
                    ("java.lang.String", "startsWith") => {
                        if let (Some(l), Some(r)) = (
                            Self::sole_py(recv.as_ref(), ctx),
                            Self::sole_py(arg0.as_ref(), ctx),
                        ) {
                            return (format!("PrefixOf({r}, {l})"), PyType::Bool);
                        }
                    }
                    ("java.lang.String", "contains") => {
                        if let (Some(l), Some(r)) = (
                            Self::sole_py(recv.as_ref(), ctx),
                            Self::sole_py(arg0.as_ref(), ctx),
                        ) {
                            return (format!("Contains({l}, {r})"), PyType::Bool);
                        }
                    }
                    _ => {}
                }
                let py = type_of_name(&sig.ret);
                (ctx.declare(&ctx.arena.label(v), py), py)
            }
        }
    }

    /// Rendered sole member of a set, when the set has exactly one element.
    fn sole_py(set: Option<&crate::features::predicates::domain::ExprSet>, ctx: &mut RenderCtx<'_>) -> Option<String> {
        let set = set?;
        if set.len() != 1 {
            return None;
        }
        let expr = set.first()?.clone();
        Some(Self::expr_py(&expr, ctx).0)
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// `path.py` for controlled paths: constraints over a `file_path` string
/// variable, optionally asserting the hard-coded prefix; comments list the
/// external input sources.
pub fn render_path_script(prefix: Option<&str>, sources: &[InputSource]) -> String {
    let mut lines = Vec::new();
    for source in sources {
        lines.push(format!("# source: {source}"));
    }
    lines.push("from z3 import *".to_string());
    lines.push(String::new());
    lines.push("s = Solver()".to_string());
    lines.push("file_path = String('file_path')".to_string());
    lines.push("s.add(file_path != StringVal(\"\"))".to_string());
    if let Some(prefix) = prefix {
        lines.push(format!(
            "s.add(PrefixOf(StringVal(\"{}\"), file_path))",
            escape(prefix)
        ));
    }
    lines.push("print(s.check())".to_string());
    lines.push(String::new());
    lines.join("\n")
}

/// `path.txt` for hard-coded paths: one `path = <literal>` line per
/// argument, plus provenance comments.
pub fn render_path_text(literals: &[(Option<usize>, String)], sources: &[InputSource]) -> String {
    let mut lines = Vec::new();
    for (index, literal) in literals {
        match index {
            Some(i) => lines.push(format!("# argument {i}")),
            None => lines.push("# receiver".to_string()),
        }
        lines.push(format!("path = {literal}"));
    }
    for source in sources {
        lines.push(format!("# source: {source}"));
    }
    lines.push(String::new());
    lines.join("\n")
}
