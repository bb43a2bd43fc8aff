//! Three-operand IR with a per-method control-flow graph
//!
//! The lifting stage is external: programs arrive as a serde descriptor of
//! classes, method signatures, and bodies in three-operand form. One unit is
//! one statement; successor edges carry the flow kind so the constraint
//! engine can attach branch predicates without re-deriving block structure.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{AnalysisError, AnalysisResult};

/// Fully-qualified class name, dot-separated (`com.example.MainActivity`).
pub type ClassName = String;

/// Method-local register name (`r0`, `$s1`, parameter names).
pub type LocalId = String;

// ============================================================================
// Signatures
// ============================================================================

/// Fully-qualified method signature.
///
/// Canonical form mirrors the target-list syntax:
/// `<java.io.FileOutputStream: void write(byte[])>`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodSig {
    pub class: ClassName,
    pub ret: String,
    pub name: String,
    pub params: Vec<String>,
}

static SIG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<\s*([^:\s]+)\s*:\s*(\S+)\s+([^\s(]+)\s*\(([^)]*)\)\s*>$")
        .expect("signature pattern is valid")
});

impl MethodSig {
    pub fn new(
        class: impl Into<String>,
        ret: impl Into<String>,
        name: impl Into<String>,
        params: Vec<String>,
    ) -> Self {
        Self {
            class: class.into(),
            ret: ret.into(),
            name: name.into(),
            params,
        }
    }

    /// Render the canonical `<class: ret name(params)>` form.
    pub fn canonical(&self) -> String {
        format!(
            "<{}: {} {}({})>",
            self.class,
            self.ret,
            self.name,
            self.params.join(",")
        )
    }

    /// Parse the canonical form. Whitespace around separators is tolerated;
    /// anything else is a configuration error.
    pub fn parse(text: &str) -> AnalysisResult<Self> {
        let caps = SIG_RE.captures(text.trim()).ok_or_else(|| {
            AnalysisError::Config(format!("malformed method signature: {text:?}"))
        })?;
        let params = caps[4]
            .split(',')
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Ok(Self {
            class: caps[1].to_string(),
            ret: caps[2].to_string(),
            name: caps[3].to_string(),
            params,
        })
    }

    /// Subsignature (ret + name + params) used for lineage lookup, where the
    /// declaring class varies.
    pub fn subsignature(&self) -> String {
        format!("{} {}({})", self.ret, self.name, self.params.join(","))
    }

    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Instance or static field reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    pub class: ClassName,
    pub name: String,
    pub ty: String,
}

impl FieldRef {
    pub fn new(class: impl Into<String>, name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            ty: ty.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}: {} {}>", self.class, self.ty, self.name)
    }
}

// ============================================================================
// Values and operators
// ============================================================================

/// Literal constant. No floats: the sinks under analysis take integral and
/// string parameters, and keeping the type `Eq`/`Ord` lets predicates be
/// normalized structurally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConstValue {
    Null,
    Int(i64),
    Bool(bool),
    Str(String),
    /// Class literal (`B.class`), carried by intent constructors.
    Class(ClassName),
}

impl ConstValue {
    /// Non-zero / non-null / boolean-true interpretation.
    pub fn truthy(&self) -> bool {
        match self {
            ConstValue::Null => false,
            ConstValue::Int(v) => *v != 0,
            ConstValue::Bool(v) => *v,
            ConstValue::Str(_) => true,
            ConstValue::Class(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Null => write!(f, "null"),
            ConstValue::Int(v) => write!(f, "{}", v),
            ConstValue::Bool(v) => write!(f, "{}", v),
            ConstValue::Str(s) => write!(f, "\"{}\"", s),
            ConstValue::Class(c) => write!(f, "{}.class", c),
        }
    }
}

/// Relational and arithmetic operators appearing in expressions and branch
/// conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArithOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl ArithOp {
    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            ArithOp::Eq | ArithOp::Ne | ArithOp::Lt | ArithOp::Le | ArithOp::Gt | ArithOp::Ge
        )
    }

    /// Logical complement of a relational operator.
    pub fn negated(&self) -> Option<ArithOp> {
        match self {
            ArithOp::Eq => Some(ArithOp::Ne),
            ArithOp::Ne => Some(ArithOp::Eq),
            ArithOp::Lt => Some(ArithOp::Ge),
            ArithOp::Ge => Some(ArithOp::Lt),
            ArithOp::Gt => Some(ArithOp::Le),
            ArithOp::Le => Some(ArithOp::Gt),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            ArithOp::Eq => "==",
            ArithOp::Ne => "!=",
            ArithOp::Lt => "<",
            ArithOp::Le => "<=",
            ArithOp::Gt => ">",
            ArithOp::Ge => ">=",
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Rem => "%",
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Statement operand: a local or a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    Local(LocalId),
    Const(ConstValue),
}

impl Operand {
    pub fn local(name: impl Into<String>) -> Self {
        Operand::Local(name.into())
    }

    pub fn str(value: impl Into<String>) -> Self {
        Operand::Const(ConstValue::Str(value.into()))
    }

    pub fn int(value: i64) -> Self {
        Operand::Const(ConstValue::Int(value))
    }

    pub fn null() -> Self {
        Operand::Const(ConstValue::Null)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Local(l) => write!(f, "{}", l),
            Operand::Const(c) => write!(f, "{}", c),
        }
    }
}

// ============================================================================
// Statements
// ============================================================================

/// Invocation flavor. `Special` covers constructors and private dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokeKind {
    Virtual,
    Static,
    Special,
    Interface,
}

/// One call expression with its resolved-at-lift-time signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeExpr {
    pub kind: InvokeKind,
    pub sig: MethodSig,
    pub receiver: Option<LocalId>,
    pub args: Vec<Operand>,
}

impl fmt::Display for InvokeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self
            .args
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        match &self.receiver {
            Some(r) => write!(f, "{}.{}({})", r, self.sig.canonical(), args),
            None => write!(f, "{}({})", self.sig.canonical(), args),
        }
    }
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rvalue {
    /// Copy or literal load.
    Use(Operand),
    /// Binary arithmetic or comparison.
    Binary {
        op: ArithOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// String concatenation.
    Concat { lhs: Operand, rhs: Operand },
    /// Instance or static field read.
    FieldLoad {
        base: Option<LocalId>,
        field: FieldRef,
    },
    /// Allocation. The value is established by the subsequent constructor
    /// invocation on the same local.
    New { class: ClassName },
}

/// Three-operand statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Assign {
        dest: LocalId,
        value: Rvalue,
    },
    Invoke {
        dest: Option<LocalId>,
        call: InvokeExpr,
    },
    FieldStore {
        base: Option<LocalId>,
        field: FieldRef,
        value: Operand,
    },
    /// Conditional branch; the taken/fallthrough targets live on the
    /// successor edges (`FlowKind::TrueBranch` / `FlowKind::FalseBranch`).
    If {
        op: ArithOp,
        lhs: Operand,
        rhs: Operand,
    },
    Goto,
    Return {
        value: Option<Operand>,
    },
    Nop,
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { dest, value } => match value {
                Rvalue::Use(op) => write!(f, "{} = {}", dest, op),
                Rvalue::Binary { op, lhs, rhs } => write!(f, "{} = {} {} {}", dest, lhs, op, rhs),
                Rvalue::Concat { lhs, rhs } => write!(f, "{} = {} + {}", dest, lhs, rhs),
                Rvalue::FieldLoad { base, field } => match base {
                    Some(b) => write!(f, "{} = {}.{}", dest, b, field.name),
                    None => write!(f, "{} = {}", dest, field),
                },
                Rvalue::New { class } => write!(f, "{} = new {}", dest, class),
            },
            Stmt::Invoke { dest, call } => match dest {
                Some(d) => write!(f, "{} = {}", d, call),
                None => write!(f, "{}", call),
            },
            Stmt::FieldStore { base, field, value } => match base {
                Some(b) => write!(f, "{}.{} = {}", b, field.name, value),
                None => write!(f, "{} = {}", field, value),
            },
            Stmt::If { op, lhs, rhs } => write!(f, "if {} {} {}", lhs, op, rhs),
            Stmt::Goto => write!(f, "goto"),
            Stmt::Return { value } => match value {
                Some(v) => write!(f, "return {}", v),
                None => write!(f, "return"),
            },
            Stmt::Nop => write!(f, "nop"),
        }
    }
}

// ============================================================================
// Control flow
// ============================================================================

/// Flow edge kind between units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowKind {
    /// Fall-through execution.
    Sequential,
    /// Taken branch of a conditional.
    TrueBranch,
    /// Not-taken branch of a conditional.
    FalseBranch,
    /// Unconditional jump.
    Jump,
}

/// Method body: ordered units plus per-unit successor edges. Unit 0 is the
/// entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodBody {
    /// Receiver local for instance methods.
    pub this_local: Option<LocalId>,
    /// Parameter locals in declaration order.
    pub param_locals: Vec<LocalId>,
    pub units: Vec<Stmt>,
    /// `succs[i]` lists `(target_unit, kind)` edges out of unit `i`.
    pub succs: Vec<Vec<(usize, FlowKind)>>,
}

impl MethodBody {
    /// Predecessor lists, derived on demand.
    pub fn predecessors(&self) -> Vec<Vec<usize>> {
        let mut preds = vec![Vec::new(); self.units.len()];
        for (i, edges) in self.succs.iter().enumerate() {
            for (target, _) in edges {
                preds[*target].push(i);
            }
        }
        preds
    }

    pub fn unit(&self, index: usize) -> Option<&Stmt> {
        self.units.get(index)
    }
}

/// Method definition: signature plus (optionally) a body. Bodies are absent
/// for framework and library methods; the analysis treats those as opaque
/// method references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub sig: MethodSig,
    pub is_static: bool,
    pub body: Option<MethodBody>,
}

/// Global statement reference: `(method, unit index)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitRef {
    /// Canonical signature of the containing method.
    pub method: String,
    pub index: usize,
}

impl UnitRef {
    pub fn new(method: &MethodSig, index: usize) -> Self {
        Self {
            method: method.canonical(),
            index,
        }
    }
}

impl fmt::Display for UnitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.method, self.index)
    }
}

// ============================================================================
// Body builder
// ============================================================================

/// Incremental body builder used by the entry-point synthesizer and by
/// tests. Units default to fall-through edges; branches and jumps are wired
/// explicitly.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    this_local: Option<LocalId>,
    param_locals: Vec<LocalId>,
    units: Vec<Stmt>,
    explicit: Vec<Option<Vec<(usize, FlowKind)>>>,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instance(mut self, this_local: impl Into<String>) -> Self {
        self.this_local = Some(this_local.into());
        self
    }

    pub fn params(mut self, names: &[&str]) -> Self {
        self.param_locals = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Append a unit; returns its index.
    pub fn push(&mut self, stmt: Stmt) -> usize {
        self.units.push(stmt);
        self.explicit.push(None);
        self.units.len() - 1
    }

    /// Wire a conditional at `index`: taken edge to `on_true`, fall-through
    /// to `on_false`.
    pub fn set_branch(&mut self, index: usize, on_true: usize, on_false: usize) {
        self.explicit[index] = Some(vec![
            (on_true, FlowKind::TrueBranch),
            (on_false, FlowKind::FalseBranch),
        ]);
    }

    /// Wire an unconditional jump at `index`.
    pub fn set_jump(&mut self, index: usize, target: usize) {
        self.explicit[index] = Some(vec![(target, FlowKind::Jump)]);
    }

    pub fn finish(self) -> MethodBody {
        let len = self.units.len();
        let mut succs = Vec::with_capacity(len);
        for (i, (stmt, explicit)) in self.units.iter().zip(self.explicit.iter()).enumerate() {
            if let Some(edges) = explicit {
                succs.push(edges.clone());
                continue;
            }
            match stmt {
                Stmt::Return { .. } => succs.push(Vec::new()),
                Stmt::Goto => succs.push(Vec::new()), // unwired jump: treated as exit
                _ if i + 1 < len => succs.push(vec![(i + 1, FlowKind::Sequential)]),
                _ => succs.push(Vec::new()),
            }
        }
        MethodBody {
            this_local: self.this_local,
            param_locals: self.param_locals,
            units: self.units,
            succs,
        }
    }
}
