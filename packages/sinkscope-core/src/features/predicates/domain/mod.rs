//! Predicate algebra domain models
//!
//! Variables and expressions mutually refer to each other in the source
//! semantics; here variables live in an arena with stable integer IDs and
//! expression trees reference IDs only, so trees stay acyclic and cloning a
//! per-path state never aliases another path's variables.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::shared::models::ir::{ArithOp, ClassName, ConstValue, FieldRef, MethodSig, UnitRef};

/// Identifier of the path on which an Input variable was created. Inputs do
/// not migrate across paths.
pub type PathId = u32;

/// Stable variable ID within one path's arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct VarId(pub u32);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Base object of a heap location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeapBase {
    /// Instance field: keyed by the receiver's symbolic variable.
    Var(VarId),
    /// Static field: keyed by the declaring class.
    Static(ClassName),
}

/// Symbolic variable. Disjoint variants per provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SymbolicVar {
    /// Argument or receiver of the path's entry method.
    Input {
        path: PathId,
        slot: usize,
        ty: String,
        name: String,
    },
    /// Literal of a primitive or string type.
    Constant { value: ConstValue },
    /// Return value of an invocation at a specific call site. Captures the
    /// method reference plus the argument expression sets seen there; the
    /// callee's body, when on the path, is covered by the path itself.
    MethodCall {
        site: UnitRef,
        sig: MethodSig,
        receiver: Option<ExprSet>,
        args: Vec<ExprSet>,
        /// Literal string arguments by parameter slot.
        string_args: Vec<(usize, String)>,
    },
    /// Read of a field whose declaring type is known; conservatively
    /// attacker-visible.
    FieldAccess { field: FieldRef, is_static: bool },
    /// Abstract heap location, the bridge consumed by the dependency
    /// resolver.
    Heap { base: HeapBase, field: FieldRef },
}

impl SymbolicVar {
    pub fn is_heap(&self) -> bool {
        matches!(self, SymbolicVar::Heap { .. })
    }

    pub fn is_input(&self) -> bool {
        matches!(self, SymbolicVar::Input { .. })
    }
}

/// Arena holding every symbolic variable of one path. Constants are
/// interned so repeated literals share an ID.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct VarArena {
    vars: Vec<SymbolicVar>,
    #[serde(skip)]
    const_index: FxHashMap<ConstValue, VarId>,
}

impl VarArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, var: SymbolicVar) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(var);
        id
    }

    /// Interned constant allocation.
    pub fn constant(&mut self, value: ConstValue) -> VarId {
        if let Some(id) = self.const_index.get(&value) {
            return *id;
        }
        let id = self.alloc(SymbolicVar::Constant {
            value: value.clone(),
        });
        self.const_index.insert(value, id);
        id
    }

    pub fn get(&self, id: VarId) -> &SymbolicVar {
        &self.vars[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, &SymbolicVar)> {
        self.vars
            .iter()
            .enumerate()
            .map(|(i, v)| (VarId(i as u32), v))
    }

    /// Deep-copy a variable from another arena. Nested expression sets are
    /// imported too; `memo` preserves sharing so one source variable maps
    /// to one destination variable. Source trees are acyclic, so the
    /// recursion terminates.
    pub fn import_var(
        &mut self,
        src: &VarArena,
        id: VarId,
        memo: &mut FxHashMap<VarId, VarId>,
    ) -> VarId {
        if let Some(mapped) = memo.get(&id) {
            return *mapped;
        }
        let imported = match src.get(id).clone() {
            SymbolicVar::Constant { value } => self.constant(value),
            SymbolicVar::MethodCall {
                site,
                sig,
                receiver,
                args,
                string_args,
            } => {
                let receiver = receiver.map(|set| self.import_set(src, &set, memo));
                let args = args
                    .iter()
                    .map(|set| self.import_set(src, set, memo))
                    .collect();
                self.alloc(SymbolicVar::MethodCall {
                    site,
                    sig,
                    receiver,
                    args,
                    string_args,
                })
            }
            SymbolicVar::Heap { base, field } => {
                let base = match base {
                    HeapBase::Var(v) => HeapBase::Var(self.import_var(src, v, memo)),
                    static_base => static_base,
                };
                self.alloc(SymbolicVar::Heap { base, field })
            }
            other => self.alloc(other),
        };
        memo.insert(id, imported);
        imported
    }

    pub fn import_expr(
        &mut self,
        src: &VarArena,
        expr: &Expr,
        memo: &mut FxHashMap<VarId, VarId>,
    ) -> Expr {
        match expr {
            Expr::Var(v) => Expr::Var(self.import_var(src, *v, memo)),
            Expr::Arith { op, lhs, rhs } => Expr::Arith {
                op: *op,
                lhs: Box::new(self.import_expr(src, lhs, memo)),
                rhs: Box::new(self.import_expr(src, rhs, memo)),
            },
            Expr::Concat { lhs, rhs } => Expr::Concat {
                lhs: Box::new(self.import_expr(src, lhs, memo)),
                rhs: Box::new(self.import_expr(src, rhs, memo)),
            },
        }
    }

    pub fn import_set(
        &mut self,
        src: &VarArena,
        set: &ExprSet,
        memo: &mut FxHashMap<VarId, VarId>,
    ) -> ExprSet {
        set.iter()
            .map(|e| self.import_expr(src, e, memo))
            .collect()
    }

    pub fn import_predicate(
        &mut self,
        src: &VarArena,
        p: &Predicate,
        memo: &mut FxHashMap<VarId, VarId>,
    ) -> Predicate {
        match p {
            Predicate::True => Predicate::True,
            Predicate::False => Predicate::False,
            Predicate::Expr(e) => Predicate::Expr(self.import_expr(src, e, memo)),
            Predicate::Not(inner) => Predicate::not(self.import_predicate(src, inner, memo)),
            Predicate::And(ps) => Predicate::And(
                ps.iter()
                    .map(|q| self.import_predicate(src, q, memo))
                    .collect(),
            ),
            Predicate::Or(ps) => Predicate::Or(
                ps.iter()
                    .map(|q| self.import_predicate(src, q, memo))
                    .collect(),
            ),
        }
    }

    /// Human-readable variable label, stable per arena.
    pub fn label(&self, id: VarId) -> String {
        match self.get(id) {
            SymbolicVar::Input { name, .. } => name.clone(),
            SymbolicVar::Constant { value } => value.to_string(),
            SymbolicVar::MethodCall { sig, .. } => format!("{}_{}", sig.name, id.0),
            SymbolicVar::FieldAccess { field, .. } => format!("{}_{}", field.name, id.0),
            SymbolicVar::Heap { field, .. } => format!("heap_{}_{}", field.name, id.0),
        }
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// Finite expression tree over arena variables.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Expr {
    Var(VarId),
    Arith {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Concat { lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    pub fn var(id: VarId) -> Self {
        Expr::Var(id)
    }

    pub fn arith(op: ArithOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Arith {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn concat(lhs: Expr, rhs: Expr) -> Self {
        Expr::Concat {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn contains_var(&self, id: VarId) -> bool {
        match self {
            Expr::Var(v) => *v == id,
            Expr::Arith { lhs, rhs, .. } | Expr::Concat { lhs, rhs } => {
                lhs.contains_var(id) || rhs.contains_var(id)
            }
        }
    }

    /// Collect referenced variable IDs, in tree order.
    pub fn collect_vars(&self, out: &mut Vec<VarId>) {
        match self {
            Expr::Var(v) => out.push(*v),
            Expr::Arith { lhs, rhs, .. } | Expr::Concat { lhs, rhs } => {
                lhs.collect_vars(out);
                rhs.collect_vars(out);
            }
        }
    }

    pub fn render(&self, arena: &VarArena) -> String {
        match self {
            Expr::Var(v) => arena.label(*v),
            Expr::Arith { op, lhs, rhs } => {
                format!("({} {} {})", lhs.render(arena), op, rhs.render(arena))
            }
            Expr::Concat { lhs, rhs } => {
                format!("({} ++ {})", lhs.render(arena), rhs.render(arena))
            }
        }
    }
}

/// Unordered collection of the values a program variable may hold along the
/// path. Insertion deduplicates; the capacity bound applies
/// widening-by-replacement, dropping the least recent member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExprSet {
    exprs: Vec<Expr>,
}

impl ExprSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(expr: Expr) -> Self {
        Self { exprs: vec![expr] }
    }

    pub fn insert(&mut self, expr: Expr, cap: usize) {
        if self.exprs.contains(&expr) {
            return;
        }
        self.exprs.push(expr);
        while self.exprs.len() > cap.max(1) {
            self.exprs.remove(0);
        }
    }

    pub fn union(&mut self, other: &ExprSet, cap: usize) {
        for e in &other.exprs {
            self.insert(e.clone(), cap);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Expr> {
        self.exprs.iter()
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn first(&self) -> Option<&Expr> {
        self.exprs.first()
    }

    /// The single variable this set denotes, when it is exactly one
    /// variable reference.
    pub fn sole_var(&self) -> Option<VarId> {
        match self.exprs.as_slice() {
            [Expr::Var(v)] => Some(*v),
            _ => None,
        }
    }
}

impl FromIterator<Expr> for ExprSet {
    fn from_iter<I: IntoIterator<Item = Expr>>(iter: I) -> Self {
        let mut set = ExprSet::new();
        for e in iter {
            set.insert(e, usize::MAX);
        }
        set
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// Join operator for `Predicate::combine`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoolJoin {
    And,
    Or,
}

/// Boolean formula over expressions. An atomic `Expr` is read under the
/// non-zero / non-null / boolean-true interpretation.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Predicate {
    True,
    False,
    Expr(Expr),
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn not(p: Predicate) -> Predicate {
        Predicate::Not(Box::new(p))
    }

    /// Conjunction with shortcuts and flattening.
    pub fn and(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::True, q) | (q, Predicate::True) => q,
            (Predicate::False, _) | (_, Predicate::False) => Predicate::False,
            (Predicate::And(mut a), Predicate::And(b)) => {
                a.extend(b);
                Predicate::And(a)
            }
            (Predicate::And(mut a), q) => {
                a.push(q);
                Predicate::And(a)
            }
            (p, Predicate::And(mut b)) => {
                b.insert(0, p);
                Predicate::And(b)
            }
            (p, q) => Predicate::And(vec![p, q]),
        }
    }

    /// Disjunction with shortcuts and flattening.
    pub fn or(self, other: Predicate) -> Predicate {
        match (self, other) {
            (Predicate::False, q) | (q, Predicate::False) => q,
            (Predicate::True, _) | (_, Predicate::True) => Predicate::True,
            (Predicate::Or(mut a), Predicate::Or(b)) => {
                a.extend(b);
                Predicate::Or(a)
            }
            (Predicate::Or(mut a), q) => {
                a.push(q);
                Predicate::Or(a)
            }
            (p, Predicate::Or(mut b)) => {
                b.insert(0, p);
                Predicate::Or(b)
            }
            (p, q) => Predicate::Or(vec![p, q]),
        }
    }

    /// `combine(op, p, q)` with `None` acting as the identity for the join.
    pub fn combine(op: BoolJoin, p: Option<Predicate>, q: Predicate) -> Predicate {
        match (op, p) {
            (_, None) => q,
            (BoolJoin::And, Some(p)) => p.and(q),
            (BoolJoin::Or, Some(p)) => p.or(q),
        }
    }

    /// True when `e` occurs anywhere in the formula.
    pub fn contains_expression(&self, e: &Expr) -> bool {
        match self {
            Predicate::True | Predicate::False => false,
            Predicate::Expr(inner) => inner == e || Self::expr_contains(inner, e),
            Predicate::Not(p) => p.contains_expression(e),
            Predicate::And(ps) | Predicate::Or(ps) => {
                ps.iter().any(|p| p.contains_expression(e))
            }
        }
    }

    fn expr_contains(haystack: &Expr, needle: &Expr) -> bool {
        if haystack == needle {
            return true;
        }
        match haystack {
            Expr::Var(_) => false,
            Expr::Arith { lhs, rhs, .. } | Expr::Concat { lhs, rhs } => {
                Self::expr_contains(lhs, needle) || Self::expr_contains(rhs, needle)
            }
        }
    }

    /// True when any referenced variable satisfies `pred`.
    pub fn mentions_var(&self, id: VarId) -> bool {
        match self {
            Predicate::True | Predicate::False => false,
            Predicate::Expr(e) => e.contains_var(id),
            Predicate::Not(p) => p.mentions_var(id),
            Predicate::And(ps) | Predicate::Or(ps) => ps.iter().any(|p| p.mentions_var(id)),
        }
    }

    pub fn collect_vars(&self, out: &mut Vec<VarId>) {
        match self {
            Predicate::True | Predicate::False => {}
            Predicate::Expr(e) => e.collect_vars(out),
            Predicate::Not(p) => p.collect_vars(out),
            Predicate::And(ps) | Predicate::Or(ps) => {
                for p in ps {
                    p.collect_vars(out);
                }
            }
        }
    }

    /// Flatten nested And/Or and sort children, yielding a canonical tree.
    /// Equal normal forms mean equality modulo commutativity and
    /// associativity.
    pub fn normalized(&self) -> Predicate {
        match self {
            Predicate::And(ps) => {
                let mut flat = Vec::new();
                for p in ps {
                    match p.normalized() {
                        Predicate::And(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                flat.sort();
                match flat.len() {
                    0 => Predicate::True,
                    1 => flat.pop().expect("len checked"),
                    _ => Predicate::And(flat),
                }
            }
            Predicate::Or(ps) => {
                let mut flat = Vec::new();
                for p in ps {
                    match p.normalized() {
                        Predicate::Or(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                flat.sort();
                match flat.len() {
                    0 => Predicate::False,
                    1 => flat.pop().expect("len checked"),
                    _ => Predicate::Or(flat),
                }
            }
            Predicate::Not(p) => Predicate::not(p.normalized()),
            other => other.clone(),
        }
    }

    /// Structural equality modulo commutativity/associativity of And/Or.
    pub fn structurally_eq(&self, other: &Predicate) -> bool {
        self.normalized() == other.normalized()
    }

    pub fn render(&self, arena: &VarArena) -> String {
        match self {
            Predicate::True => "true".to_string(),
            Predicate::False => "false".to_string(),
            Predicate::Expr(e) => e.render(arena),
            Predicate::Not(p) => format!("!{}", p.render(arena)),
            Predicate::And(ps) => {
                let parts: Vec<_> = ps.iter().map(|p| p.render(arena)).collect();
                format!("({})", parts.join(" && "))
            }
            Predicate::Or(ps) => {
                let parts: Vec<_> = ps.iter().map(|p| p.render(arena)).collect();
                format!("({})", parts.join(" || "))
            }
        }
    }
}
