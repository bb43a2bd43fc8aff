//! Satisfiability oracle
//!
//! The real SMT backend is an external collaborator reached through the
//! `SatOracle` port. The built-in `GroundTermOracle` decides the easy
//! fraction: minimized-to-constant predicates, conjunctions of ground
//! literals, and equality/ordering contradictions over a single variable.
//! Everything else is `Unknown` and the caller keeps the path.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::shared::models::ir::{ArithOp, ConstValue};

use super::super::domain::{Expr, Predicate, VarArena, VarId};
use super::minimize::{eval_const, minimize};

/// Oracle verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Satisfiability {
    Sat,
    Unsat,
    Unknown,
}

impl Satisfiability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Satisfiability::Sat => "sat",
            Satisfiability::Unsat => "unsat",
            Satisfiability::Unknown => "unknown",
        }
    }
}

/// Port to the satisfiability decider.
pub trait SatOracle: Send + Sync {
    fn check(&self, p: &Predicate, arena: &VarArena) -> Satisfiability;
}

/// Ground-term checker covering the cheap cases without a solver process.
#[derive(Debug, Clone)]
pub struct GroundTermOracle {
    /// Conjunctions larger than this are reported Unknown.
    max_atoms: usize,
}

impl Default for GroundTermOracle {
    fn default() -> Self {
        Self { max_atoms: 64 }
    }
}

impl GroundTermOracle {
    pub fn new(max_atoms: usize) -> Self {
        Self { max_atoms }
    }

    /// Split a minimized predicate into conjunction literals, or bail when
    /// the top level is not a conjunction.
    fn literals(p: &Predicate) -> Option<Vec<&Predicate>> {
        match p {
            Predicate::And(ps) => Some(ps.iter().collect()),
            Predicate::Expr(_) | Predicate::Not(_) => Some(vec![p]),
            _ => None,
        }
    }

    /// Equality binding `var == const` extracted from a literal.
    fn binding<'a>(literal: &'a Predicate, arena: &VarArena) -> Option<(VarId, ConstValue, ArithOp)> {
        let Predicate::Expr(Expr::Arith { op, lhs, rhs }) = literal else {
            return None;
        };
        if !op.is_relational() {
            return None;
        }
        match (lhs.as_ref(), rhs.as_ref()) {
            (Expr::Var(v), other) => eval_const(other, arena).map(|c| (*v, c, *op)),
            (other, Expr::Var(v)) => {
                // Normalize `c op v` to `v op' c` for the symmetric ops we use.
                let flipped = match op {
                    ArithOp::Eq | ArithOp::Ne => *op,
                    ArithOp::Lt => ArithOp::Gt,
                    ArithOp::Gt => ArithOp::Lt,
                    ArithOp::Le => ArithOp::Ge,
                    ArithOp::Ge => ArithOp::Le,
                    _ => return None,
                };
                eval_const(other, arena).map(|c| (*v, c, flipped))
            }
            _ => None,
        }
    }

    fn contradicts(a: &(VarId, ConstValue, ArithOp), b: &(VarId, ConstValue, ArithOp)) -> bool {
        if a.0 != b.0 {
            return false;
        }
        use ArithOp::*;
        match (a.2, b.2) {
            // x == c1 with x == c2, different constants.
            (Eq, Eq) => a.1 != b.1,
            // x == c with x != c.
            (Eq, Ne) | (Ne, Eq) => a.1 == b.1,
            // x == c with an ordering the constant violates.
            (Eq, other) | (other, Eq) => {
                let (bound, val) = if a.2 == Eq { (b, &a.1) } else { (a, &b.1) };
                if let (ConstValue::Int(v), ConstValue::Int(c)) = (val, &bound.1) {
                    match other {
                        Lt => !(v < c),
                        Le => !(v <= c),
                        Gt => !(v > c),
                        Ge => !(v >= c),
                        _ => false,
                    }
                } else {
                    false
                }
            }
            // Disjoint integer intervals, same variable.
            (Lt, Gt) | (Lt, Ge) | (Le, Gt) => {
                matches!((&a.1, &b.1), (ConstValue::Int(hi), ConstValue::Int(lo)) if lo >= hi)
            }
            (Gt, Lt) | (Ge, Lt) | (Gt, Le) => {
                matches!((&a.1, &b.1), (ConstValue::Int(lo), ConstValue::Int(hi)) if lo >= hi)
            }
            _ => false,
        }
    }
}

impl SatOracle for GroundTermOracle {
    fn check(&self, p: &Predicate, arena: &VarArena) -> Satisfiability {
        let m = minimize(p, arena);
        match &m {
            Predicate::True => return Satisfiability::Sat,
            Predicate::False => return Satisfiability::Unsat,
            _ => {}
        }

        let Some(literals) = Self::literals(&m) else {
            // Disjunctive structure survived minimization.
            return Satisfiability::Unknown;
        };
        if literals.len() > self.max_atoms {
            return Satisfiability::Unknown;
        }

        let mut bindings: FxHashMap<VarId, Vec<(VarId, ConstValue, ArithOp)>> =
            FxHashMap::default();
        for &literal in &literals {
            if let Predicate::And(_) | Predicate::Or(_) = literal {
                return Satisfiability::Unknown;
            }
            if let Some(b) = Self::binding(literal, arena) {
                let entry = bindings.entry(b.0).or_default();
                if entry.iter().any(|prev| Self::contradicts(prev, &b)) {
                    return Satisfiability::Unsat;
                }
                entry.push(b);
            }
        }

        // No ground contradiction found.
        Satisfiability::Sat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::predicates::domain::SymbolicVar;

    fn input(arena: &mut VarArena, name: &str) -> VarId {
        arena.alloc(SymbolicVar::Input {
            path: 0,
            slot: 0,
            ty: "int".into(),
            name: name.into(),
        })
    }

    fn cmp(arena: &mut VarArena, v: VarId, op: ArithOp, c: i64) -> Predicate {
        let k = arena.constant(ConstValue::Int(c));
        Predicate::Expr(Expr::arith(op, Expr::var(v), Expr::var(k)))
    }

    #[test]
    fn test_trivial_verdicts() {
        let arena = VarArena::new();
        let oracle = GroundTermOracle::default();
        assert_eq!(oracle.check(&Predicate::True, &arena), Satisfiability::Sat);
        assert_eq!(oracle.check(&Predicate::False, &arena), Satisfiability::Unsat);
    }

    #[test]
    fn test_conflicting_equalities() {
        let mut arena = VarArena::new();
        let x = input(&mut arena, "x");
        let p = cmp(&mut arena, x, ArithOp::Eq, 1).and(cmp(&mut arena, x, ArithOp::Eq, 2));
        let oracle = GroundTermOracle::default();
        assert_eq!(oracle.check(&p, &arena), Satisfiability::Unsat);
    }

    #[test]
    fn test_eq_vs_ne_same_constant() {
        let mut arena = VarArena::new();
        let x = input(&mut arena, "x");
        let p = cmp(&mut arena, x, ArithOp::Eq, 5).and(cmp(&mut arena, x, ArithOp::Ne, 5));
        let oracle = GroundTermOracle::default();
        assert_eq!(oracle.check(&p, &arena), Satisfiability::Unsat);
    }

    #[test]
    fn test_disjoint_intervals() {
        let mut arena = VarArena::new();
        let x = input(&mut arena, "x");
        // x < 0 && x > 10
        let p = cmp(&mut arena, x, ArithOp::Lt, 0).and(cmp(&mut arena, x, ArithOp::Gt, 10));
        let oracle = GroundTermOracle::default();
        assert_eq!(oracle.check(&p, &arena), Satisfiability::Unsat);
    }

    #[test]
    fn test_consistent_conjunction_is_sat() {
        let mut arena = VarArena::new();
        let x = input(&mut arena, "x");
        let y = input(&mut arena, "y");
        let p = cmp(&mut arena, x, ArithOp::Gt, 0).and(cmp(&mut arena, y, ArithOp::Eq, 3));
        let oracle = GroundTermOracle::default();
        assert_eq!(oracle.check(&p, &arena), Satisfiability::Sat);
    }

    #[test]
    fn test_disjunction_is_unknown() {
        let mut arena = VarArena::new();
        let x = input(&mut arena, "x");
        let y = input(&mut arena, "y");
        let p = cmp(&mut arena, x, ArithOp::Gt, 0).or(cmp(&mut arena, y, ArithOp::Eq, 3));
        let oracle = GroundTermOracle::default();
        assert_eq!(oracle.check(&p, &arena), Satisfiability::Unknown);
    }

    #[test]
    fn test_sat_agrees_with_minimize() {
        let mut arena = VarArena::new();
        let x = input(&mut arena, "x");
        let a = cmp(&mut arena, x, ArithOp::Lt, 0);
        let p = a.clone().and(Predicate::not(a));
        let oracle = GroundTermOracle::default();
        assert_eq!(oracle.check(&p, &arena), Satisfiability::Unsat);
        assert_eq!(minimize(&p, &arena), Predicate::False);
    }
}
