//! Predicate minimization
//!
//! Rewriting to fixpoint: double-negation elimination, De Morgan
//! normalization to NNF, absorption, idempotence, complement, and constant
//! folding. Every rule preserves logical equivalence, so
//! `SAT(P) == SAT(minimize(P))` holds by construction.

use crate::shared::models::ir::{ArithOp, ConstValue};

use super::super::domain::{Expr, Predicate, SymbolicVar, VarArena};

/// Round bound for the rewrite fixpoint. Each round strictly shrinks or
/// stabilizes the tree, so this is a backstop, not a tuning knob.
const MAX_ROUNDS: usize = 64;

/// Minimize `p` to a logically equivalent, structurally smaller predicate.
pub fn minimize(p: &Predicate, arena: &VarArena) -> Predicate {
    let mut current = to_nnf(p.clone());
    for _ in 0..MAX_ROUNDS {
        let next = simplify(&current, arena);
        if next.structurally_eq(&current) {
            return next;
        }
        current = next;
    }
    current
}

/// Push negations to the atoms. Relational atoms absorb the negation by
/// operator complement; other atoms keep an explicit `Not`.
fn to_nnf(p: Predicate) -> Predicate {
    match p {
        Predicate::Not(inner) => match *inner {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(q) => to_nnf(*q),
            Predicate::And(ps) => {
                Predicate::Or(ps.into_iter().map(|q| to_nnf(Predicate::not(q))).collect())
            }
            Predicate::Or(ps) => {
                Predicate::And(ps.into_iter().map(|q| to_nnf(Predicate::not(q))).collect())
            }
            Predicate::Expr(e) => match negate_atom(&e) {
                Some(neg) => Predicate::Expr(neg),
                None => Predicate::not(Predicate::Expr(e)),
            },
        },
        Predicate::And(ps) => Predicate::And(ps.into_iter().map(to_nnf).collect()),
        Predicate::Or(ps) => Predicate::Or(ps.into_iter().map(to_nnf).collect()),
        other => other,
    }
}

/// `!(a < b)` becomes `a >= b`, and so on for the other relational ops.
fn negate_atom(e: &Expr) -> Option<Expr> {
    if let Expr::Arith { op, lhs, rhs } = e {
        let flipped = op.negated()?;
        return Some(Expr::Arith {
            op: flipped,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        });
    }
    None
}

fn simplify(p: &Predicate, arena: &VarArena) -> Predicate {
    match p {
        Predicate::True => Predicate::True,
        Predicate::False => Predicate::False,
        Predicate::Expr(e) => match fold_atom(e, arena) {
            Some(true) => Predicate::True,
            Some(false) => Predicate::False,
            None => Predicate::Expr(e.clone()),
        },
        Predicate::Not(inner) => match simplify(inner, arena) {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(q) => *q,
            q => Predicate::not(q),
        },
        Predicate::And(ps) => simplify_junction(ps, arena, true),
        Predicate::Or(ps) => simplify_junction(ps, arena, false),
    }
}

/// Shared And/Or simplification: flatten, identity/annihilator, idempotence,
/// complement, absorption.
fn simplify_junction(children: &[Predicate], arena: &VarArena, conjunction: bool) -> Predicate {
    let (identity, annihilator) = if conjunction {
        (Predicate::True, Predicate::False)
    } else {
        (Predicate::False, Predicate::True)
    };

    let mut flat: Vec<Predicate> = Vec::new();
    for child in children {
        let s = simplify(child, arena);
        if s == annihilator {
            return annihilator;
        }
        if s == identity {
            continue;
        }
        match (conjunction, s) {
            (true, Predicate::And(inner)) => flat.extend(inner),
            (false, Predicate::Or(inner)) => flat.extend(inner),
            (_, other) => flat.push(other),
        }
    }

    // Idempotence: A op A == A.
    let mut unique: Vec<Predicate> = Vec::new();
    for child in flat {
        if !unique.iter().any(|u| u.structurally_eq(&child)) {
            unique.push(child);
        }
    }

    // Complement: A and !A annihilate.
    for i in 0..unique.len() {
        for j in (i + 1)..unique.len() {
            if complements(&unique[i], &unique[j]) {
                return annihilator;
            }
        }
    }

    // Absorption: A ∧ (A ∨ B) == A, dually A ∨ (A ∧ B) == A.
    let absorbed: Vec<Predicate> = unique
        .iter()
        .filter(|child| {
            let inner = match (conjunction, child) {
                (true, Predicate::Or(qs)) => qs,
                (false, Predicate::And(qs)) => qs,
                _ => return true,
            };
            !inner.iter().any(|q| {
                unique
                    .iter()
                    .any(|other| !std::ptr::eq(other, *child) && other.structurally_eq(q))
            })
        })
        .cloned()
        .collect();

    match absorbed.len() {
        0 => identity,
        1 => absorbed.into_iter().next().expect("len checked"),
        _ if conjunction => Predicate::And(absorbed),
        _ => Predicate::Or(absorbed),
    }
}

/// `a` and `b` are syntactic complements: one is the negation of the other,
/// either by an explicit `Not` or by relational-operator complement.
fn complements(a: &Predicate, b: &Predicate) -> bool {
    if let Predicate::Not(inner) = a {
        if inner.structurally_eq(b) {
            return true;
        }
    }
    if let Predicate::Not(inner) = b {
        if inner.structurally_eq(a) {
            return true;
        }
    }
    if let (Predicate::Expr(ea), Predicate::Expr(eb)) = (a, b) {
        if let Some(neg) = negate_atom(ea) {
            return neg == *eb;
        }
    }
    false
}

/// Atom-level constant folding under the non-zero / non-null / boolean-true
/// interpretation.
fn fold_atom(e: &Expr, arena: &VarArena) -> Option<bool> {
    eval_const(e, arena).map(|v| v.truthy())
}

/// Evaluate a ground expression to a constant. Non-ground subtrees abort.
pub(crate) fn eval_const(e: &Expr, arena: &VarArena) -> Option<ConstValue> {
    match e {
        Expr::Var(v) => match arena.get(*v) {
            SymbolicVar::Constant { value } => Some(value.clone()),
            _ => None,
        },
        Expr::Concat { lhs, rhs } => {
            let l = eval_const(lhs, arena)?;
            let r = eval_const(rhs, arena)?;
            match (l, r) {
                (ConstValue::Str(a), ConstValue::Str(b)) => Some(ConstValue::Str(a + &b)),
                _ => None,
            }
        }
        Expr::Arith { op, lhs, rhs } => {
            let l = eval_const(lhs, arena)?;
            let r = eval_const(rhs, arena)?;
            if op.is_relational() {
                return fold_relation(*op, &l, &r).map(ConstValue::Bool);
            }
            match (op, l, r) {
                (ArithOp::Add, ConstValue::Int(a), ConstValue::Int(b)) => {
                    Some(ConstValue::Int(a.wrapping_add(b)))
                }
                (ArithOp::Sub, ConstValue::Int(a), ConstValue::Int(b)) => {
                    Some(ConstValue::Int(a.wrapping_sub(b)))
                }
                (ArithOp::Mul, ConstValue::Int(a), ConstValue::Int(b)) => {
                    Some(ConstValue::Int(a.wrapping_mul(b)))
                }
                (ArithOp::Div, ConstValue::Int(a), ConstValue::Int(b)) if b != 0 => {
                    Some(ConstValue::Int(a / b))
                }
                (ArithOp::Rem, ConstValue::Int(a), ConstValue::Int(b)) if b != 0 => {
                    Some(ConstValue::Int(a % b))
                }
                _ => None,
            }
        }
    }
}

fn fold_relation(op: ArithOp, l: &ConstValue, r: &ConstValue) -> Option<bool> {
    use ConstValue::*;
    match (l, r) {
        (Int(a), Int(b)) => Some(match op {
            ArithOp::Eq => a == b,
            ArithOp::Ne => a != b,
            ArithOp::Lt => a < b,
            ArithOp::Le => a <= b,
            ArithOp::Gt => a > b,
            ArithOp::Ge => a >= b,
            _ => return None,
        }),
        (Bool(a), Bool(b)) => match op {
            ArithOp::Eq => Some(a == b),
            ArithOp::Ne => Some(a != b),
            _ => None,
        },
        (Str(a), Str(b)) => match op {
            ArithOp::Eq => Some(a == b),
            ArithOp::Ne => Some(a != b),
            _ => None,
        },
        (Null, Null) => match op {
            ArithOp::Eq => Some(true),
            ArithOp::Ne => Some(false),
            _ => None,
        },
        // A literal is never null.
        (Null, _) | (_, Null) => match op {
            ArithOp::Eq => Some(false),
            ArithOp::Ne => Some(true),
            _ => None,
        },
        _ => None,
    }
}
