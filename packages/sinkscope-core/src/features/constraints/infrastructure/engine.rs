//! Per-path constraint engine
//!
//! Algorithm per path:
//! 1. Bind the entry method's receiver and parameters to fresh Input
//!    variables.
//! 2. For each consecutive call edge, run the intraprocedural forward
//!    dataflow up to the call unit, then map the callee frame from the
//!    actual arguments (heap carried forward, constraint conjoined).
//! 3. At the terminal method, take the fact immediately before the sink
//!    statement; minimize its constraint and collect the sink argument
//!    expression sets.
//!
//! The intraprocedural pass is a classic worklist fixpoint (Kildall, 1973)
//! over unit-level flow edges. Termination: expression sets truncate at a
//! configured bound with deterministic drop-least-recent widening, and the
//! worklist itself carries an iteration backstop.
//!
//! Cancellation is cooperative: the work budget is checked at every
//! worklist pop and between call edges; cancelled work never mutates
//! shared state.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

use crate::config::AnalysisConfig;
use crate::errors::{AnalysisError, AnalysisResult};
use crate::features::pathfinder::domain::{CallPath, CallStep};
use crate::features::predicates::domain::{
    Expr, ExprSet, HeapBase, PathId, Predicate, SymbolicVar, VarArena, VarId,
};
use crate::features::predicates::infrastructure::minimize::minimize;
use crate::features::predicates::infrastructure::oracle::{SatOracle, Satisfiability};
use crate::shared::models::app::AppModel;
use crate::shared::models::ir::{
    ArithOp, ConstValue, FieldRef, FlowKind, InvokeExpr, LocalId, MethodBody, MethodSig, Operand,
    Rvalue, Stmt, UnitRef,
};

use super::super::domain::{DataMap, HeapLoc};

/// Cooperative work budget: per-path wall clock plus the shared cancel
/// flag.
#[derive(Debug, Clone)]
pub struct WorkBudget {
    deadline: Option<Instant>,
    per_path: Option<Duration>,
    cancel: Arc<AtomicBool>,
}

impl WorkBudget {
    pub fn new(per_path: Option<Duration>, cancel: Arc<AtomicBool>) -> Self {
        Self {
            deadline: per_path.map(|d| Instant::now() + d),
            per_path,
            cancel,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            per_path: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Suspension point: observe cancellation and the per-path deadline.
    pub fn checkpoint(&self) -> AnalysisResult<()> {
        if self.cancel.load(Ordering::Relaxed) {
            return Err(AnalysisError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() > deadline {
                return Err(AnalysisError::PathTimeout(
                    self.per_path.unwrap_or_default(),
                ));
            }
        }
        Ok(())
    }
}

/// Outcome classification of the minimized path constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintStatus {
    /// SAT under the oracle: potentially exploitable.
    Satisfiable,
    /// Minimized to False or refuted by the oracle: the path is infeasible.
    TriviallyFalse,
    /// The oracle could not decide; the path is kept and marked.
    Undecided,
}

/// One string-relevant argument of the sink invocation.
#[derive(Debug, Clone)]
pub struct SinkArgument {
    pub index: usize,
    pub static_ty: String,
    pub exprs: ExprSet,
}

/// Everything the downstream stages need from one path's symbolic run.
#[derive(Debug)]
pub struct PathEvaluation {
    pub path_id: PathId,
    pub arena: VarArena,
    /// Minimized path constraint.
    pub constraint: Predicate,
    pub status: ConstraintStatus,
    /// Sink invocation signature, when the terminal unit is an invoke.
    pub sink: Option<MethodSig>,
    pub sink_args: Vec<SinkArgument>,
    /// Receiver expression set of the sink invocation; file-valued
    /// receivers carry the path when no string argument does.
    pub sink_receiver: Option<ExprSet>,
    /// Value stored by a field-write terminal (supporting paths).
    pub stored_value: Option<ExprSet>,
    /// Heap variables occurring in the final constraint.
    pub heap_vars: Vec<VarId>,
    /// Input variables bound at the entry frame.
    pub inputs: Vec<VarId>,
}

pub struct ConstraintEngine<'a> {
    app: &'a AppModel,
    config: &'a AnalysisConfig,
    oracle: &'a dyn SatOracle,
}

impl<'a> ConstraintEngine<'a> {
    pub fn new(app: &'a AppModel, config: &'a AnalysisConfig, oracle: &'a dyn SatOracle) -> Self {
        Self {
            app,
            config,
            oracle,
        }
    }

    /// Run the symbolic dataflow along `path`.
    pub fn evaluate(
        &self,
        path: &CallPath,
        path_id: PathId,
        budget: &WorkBudget,
    ) -> AnalysisResult<PathEvaluation> {
        let mut arena = VarArena::new();
        let entry_key = path.entry.canonical();
        let entry_def = self
            .app
            .method(&entry_key)
            .ok_or_else(|| AnalysisError::MissingClass(entry_key.clone()))?;
        let entry_body = entry_def
            .body
            .as_ref()
            .ok_or_else(|| AnalysisError::MissingBody(entry_key.clone()))?;

        // Entry frame: receiver and parameters become fresh Inputs.
        let mut map = DataMap::new();
        let mut inputs = Vec::new();
        let mut slot = 0usize;
        if !entry_def.is_static {
            if let Some(this) = &entry_body.this_local {
                let id = arena.alloc(SymbolicVar::Input {
                    path: path_id,
                    slot,
                    ty: path.entry.class.clone(),
                    name: this.clone(),
                });
                inputs.push(id);
                map.locals
                    .insert(this.clone(), ExprSet::singleton(Expr::var(id)));
                slot += 1;
            }
        }
        for (i, local) in entry_body.param_locals.iter().enumerate() {
            let ty = path
                .entry
                .params
                .get(i)
                .cloned()
                .unwrap_or_else(|| "java.lang.Object".to_string());
            let id = arena.alloc(SymbolicVar::Input {
                path: path_id,
                slot,
                ty,
                name: local.clone(),
            });
            inputs.push(id);
            map.locals
                .insert(local.clone(), ExprSet::singleton(Expr::var(id)));
            slot += 1;
        }

        // Hops strictly after the root → entry edge.
        let hops: Vec<&CallStep> = path
            .steps
            .iter()
            .skip_while(|s| s.callee != entry_key)
            .skip(1)
            .collect();

        let mut current = entry_key.clone();
        for hop in hops {
            budget.checkpoint()?;
            let body = self
                .app
                .body_of(&current)
                .ok_or_else(|| AnalysisError::MissingBody(current.clone()))?;
            let at_call =
                self.run_intraproc(&current, body, map, hop.unit.index, &mut arena, budget)?;
            map = self.handoff(&at_call, hop, &mut arena)?;
            current = hop.callee.clone();
        }

        budget.checkpoint()?;
        let body = self
            .app
            .body_of(&current)
            .ok_or_else(|| AnalysisError::MissingBody(current.clone()))?;
        let final_map =
            self.run_intraproc(&current, body, map, path.terminal.index, &mut arena, budget)?;

        // Path-constraint assembly.
        let minimized = minimize(&final_map.constraint, &arena);
        let status = if minimized == Predicate::False {
            ConstraintStatus::TriviallyFalse
        } else {
            match self.oracle.check(&minimized, &arena) {
                Satisfiability::Sat => ConstraintStatus::Satisfiable,
                Satisfiability::Unsat => ConstraintStatus::TriviallyFalse,
                Satisfiability::Unknown => ConstraintStatus::Undecided,
            }
        };

        // Terminal statement: sink arguments or stored value.
        let mut sink = None;
        let mut sink_args = Vec::new();
        let mut sink_receiver = None;
        let mut stored_value = None;
        match body.unit(path.terminal.index) {
            Some(Stmt::Invoke { call, .. }) => {
                sink = Some(call.sig.clone());
                sink_receiver = call
                    .receiver
                    .as_ref()
                    .map(|r| final_map.locals.get(r).cloned().unwrap_or_default());
                for (index, operand) in call.args.iter().enumerate() {
                    let static_ty = call
                        .sig
                        .params
                        .get(index)
                        .cloned()
                        .unwrap_or_else(|| "java.lang.Object".to_string());
                    sink_args.push(SinkArgument {
                        index,
                        static_ty,
                        exprs: self.operand_set(&final_map, operand, &mut arena),
                    });
                }
            }
            Some(Stmt::FieldStore { value, .. }) => {
                stored_value = Some(self.operand_set(&final_map, value, &mut arena));
            }
            _ => {}
        }

        // A heap dependency is recorded only when its symbolic value occurs
        // in the final constraint.
        let mut mentioned = Vec::new();
        minimized.collect_vars(&mut mentioned);
        mentioned.sort();
        mentioned.dedup();
        let heap_vars: Vec<VarId> = mentioned
            .into_iter()
            .filter(|id| arena.get(*id).is_heap())
            .collect();

        Ok(PathEvaluation {
            path_id,
            arena,
            constraint: minimized,
            status,
            sink,
            sink_args,
            sink_receiver,
            stored_value,
            heap_vars,
            inputs,
        })
    }

    /// Monotone forward fixpoint over one body; returns the fact
    /// immediately before `stop_index`.
    fn run_intraproc(
        &self,
        method_key: &str,
        body: &MethodBody,
        init: DataMap,
        stop_index: usize,
        arena: &mut VarArena,
        budget: &WorkBudget,
    ) -> AnalysisResult<DataMap> {
        let n = body.units.len();
        if stop_index >= n {
            return Err(AnalysisError::Internal(format!(
                "stop unit {stop_index} out of range ({n} units)"
            )));
        }

        let cap = self.config.max_expr_set;
        let mut in_maps: Vec<Option<DataMap>> = vec![None; n];
        in_maps[0] = Some(init);
        let mut worklist: VecDeque<usize> = VecDeque::new();
        worklist.push_back(0);
        let mut pops = 0usize;

        while let Some(node) = worklist.pop_front() {
            budget.checkpoint()?;
            pops += 1;
            if pops > self.config.max_fixpoint_iters {
                warn!(
                    limit = self.config.max_fixpoint_iters,
                    "fixpoint iteration budget exhausted; widening to current state"
                );
                break;
            }

            let current = in_maps[node]
                .clone()
                .ok_or_else(|| AnalysisError::Internal(format!("no in-state for unit {node}")))?;
            let outs = self.transfer(method_key, body, node, current, arena)?;
            for (succ, out) in outs {
                match &mut in_maps[succ] {
                    Some(existing) => {
                        if existing.merge_from(&out, cap) && !worklist.contains(&succ) {
                            worklist.push_back(succ);
                        }
                    }
                    None => {
                        in_maps[succ] = Some(out);
                        worklist.push_back(succ);
                    }
                }
            }
        }

        // An unreachable stop unit means the branch structure excludes it.
        Ok(in_maps[stop_index].clone().unwrap_or_else(|| {
            let mut dead = DataMap::new();
            dead.constraint = Predicate::False;
            dead
        }))
    }

    /// Transfer function for one unit; returns per-successor out-facts.
    fn transfer(
        &self,
        method_key: &str,
        body: &MethodBody,
        index: usize,
        mut map: DataMap,
        arena: &mut VarArena,
    ) -> AnalysisResult<Vec<(usize, DataMap)>> {
        let cap = self.config.max_expr_set;
        let stmt = &body.units[index];
        let succs = &body.succs[index];

        match stmt {
            Stmt::Assign { dest, value } => {
                let set = match value {
                    Rvalue::Use(op) => self.operand_set(&map, op, arena),
                    Rvalue::Binary { op, lhs, rhs } => {
                        let l = self.operand_set(&map, lhs, arena);
                        let r = self.operand_set(&map, rhs, arena);
                        Self::cartesian(&l, &r, cap, |a, b| Expr::arith(*op, a, b))
                    }
                    Rvalue::Concat { lhs, rhs } => {
                        let l = self.operand_set(&map, lhs, arena);
                        let r = self.operand_set(&map, rhs, arena);
                        Self::cartesian(&l, &r, cap, Expr::concat)
                    }
                    Rvalue::FieldLoad { base, field } => {
                        self.field_load(&mut map, base.as_ref(), field, arena)
                    }
                    Rvalue::New { .. } => ExprSet::new(),
                };
                map.locals.insert(dest.clone(), set);
            }

            Stmt::Invoke { dest, call } => {
                let site = UnitRef {
                    method: method_key.to_string(),
                    index,
                };
                let mcv = self.method_call_var(&map, call, site, arena);
                // Constructor invocation establishes the allocated local.
                if call.sig.is_constructor() {
                    if let Some(receiver) = &call.receiver {
                        map.locals
                            .insert(receiver.clone(), ExprSet::singleton(Expr::var(mcv)));
                    }
                }
                if let Some(dest) = dest {
                    map.locals
                        .insert(dest.clone(), ExprSet::singleton(Expr::var(mcv)));
                }
            }

            Stmt::FieldStore { base, field, value } => {
                let stored = self.operand_set(&map, value, arena);
                if let Some(loc) = self.heap_loc(&map, base.as_ref(), field) {
                    map.heap.insert(loc, stored);
                }
            }

            Stmt::If { op, lhs, rhs } => {
                let l = self.operand_set(&map, lhs, arena);
                let r = self.operand_set(&map, rhs, arena);
                let pred = Self::branch_predicate(*op, &l, &r, cap);
                let mut out = Vec::with_capacity(succs.len());
                for (succ, kind) in succs {
                    let mut branch_map = map.clone();
                    match kind {
                        FlowKind::TrueBranch => {
                            branch_map.constraint =
                                branch_map.constraint.and(pred.clone());
                        }
                        FlowKind::FalseBranch => {
                            branch_map.constraint = branch_map
                                .constraint
                                .and(Predicate::not(pred.clone()));
                        }
                        _ => {}
                    }
                    out.push((*succ, branch_map));
                }
                return Ok(out);
            }

            Stmt::Return { .. } | Stmt::Goto | Stmt::Nop => {}
        }

        Ok(succs.iter().map(|(succ, _)| (*succ, map.clone())).collect())
    }

    /// Predicate interpretation of a branch condition over expression sets:
    /// the disjunction of the atom per value combination.
    fn branch_predicate(op: ArithOp, lhs: &ExprSet, rhs: &ExprSet, cap: usize) -> Predicate {
        let mut pred: Option<Predicate> = None;
        let mut combos = 0usize;
        for l in lhs.iter() {
            for r in rhs.iter() {
                if combos >= cap {
                    break;
                }
                combos += 1;
                let atom = Predicate::Expr(Expr::arith(op, l.clone(), r.clone()));
                pred = Some(match pred {
                    None => atom,
                    Some(p) => p.or(atom),
                });
            }
        }
        // Unknown operands impose no constraint.
        pred.unwrap_or(Predicate::True)
    }

    fn cartesian(
        lhs: &ExprSet,
        rhs: &ExprSet,
        cap: usize,
        make: impl Fn(Expr, Expr) -> Expr,
    ) -> ExprSet {
        let mut out = ExprSet::new();
        for l in lhs.iter() {
            for r in rhs.iter() {
                out.insert(make(l.clone(), r.clone()), cap);
            }
        }
        out
    }

    fn operand_set(&self, map: &DataMap, operand: &Operand, arena: &mut VarArena) -> ExprSet {
        match operand {
            Operand::Const(c) => ExprSet::singleton(Expr::var(arena.constant(c.clone()))),
            Operand::Local(l) => map.locals.get(l).cloned().unwrap_or_default(),
        }
    }

    /// Method-call variable capturing the method reference, receiver set,
    /// argument sets, and literal string arguments.
    fn method_call_var(
        &self,
        map: &DataMap,
        call: &InvokeExpr,
        site: UnitRef,
        arena: &mut VarArena,
    ) -> VarId {
        let receiver = call
            .receiver
            .as_ref()
            .map(|r| map.locals.get(r).cloned().unwrap_or_default());
        let mut args = Vec::with_capacity(call.args.len());
        let mut string_args = Vec::new();
        for (slot, operand) in call.args.iter().enumerate() {
            if let Operand::Const(ConstValue::Str(s)) = operand {
                string_args.push((slot, s.clone()));
            }
            let set = match operand {
                Operand::Const(c) => ExprSet::singleton(Expr::var(arena.constant(c.clone()))),
                Operand::Local(l) => map.locals.get(l).cloned().unwrap_or_default(),
            };
            args.push(set);
        }
        arena.alloc(SymbolicVar::MethodCall {
            site,
            sig: call.sig.clone(),
            receiver,
            args,
            string_args,
        })
    }

    /// Instance/static field read through the heap map, seeding a Heap
    /// variable on first access.
    fn field_load(
        &self,
        map: &mut DataMap,
        base: Option<&LocalId>,
        field: &FieldRef,
        arena: &mut VarArena,
    ) -> ExprSet {
        match self.heap_loc(map, base, field) {
            Some(loc) => {
                if let Some(existing) = map.heap.get(&loc) {
                    return existing.clone();
                }
                let heap_var = arena.alloc(SymbolicVar::Heap {
                    base: loc.base.clone(),
                    field: field.clone(),
                });
                let set = ExprSet::singleton(Expr::var(heap_var));
                map.heap.insert(loc, set.clone());
                set
            }
            // No representative receiver variable: fall back to a plain
            // field access, conservatively tainted, no dependency bridge.
            None => {
                let v = arena.alloc(SymbolicVar::FieldAccess {
                    field: field.clone(),
                    is_static: base.is_none(),
                });
                ExprSet::singleton(Expr::var(v))
            }
        }
    }

    fn heap_loc(&self, map: &DataMap, base: Option<&LocalId>, field: &FieldRef) -> Option<HeapLoc> {
        match base {
            None => Some(HeapLoc {
                base: HeapBase::Static(field.class.clone()),
                field: field.clone(),
            }),
            Some(local) => {
                let set = map.locals.get(local)?;
                let representative = set.iter().find_map(|e| match e {
                    Expr::Var(v) => Some(*v),
                    _ => None,
                })?;
                Some(HeapLoc {
                    base: HeapBase::Var(representative),
                    field: field.clone(),
                })
            }
        }
    }

    /// Frame handoff into `hop.callee` at the call unit: receiver and
    /// parameter locals map from the actual arguments; the heap map and
    /// constraint carry forward.
    fn handoff(
        &self,
        at_call: &DataMap,
        hop: &CallStep,
        arena: &mut VarArena,
    ) -> AnalysisResult<DataMap> {
        let caller_body = self
            .app
            .body_of(&hop.caller)
            .ok_or_else(|| AnalysisError::MissingBody(hop.caller.clone()))?;
        let Some(Stmt::Invoke { call, .. }) = caller_body.unit(hop.unit.index) else {
            return Err(AnalysisError::Internal(format!(
                "call edge at non-invoke unit {}",
                hop.unit
            )));
        };
        let callee_def = self
            .app
            .method(&hop.callee)
            .ok_or_else(|| AnalysisError::MissingClass(hop.callee.clone()))?;
        let callee_body = callee_def
            .body
            .as_ref()
            .ok_or_else(|| AnalysisError::MissingBody(hop.callee.clone()))?;

        let receiver_set = call
            .receiver
            .as_ref()
            .map(|r| at_call.locals.get(r).cloned().unwrap_or_default());

        // Actuals, with the index shift for instance invokes patched onto
        // static callees: the receiver becomes argument zero.
        let mut actuals: Vec<ExprSet> = Vec::with_capacity(call.args.len() + 1);
        if callee_def.is_static {
            if let Some(recv) = &receiver_set {
                actuals.push(recv.clone());
            }
        }
        for operand in &call.args {
            actuals.push(self.operand_set(at_call, operand, arena));
        }

        let mut callee_map = DataMap::new();
        callee_map.heap = at_call.heap.clone();
        callee_map.constraint = at_call.constraint.clone();

        if !callee_def.is_static {
            if let (Some(this), Some(recv)) = (&callee_body.this_local, &receiver_set) {
                callee_map.locals.insert(this.clone(), recv.clone());
            }
        }
        for (i, local) in callee_body.param_locals.iter().enumerate() {
            if let Some(set) = actuals.get(i) {
                callee_map.locals.insert(local.clone(), set.clone());
            }
        }
        Ok(callee_map)
    }
}

/// Caller-side binding of a completed call's return value from the callee's
/// exit fact. Sink paths terminate inside the callee, so the main engine
/// never returns along an edge; plugins that build whole-method summaries
/// use this to pull the returned set back to the caller's destination.
pub fn bind_return(
    caller_map: &mut DataMap,
    dest: &LocalId,
    callee_exit: &DataMap,
    returned: &Operand,
    arena: &mut VarArena,
) {
    let set = match returned {
        Operand::Const(c) => ExprSet::singleton(Expr::var(arena.constant(c.clone()))),
        Operand::Local(l) => callee_exit.locals.get(l).cloned().unwrap_or_default(),
    };
    caller_map.locals.insert(dest.clone(), set);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::predicates::infrastructure::oracle::GroundTermOracle;
    use crate::shared::models::app::AppModel;
    use crate::shared::models::ir::{ArithOp, BodyBuilder, InvokeKind, MethodDef, UnitRef};
    use rustc_hash::FxHashSet;

    fn engine_fixture(
        entry: MethodDef,
        extra: Vec<MethodDef>,
    ) -> (AppModel, AnalysisConfig, GroundTermOracle) {
        let mut app = AppModel::default();
        app.add_method(entry);
        for m in extra {
            app.add_method(m);
        }
        (app, AnalysisConfig::default(), GroundTermOracle::default())
    }

    fn direct_path(entry: &MethodSig, terminal_index: usize) -> CallPath {
        CallPath {
            entry: entry.clone(),
            steps: vec![],
            terminal: UnitRef::new(entry, terminal_index),
            methods: FxHashSet::default(),
        }
    }

    #[test]
    fn test_branch_conditions_conjoin() {
        // void f(String s) { if (s == null) return; sink.write(s); }
        let entry = MethodSig::new("a.A", "void", "f", vec!["java.lang.String".into()]);
        let mut b = BodyBuilder::new().instance("this").params(&["s"]);
        let cond = b.push(Stmt::If {
            op: ArithOp::Eq,
            lhs: Operand::local("s"),
            rhs: Operand::null(),
        });
        let sink = b.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: MethodSig::new("java.io.FileOutputStream", "void", "write", vec![
                    "java.lang.String".into(),
                ]),
                receiver: Some("fos".into()),
                args: vec![Operand::local("s")],
            },
        });
        let ret = b.push(Stmt::Return { value: None });
        b.set_branch(cond, ret, sink);
        let def = MethodDef {
            sig: entry.clone(),
            is_static: false,
            body: Some(b.finish()),
        };

        let (app, config, oracle) = engine_fixture(def, vec![]);
        let engine = ConstraintEngine::new(&app, &config, &oracle);
        let eval = engine
            .evaluate(&direct_path(&entry, sink), 0, &WorkBudget::unbounded())
            .unwrap();

        // Reaching the sink requires the false branch: !(s == null).
        assert_eq!(eval.status, ConstraintStatus::Satisfiable);
        assert!(matches!(eval.constraint, Predicate::Expr(_)));
        assert_eq!(eval.sink_args.len(), 1);
        assert_eq!(eval.sink_args[0].exprs.len(), 1);
    }

    #[test]
    fn test_constant_false_branch_is_trivially_false() {
        // if (false) sink();
        let entry = MethodSig::new("a.A", "void", "f", vec![]);
        let mut b = BodyBuilder::new().instance("this");
        let cond = b.push(Stmt::If {
            op: ArithOp::Eq,
            lhs: Operand::Const(ConstValue::Bool(false)),
            rhs: Operand::Const(ConstValue::Bool(true)),
        });
        let sink = b.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: MethodSig::new("java.io.FileOutputStream", "void", "write", vec![]),
                receiver: Some("fos".into()),
                args: vec![],
            },
        });
        let ret = b.push(Stmt::Return { value: None });
        b.set_branch(cond, sink, ret);
        let def = MethodDef {
            sig: entry.clone(),
            is_static: false,
            body: Some(b.finish()),
        };

        let (app, config, oracle) = engine_fixture(def, vec![]);
        let engine = ConstraintEngine::new(&app, &config, &oracle);
        let eval = engine
            .evaluate(&direct_path(&entry, sink), 0, &WorkBudget::unbounded())
            .unwrap();
        assert_eq!(eval.status, ConstraintStatus::TriviallyFalse);
        assert_eq!(eval.constraint, Predicate::False);
    }

    #[test]
    fn test_concat_builds_expression() {
        // p = "/data/user/" + userInput; sink(p)
        let entry = MethodSig::new("a.A", "void", "f", vec!["java.lang.String".into()]);
        let mut b = BodyBuilder::new().instance("this").params(&["userInput"]);
        b.push(Stmt::Assign {
            dest: "p".into(),
            value: Rvalue::Concat {
                lhs: Operand::str("/data/user/"),
                rhs: Operand::local("userInput"),
            },
        });
        let sink = b.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: MethodSig::new("java.io.FileOutputStream", "void", "write", vec![
                    "java.lang.String".into(),
                ]),
                receiver: Some("fos".into()),
                args: vec![Operand::local("p")],
            },
        });
        b.push(Stmt::Return { value: None });
        let def = MethodDef {
            sig: entry.clone(),
            is_static: false,
            body: Some(b.finish()),
        };

        let (app, config, oracle) = engine_fixture(def, vec![]);
        let engine = ConstraintEngine::new(&app, &config, &oracle);
        let eval = engine
            .evaluate(&direct_path(&entry, sink), 0, &WorkBudget::unbounded())
            .unwrap();
        let arg = &eval.sink_args[0];
        assert!(matches!(arg.exprs.first(), Some(Expr::Concat { .. })));
    }

    #[test]
    fn test_heap_read_creates_dependency() {
        // x = this.path; if (x != null) sink(x);
        let entry = MethodSig::new("a.A", "void", "f", vec![]);
        let field = crate::shared::models::ir::FieldRef::new("a.A", "path", "java.lang.String");
        let mut b = BodyBuilder::new().instance("this");
        b.push(Stmt::Assign {
            dest: "x".into(),
            value: Rvalue::FieldLoad {
                base: Some("this".into()),
                field: field.clone(),
            },
        });
        let cond = b.push(Stmt::If {
            op: ArithOp::Ne,
            lhs: Operand::local("x"),
            rhs: Operand::null(),
        });
        let sink = b.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: MethodSig::new("java.io.FileOutputStream", "void", "write", vec![
                    "java.lang.String".into(),
                ]),
                receiver: Some("fos".into()),
                args: vec![Operand::local("x")],
            },
        });
        let ret = b.push(Stmt::Return { value: None });
        b.set_branch(cond, sink, ret);
        let def = MethodDef {
            sig: entry.clone(),
            is_static: false,
            body: Some(b.finish()),
        };

        let (app, config, oracle) = engine_fixture(def, vec![]);
        let engine = ConstraintEngine::new(&app, &config, &oracle);
        let eval = engine
            .evaluate(&direct_path(&entry, sink), 0, &WorkBudget::unbounded())
            .unwrap();

        assert_eq!(eval.heap_vars.len(), 1);
        assert!(eval.arena.get(eval.heap_vars[0]).is_heap());
    }

    #[test]
    fn test_interprocedural_argument_binding() {
        // entry(s) { helper(s); }  helper(p) { sink(p); }
        let entry = MethodSig::new("a.A", "void", "entry", vec!["java.lang.String".into()]);
        let helper = MethodSig::new("a.A", "void", "helper", vec!["java.lang.String".into()]);

        let mut eb = BodyBuilder::new().instance("this").params(&["s"]);
        let call_idx = eb.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: helper.clone(),
                receiver: Some("this".into()),
                args: vec![Operand::local("s")],
            },
        });
        eb.push(Stmt::Return { value: None });
        let entry_def = MethodDef {
            sig: entry.clone(),
            is_static: false,
            body: Some(eb.finish()),
        };

        let mut hb = BodyBuilder::new().instance("this").params(&["p"]);
        let sink = hb.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: MethodSig::new("java.io.FileOutputStream", "void", "write", vec![
                    "java.lang.String".into(),
                ]),
                receiver: Some("fos".into()),
                args: vec![Operand::local("p")],
            },
        });
        hb.push(Stmt::Return { value: None });
        let helper_def = MethodDef {
            sig: helper.clone(),
            is_static: false,
            body: Some(hb.finish()),
        };

        let (app, config, oracle) = engine_fixture(entry_def, vec![helper_def]);
        let engine = ConstraintEngine::new(&app, &config, &oracle);

        let path = CallPath {
            entry: entry.clone(),
            steps: vec![
                CallStep {
                    caller: "<synthetic.ApplicationRoot: void root()>".into(),
                    unit: UnitRef {
                        method: "<synthetic.ApplicationRoot: void root()>".into(),
                        index: 0,
                    },
                    callee: entry.canonical(),
                },
                CallStep {
                    caller: entry.canonical(),
                    unit: UnitRef::new(&entry, call_idx),
                    callee: helper.canonical(),
                },
            ],
            terminal: UnitRef::new(&helper, sink),
            methods: FxHashSet::default(),
        };
        let eval = engine.evaluate(&path, 0, &WorkBudget::unbounded()).unwrap();

        // The sink argument is the entry's Input variable, carried through
        // the handoff.
        let arg = &eval.sink_args[0];
        let Some(Expr::Var(v)) = arg.exprs.first() else {
            panic!("expected variable expression");
        };
        assert!(eval.arena.get(*v).is_input());
    }

    #[test]
    fn test_loop_terminates_with_widening() {
        // i = 0; while (i < 10) { i = i + 1; } sink();
        let entry = MethodSig::new("a.A", "void", "f", vec![]);
        let mut b = BodyBuilder::new().instance("this");
        b.push(Stmt::Assign {
            dest: "i".into(),
            value: Rvalue::Use(Operand::int(0)),
        });
        let cond = b.push(Stmt::If {
            op: ArithOp::Lt,
            lhs: Operand::local("i"),
            rhs: Operand::int(10),
        });
        let incr = b.push(Stmt::Assign {
            dest: "i".into(),
            value: Rvalue::Binary {
                op: ArithOp::Add,
                lhs: Operand::local("i"),
                rhs: Operand::int(1),
            },
        });
        let back = b.push(Stmt::Goto);
        let sink = b.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: MethodSig::new("java.io.FileOutputStream", "void", "write", vec![]),
                receiver: Some("fos".into()),
                args: vec![],
            },
        });
        b.push(Stmt::Return { value: None });
        b.set_branch(cond, incr, sink);
        b.set_jump(back, cond);
        let def = MethodDef {
            sig: entry.clone(),
            is_static: false,
            body: Some(b.finish()),
        };

        let (app, config, oracle) = engine_fixture(def, vec![]);
        let engine = ConstraintEngine::new(&app, &config, &oracle);
        let eval = engine
            .evaluate(&direct_path(&entry, sink), 0, &WorkBudget::unbounded())
            .unwrap();
        // The run completes and the expression set for `i` stays bounded.
        assert_ne!(eval.status, ConstraintStatus::TriviallyFalse);
    }

    #[test]
    fn test_cancellation_observed() {
        let entry = MethodSig::new("a.A", "void", "f", vec![]);
        let mut b = BodyBuilder::new().instance("this");
        let sink = b.push(Stmt::Invoke {
            dest: None,
            call: InvokeExpr {
                kind: InvokeKind::Virtual,
                sig: MethodSig::new("java.io.FileOutputStream", "void", "write", vec![]),
                receiver: Some("fos".into()),
                args: vec![],
            },
        });
        b.push(Stmt::Return { value: None });
        let def = MethodDef {
            sig: entry.clone(),
            is_static: false,
            body: Some(b.finish()),
        };

        let (app, config, oracle) = engine_fixture(def, vec![]);
        let engine = ConstraintEngine::new(&app, &config, &oracle);
        let cancel = Arc::new(AtomicBool::new(true));
        let budget = WorkBudget::new(None, cancel);
        let err = engine
            .evaluate(&direct_path(&entry, sink), 0, &budget)
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
    }
}
