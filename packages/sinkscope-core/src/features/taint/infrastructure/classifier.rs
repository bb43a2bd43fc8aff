//! Variable taint classifier
//!
//! Classification walks the symbolic variable structure once per variable
//! and memoizes the result, so repeated queries over the same arena are
//! pure lookups.

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::features::predicates::domain::{Expr, ExprSet, SymbolicVar, VarArena, VarId};

use super::super::domain::{Classification, InputSource, SourceKind};
#[cfg(test)]
use super::super::domain::TaintClass;

/// External-input accessors: (declaring class, method name, source kind).
/// First string argument at the call site is recorded as the key.
const EXTERNAL_ACCESSORS: &[(&str, &str, SourceKind)] = &[
    ("android.content.Intent", "getStringExtra", SourceKind::IntentExtra),
    ("android.content.Intent", "getCharSequenceExtra", SourceKind::IntentExtra),
    ("android.content.Intent", "getStringArrayExtra", SourceKind::IntentExtra),
    ("android.content.Intent", "getExtras", SourceKind::IntentExtra),
    ("android.content.Intent", "getData", SourceKind::IntentExtra),
    ("android.content.Intent", "getDataString", SourceKind::IntentExtra),
    ("android.net.Uri", "getQueryParameter", SourceKind::UriQuery),
    ("android.net.Uri", "getLastPathSegment", SourceKind::UriQuery),
    ("android.net.Uri", "getPath", SourceKind::UriQuery),
    ("android.net.Uri", "getEncodedQuery", SourceKind::UriQuery),
    ("android.os.Bundle", "getString", SourceKind::BundleValue),
    ("android.os.Bundle", "getCharSequence", SourceKind::BundleValue),
    ("android.content.ContentValues", "getAsString", SourceKind::ContentValues),
    ("android.content.SharedPreferences", "getString", SourceKind::Preference),
];

/// String manipulations that preserve the receiver's classification.
const STRING_MANIP: &[&str] = &["toString", "substring", "trim", "toLowerCase", "toUpperCase"];

fn simple_class_name(class: &str) -> &str {
    class.rsplit('.').next().unwrap_or(class)
}

/// Memoizing taint classifier over one path's arena.
pub struct TaintClassifier {
    memo: LruCache<VarId, Classification>,
}

impl TaintClassifier {
    pub fn new(memo_cap: usize) -> Self {
        let cap = NonZeroUsize::new(memo_cap.max(1)).expect("max(1) is non-zero");
        Self {
            memo: LruCache::new(cap),
        }
    }

    /// Classify one variable.
    pub fn classify(&mut self, arena: &VarArena, id: VarId) -> Classification {
        if let Some(hit) = self.memo.get(&id) {
            return hit.clone();
        }
        let result = self.compute(arena, id);
        self.memo.put(id, result.clone());
        result
    }

    fn compute(&mut self, arena: &VarArena, id: VarId) -> Classification {
        match arena.get(id) {
            SymbolicVar::Constant { .. } => Classification::clean(),
            SymbolicVar::Input { name, .. } => {
                Classification::full(vec![InputSource::parameter(name.clone())])
            }
            SymbolicVar::FieldAccess { field, .. } => Classification::full(vec![
                InputSource::field(format!("{}.{}", field.class, field.name)),
            ]),
            SymbolicVar::Heap { field, .. } => Classification::full(vec![InputSource::field(
                format!("{}.{}", field.class, field.name),
            )]),
            SymbolicVar::MethodCall {
                sig,
                receiver,
                string_args,
                ..
            } => {
                // External-input accessor: fully tainted with provenance.
                for (class, method, kind) in EXTERNAL_ACCESSORS {
                    if sig.class == *class && sig.name == *method {
                        let key = string_args
                            .iter()
                            .find(|(slot, _)| *slot == 0)
                            .map(|(_, k)| k.clone());
                        let accessor =
                            format!("{}.{}", simple_class_name(&sig.class), sig.name);
                        return Classification::full(vec![InputSource::accessor(
                            *kind, accessor, key,
                        )]);
                    }
                }

                // String manipulation inherits the receiver's class.
                if STRING_MANIP.contains(&sig.name.as_str()) {
                    return match receiver {
                        Some(set) if !set.is_empty() => self.classify_set(arena, set),
                        _ => Classification::full(Vec::new()),
                    };
                }

                // Unrecognized call: conservative.
                Classification::full(Vec::new())
            }
        }
    }

    /// Classify an expression tree: leaves classified, composites combined.
    pub fn classify_expr(&mut self, arena: &VarArena, expr: &Expr) -> Classification {
        match expr {
            Expr::Var(v) => self.classify(arena, *v),
            Expr::Arith { lhs, rhs, .. } | Expr::Concat { lhs, rhs } => {
                let l = self.classify_expr(arena, lhs);
                let r = self.classify_expr(arena, rhs);
                Classification::combine(&l, &r)
            }
        }
    }

    /// Classify an Expression Set by combining over its members. The empty
    /// set carries no evidence and is treated conservatively.
    pub fn classify_set(&mut self, arena: &VarArena, set: &ExprSet) -> Classification {
        let mut acc: Option<Classification> = None;
        for expr in set.iter() {
            let c = self.classify_expr(arena, expr);
            acc = Some(match acc {
                None => c,
                Some(prev) => Classification::combine(&prev, &c),
            });
        }
        acc.unwrap_or_else(|| Classification::full(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::ir::{ConstValue, MethodSig, UnitRef};

    fn call_var(
        arena: &mut VarArena,
        class: &str,
        method: &str,
        receiver: Option<ExprSet>,
        string_args: Vec<(usize, String)>,
    ) -> VarId {
        let sig = MethodSig::new(class, "java.lang.String", method, vec![]);
        let site = UnitRef {
            method: "<t.T: void m()>".into(),
            index: 0,
        };
        arena.alloc(SymbolicVar::MethodCall {
            site,
            sig,
            receiver,
            args: vec![],
            string_args,
        })
    }

    #[test]
    fn test_constant_is_clean() {
        let mut arena = VarArena::new();
        let v = arena.constant(ConstValue::Str("/data".into()));
        let mut c = TaintClassifier::new(16);
        assert_eq!(c.classify(&arena, v).class, TaintClass::Clean);
    }

    #[test]
    fn test_input_is_full_with_parameter_source() {
        let mut arena = VarArena::new();
        let v = arena.alloc(SymbolicVar::Input {
            path: 0,
            slot: 1,
            ty: "java.lang.String".into(),
            name: "userInput".into(),
        });
        let mut c = TaintClassifier::new(16);
        let result = c.classify(&arena, v);
        assert_eq!(result.class, TaintClass::Full);
        assert_eq!(result.sources, vec![InputSource::parameter("userInput")]);
    }

    #[test]
    fn test_intent_extra_accessor() {
        let mut arena = VarArena::new();
        let v = call_var(
            &mut arena,
            "android.content.Intent",
            "getStringExtra",
            None,
            vec![(0, "filename".into())],
        );
        let mut c = TaintClassifier::new(16);
        let result = c.classify(&arena, v);
        assert_eq!(result.class, TaintClass::Full);
        assert_eq!(result.sources[0].kind, SourceKind::IntentExtra);
        assert_eq!(result.sources[0].key.as_deref(), Some("filename"));
    }

    #[test]
    fn test_string_manip_inherits_receiver() {
        let mut arena = VarArena::new();
        let clean = arena.constant(ConstValue::Str("/data".into()));
        let recv = ExprSet::singleton(Expr::var(clean));
        let v = call_var(&mut arena, "java.lang.String", "trim", Some(recv), vec![]);
        let mut c = TaintClassifier::new(16);
        assert_eq!(c.classify(&arena, v).class, TaintClass::Clean);
    }

    #[test]
    fn test_unrecognized_call_is_full() {
        let mut arena = VarArena::new();
        let v = call_var(&mut arena, "com.example.Util", "mangle", None, vec![]);
        let mut c = TaintClassifier::new(16);
        assert_eq!(c.classify(&arena, v).class, TaintClass::Full);
    }

    #[test]
    fn test_memoization_purity() {
        let mut arena = VarArena::new();
        let v = arena.alloc(SymbolicVar::Input {
            path: 0,
            slot: 0,
            ty: "java.lang.String".into(),
            name: "p".into(),
        });
        let mut c = TaintClassifier::new(16);
        let first = c.classify(&arena, v);
        let second = c.classify(&arena, v);
        assert_eq!(first, second);
    }

    #[test]
    fn test_mixed_concat_is_partial() {
        let mut arena = VarArena::new();
        let clean = arena.constant(ConstValue::Str("/data/user/".into()));
        let tainted = arena.alloc(SymbolicVar::Input {
            path: 0,
            slot: 0,
            ty: "java.lang.String".into(),
            name: "userInput".into(),
        });
        let expr = Expr::concat(Expr::var(clean), Expr::var(tainted));
        let mut c = TaintClassifier::new(16);
        let result = c.classify_expr(&arena, &expr);
        assert_eq!(result.class, TaintClass::Partial);
        assert_eq!(result.sources, vec![InputSource::parameter("userInput")]);
    }
}
