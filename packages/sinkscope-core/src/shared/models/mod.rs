//! Shared model types
//!
//! These are used by multiple features, so they live here to avoid
//! circular dependencies between the vertical slices.

pub mod app;
pub mod ir;
pub mod manifest;

pub use app::{AppModel, ClassDef};
pub use ir::{
    ArithOp, BodyBuilder, ConstValue, FieldRef, FlowKind, InvokeExpr, InvokeKind, LocalId,
    MethodBody, MethodDef, MethodSig, Operand, Rvalue, Stmt, UnitRef,
};
pub use manifest::{AppManifest, ComponentDecl, ComponentKind, IntentFilter};
