//! ICC domain models
//!
//! The caller taxonomy is a flat sum with `matches` defined by pattern
//! match; no dispatch hierarchy.

use serde::{Deserialize, Serialize};

use crate::features::entrypoints::domain::LifecycleShape;
use crate::shared::models::ir::{ClassName, MethodSig, UnitRef};
use crate::shared::models::manifest::ComponentKind;

/// Recognized ICC site kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IccKind {
    StartActivity,
    StartActivityForResult,
    StartService,
    BindService,
    SendBroadcast,
    SendOrderedBroadcast,
    RegisterReceiver,
    ProviderQuery,
    ProviderInsert,
    ProviderUpdate,
    ProviderDelete,
    MessengerSend,
}

/// Flattened caller family. `matches` replaces the deep caller/callee
/// inheritance of comparable analyzers with one pattern match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallerKind {
    IntentCaller,
    ActivityResultCaller,
    BoundServiceCaller,
    MessengerCaller,
    ResolverCaller,
}

impl CallerKind {
    /// Can this caller family reach a component of `target` kind?
    pub fn matches(&self, target: ComponentKind) -> bool {
        matches!(
            (self, target),
            (CallerKind::IntentCaller, ComponentKind::Activity)
                | (CallerKind::IntentCaller, ComponentKind::Service)
                | (CallerKind::IntentCaller, ComponentKind::Receiver)
                | (CallerKind::ActivityResultCaller, ComponentKind::Activity)
                | (CallerKind::BoundServiceCaller, ComponentKind::Service)
                | (CallerKind::MessengerCaller, ComponentKind::Service)
                | (CallerKind::ResolverCaller, ComponentKind::Provider)
        )
    }
}

impl IccKind {
    /// Classify an invocation as an ICC site. Site names are matched per
    /// the recognized set; resolver and messenger ops additionally check
    /// the declaring class.
    pub fn from_invoke(sig: &MethodSig) -> Option<IccKind> {
        match sig.name.as_str() {
            "startActivity" => Some(IccKind::StartActivity),
            "startActivityForResult" => Some(IccKind::StartActivityForResult),
            "startService" => Some(IccKind::StartService),
            "bindService" => Some(IccKind::BindService),
            "sendBroadcast" => Some(IccKind::SendBroadcast),
            "sendOrderedBroadcast" => Some(IccKind::SendOrderedBroadcast),
            "registerReceiver" => Some(IccKind::RegisterReceiver),
            "query" if sig.class == "android.content.ContentResolver" => {
                Some(IccKind::ProviderQuery)
            }
            "insert" if sig.class == "android.content.ContentResolver" => {
                Some(IccKind::ProviderInsert)
            }
            "update" if sig.class == "android.content.ContentResolver" => {
                Some(IccKind::ProviderUpdate)
            }
            "delete" if sig.class == "android.content.ContentResolver" => {
                Some(IccKind::ProviderDelete)
            }
            "send" if sig.class == "android.os.Messenger" => Some(IccKind::MessengerSend),
            _ => None,
        }
    }

    pub fn caller(&self) -> CallerKind {
        match self {
            IccKind::StartActivity
            | IccKind::StartService
            | IccKind::SendBroadcast
            | IccKind::SendOrderedBroadcast
            | IccKind::RegisterReceiver => CallerKind::IntentCaller,
            IccKind::StartActivityForResult => CallerKind::ActivityResultCaller,
            IccKind::BindService => CallerKind::BoundServiceCaller,
            IccKind::MessengerSend => CallerKind::MessengerCaller,
            IccKind::ProviderQuery
            | IccKind::ProviderInsert
            | IccKind::ProviderUpdate
            | IccKind::ProviderDelete => CallerKind::ResolverCaller,
        }
    }

    /// Component kind this site targets.
    pub fn expected_component(&self) -> ComponentKind {
        match self {
            IccKind::StartActivity | IccKind::StartActivityForResult => ComponentKind::Activity,
            IccKind::StartService | IccKind::BindService | IccKind::MessengerSend => {
                ComponentKind::Service
            }
            IccKind::SendBroadcast | IccKind::SendOrderedBroadcast | IccKind::RegisterReceiver => {
                ComponentKind::Receiver
            }
            IccKind::ProviderQuery
            | IccKind::ProviderInsert
            | IccKind::ProviderUpdate
            | IccKind::ProviderDelete => ComponentKind::Provider,
        }
    }

    /// Entry method of the target component for this site kind.
    pub fn entry_shape(&self) -> LifecycleShape {
        match self {
            IccKind::StartActivity | IccKind::StartActivityForResult => {
                LifecycleShape::new("void", "onCreate", &["android.os.Bundle"])
            }
            IccKind::StartService => LifecycleShape::new(
                "int",
                "onStartCommand",
                &["android.content.Intent", "int", "int"],
            ),
            IccKind::BindService => {
                LifecycleShape::new("android.os.IBinder", "onBind", &["android.content.Intent"])
            }
            IccKind::SendBroadcast | IccKind::SendOrderedBroadcast | IccKind::RegisterReceiver => {
                LifecycleShape::new(
                    "void",
                    "onReceive",
                    &["android.content.Context", "android.content.Intent"],
                )
            }
            IccKind::ProviderQuery => LifecycleShape::new(
                "android.database.Cursor",
                "query",
                &[
                    "android.net.Uri",
                    "java.lang.String[]",
                    "java.lang.String",
                    "java.lang.String[]",
                    "java.lang.String",
                ],
            ),
            IccKind::ProviderInsert => LifecycleShape::new(
                "android.net.Uri",
                "insert",
                &["android.net.Uri", "android.content.ContentValues"],
            ),
            IccKind::ProviderUpdate => LifecycleShape::new(
                "int",
                "update",
                &[
                    "android.net.Uri",
                    "android.content.ContentValues",
                    "java.lang.String",
                    "java.lang.String[]",
                ],
            ),
            IccKind::ProviderDelete => LifecycleShape::new(
                "int",
                "delete",
                &["android.net.Uri", "java.lang.String", "java.lang.String[]"],
            ),
            IccKind::MessengerSend => {
                LifecycleShape::new("void", "handleMessage", &["android.os.Message"])
            }
        }
    }

    /// Argument slot carrying the routing object (intent, URI, or receiver
    /// instance).
    pub fn routing_arg(&self) -> usize {
        0
    }
}

/// One recognized ICC call site.
#[derive(Debug, Clone, PartialEq)]
pub struct IccSite {
    pub unit: UnitRef,
    pub kind: IccKind,
    pub caller: MethodSig,
}

/// Resolution outcome for one site.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIcc {
    pub site: IccSite,
    pub targets: Vec<ClassName>,
    /// False when the target could not be narrowed and fan-out (if any)
    /// was used instead.
    pub precise: bool,
}
