//! ICC site scanning, target resolution, and edge splicing
//!
//! Target resolution order:
//! 1. Explicit: most recent assignment to the routing local that is an
//!    intent constructor with a class literal, or a `setComponent` /
//!    `setClass` call with a literal.
//! 2. Implicit: intent action literal intersected with the manifest's
//!    action map.
//! 3. Content URI: authority of a parsed URI literal mapped to a provider.
//!
//! Sites that cannot be narrowed stay flagged imprecise; with fan-out
//! enabled they connect to every exported component of the expected kind.
//! Every spliced edge is re-queried through the graph's outgoing-edge
//! query before it counts.

use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::features::callgraph::domain::{CallEdgeKind, CallGraph};
use crate::shared::models::app::AppModel;
use crate::shared::models::ir::{
    ConstValue, InvokeExpr, MethodBody, MethodSig, Operand, Rvalue, Stmt, UnitRef,
};

use super::super::domain::{IccKind, IccSite, ResolvedIcc};

/// Resolution statistics.
#[derive(Debug, Default, Clone)]
pub struct IccStats {
    pub sites: usize,
    pub resolved_sites: usize,
    pub imprecise_sites: usize,
    pub spliced_edges: usize,
}

pub struct IccResolver<'a> {
    app: &'a AppModel,
    config: &'a AnalysisConfig,
}

impl<'a> IccResolver<'a> {
    pub fn new(app: &'a AppModel, config: &'a AnalysisConfig) -> Self {
        Self { app, config }
    }

    /// Scan every method on the call graph for recognized ICC invocations.
    pub fn scan(&self, graph: &CallGraph) -> Vec<IccSite> {
        let mut sites = Vec::new();
        for node in graph.nodes() {
            let Ok(caller) = MethodSig::parse(node) else {
                continue;
            };
            let Some(body) = self.app.body_of(node) else {
                continue;
            };
            for (index, stmt) in body.units.iter().enumerate() {
                if let Stmt::Invoke { call, .. } = stmt {
                    if let Some(kind) = IccKind::from_invoke(&call.sig) {
                        sites.push(IccSite {
                            unit: UnitRef::new(&caller, index),
                            kind,
                            caller: caller.clone(),
                        });
                    }
                }
            }
        }
        sites
    }

    /// Resolve one site to candidate target components.
    pub fn resolve(&self, site: &IccSite) -> ResolvedIcc {
        let body = self.app.body_of(&site.unit.method);
        let targets = body.and_then(|b| self.resolve_in_body(site, b));

        match targets {
            Some(targets) if !targets.is_empty() => ResolvedIcc {
                site: site.clone(),
                targets,
                precise: true,
            },
            _ => {
                // Could not narrow the target; optionally fan out.
                let expected = site.kind.expected_component();
                let targets = if self.config.fanout_imprecise {
                    self.app
                        .manifest
                        .exported_of_kind(expected)
                        .into_iter()
                        .filter(|c| site.kind.caller().matches(c.kind))
                        .map(|c| c.class_name.clone())
                        .collect()
                } else {
                    Vec::new()
                };
                ResolvedIcc {
                    site: site.clone(),
                    targets,
                    precise: false,
                }
            }
        }
    }

    fn resolve_in_body(&self, site: &IccSite, body: &MethodBody) -> Option<Vec<String>> {
        let routing_local = self.routing_local(site, body)?;

        if site.kind == IccKind::RegisterReceiver {
            return self
                .find_allocation(body, site.unit.index, &routing_local)
                .map(|class| vec![class]);
        }

        if matches!(
            site.kind,
            IccKind::ProviderQuery
                | IccKind::ProviderInsert
                | IccKind::ProviderUpdate
                | IccKind::ProviderDelete
        ) {
            return self.resolve_uri(body, site.unit.index, &routing_local);
        }

        // Explicit component target beats the action route.
        if let Some(class) = self.explicit_target(body, site.unit.index, &routing_local) {
            return Some(vec![class]);
        }

        self.implicit_targets(site, body, &routing_local)
    }

    /// The local holding the intent / URI / receiver instance.
    fn routing_local(&self, site: &IccSite, body: &MethodBody) -> Option<String> {
        let Stmt::Invoke { call, .. } = body.unit(site.unit.index)? else {
            return None;
        };
        match call.args.get(site.kind.routing_arg())? {
            Operand::Local(l) => Some(l.clone()),
            Operand::Const(_) => None,
        }
    }

    /// Walk backward from `site_index` for the most recent binding of
    /// `local` that names a component class.
    fn explicit_target(&self, body: &MethodBody, site_index: usize, local: &str) -> Option<String> {
        let mut wanted = local.to_string();
        for index in (0..site_index).rev() {
            match &body.units[index] {
                Stmt::Invoke { call, .. } if call.receiver.as_deref() == Some(wanted.as_str()) => {
                    if call.sig.is_constructor() || matches!(call.sig.name.as_str(), "setComponent" | "setClass")
                    {
                        if let Some(class) = Self::class_literal(call) {
                            return Some(class);
                        }
                        if call.sig.is_constructor() {
                            // Constructor seen without a class literal:
                            // the intent is implicit from here on.
                            return None;
                        }
                    }
                }
                Stmt::Assign {
                    dest,
                    value: Rvalue::Use(Operand::Local(src)),
                } if *dest == wanted => {
                    // Copy chase.
                    wanted = src.clone();
                }
                _ => {}
            }
        }
        None
    }

    fn class_literal(call: &InvokeExpr) -> Option<String> {
        call.args.iter().find_map(|arg| match arg {
            Operand::Const(ConstValue::Class(c)) => Some(c.clone()),
            _ => None,
        })
    }

    /// Intent action literal intersected with the manifest action map.
    fn implicit_targets(
        &self,
        site: &IccSite,
        body: &MethodBody,
        local: &str,
    ) -> Option<Vec<String>> {
        let action = self.action_literal(body, site.unit.index, local)?;
        let map = self.app.manifest.action_map();
        let candidates = map.get(action.as_str())?;
        let targets: Vec<String> = candidates
            .iter()
            .filter(|c| site.kind.caller().matches(c.kind))
            .filter(|c| c.kind == site.kind.expected_component())
            .map(|c| c.class_name.clone())
            .collect();
        (!targets.is_empty()).then_some(targets)
    }

    fn action_literal(&self, body: &MethodBody, site_index: usize, local: &str) -> Option<String> {
        let mut wanted = local.to_string();
        for index in (0..site_index).rev() {
            match &body.units[index] {
                Stmt::Invoke { call, .. } if call.receiver.as_deref() == Some(wanted.as_str()) => {
                    if call.sig.is_constructor() || call.sig.name == "setAction" {
                        if let Some(action) = call.args.iter().find_map(|a| match a {
                            Operand::Const(ConstValue::Str(s)) => Some(s.clone()),
                            _ => None,
                        }) {
                            return Some(action);
                        }
                    }
                }
                Stmt::Assign {
                    dest,
                    value: Rvalue::Use(Operand::Local(src)),
                } if *dest == wanted => {
                    wanted = src.clone();
                }
                _ => {}
            }
        }
        None
    }

    /// `Uri.parse("content://authority/...")` mapped through the manifest.
    fn resolve_uri(&self, body: &MethodBody, site_index: usize, local: &str) -> Option<Vec<String>> {
        let mut wanted = local.to_string();
        for index in (0..site_index).rev() {
            match &body.units[index] {
                Stmt::Invoke { dest: Some(d), call } if *d == wanted => {
                    if call.sig.name == "parse" {
                        if let Some(Operand::Const(ConstValue::Str(uri))) = call.args.first() {
                            let authority = Self::authority_of(uri)?;
                            let map = self.app.manifest.authority_map();
                            return map.get(authority).map(|c| vec![c.class_name.clone()]);
                        }
                    }
                    return None;
                }
                Stmt::Assign {
                    dest,
                    value: Rvalue::Use(Operand::Local(src)),
                } if *dest == wanted => {
                    wanted = src.clone();
                }
                _ => {}
            }
        }
        None
    }

    fn authority_of(uri: &str) -> Option<&str> {
        let rest = uri.strip_prefix("content://")?;
        Some(rest.split('/').next().unwrap_or(rest))
    }

    /// Allocation chase for `registerReceiver` instances.
    fn find_allocation(&self, body: &MethodBody, site_index: usize, local: &str) -> Option<String> {
        let mut wanted = local.to_string();
        for index in (0..site_index).rev() {
            match &body.units[index] {
                Stmt::Assign {
                    dest,
                    value: Rvalue::New { class },
                } if *dest == wanted => return Some(class.clone()),
                Stmt::Assign {
                    dest,
                    value: Rvalue::Use(Operand::Local(src)),
                } if *dest == wanted => {
                    wanted = src.clone();
                }
                _ => {}
            }
        }
        None
    }

    /// Splice resolved targets into the call graph. Each edge is re-queried
    /// after insertion; a miss is an internal inconsistency and is reported.
    pub fn splice(&self, graph: &mut CallGraph, resolutions: &[ResolvedIcc]) -> IccStats {
        let mut stats = IccStats {
            sites: resolutions.len(),
            ..Default::default()
        };

        for resolution in resolutions {
            if resolution.precise {
                stats.resolved_sites += 1;
            } else {
                stats.imprecise_sites += 1;
            }

            let shape = resolution.site.kind.entry_shape();
            for target_class in &resolution.targets {
                let Some(entry) = self
                    .app
                    .resolve_virtual(target_class, &shape.subsignature())
                    .filter(|m| m.body.is_some())
                else {
                    warn!(
                        class = target_class.as_str(),
                        entry = shape.name,
                        "ICC target lacks an analyzable entry method"
                    );
                    continue;
                };

                let src = &resolution.site.unit.method;
                let dst = entry.sig.canonical();
                graph.add_edge(
                    src,
                    resolution.site.unit.clone(),
                    &dst,
                    CallEdgeKind::Icc(resolution.site.kind),
                );

                if graph.has_edge(src, &resolution.site.unit, &dst) {
                    stats.spliced_edges += 1;
                    debug!(src = src.as_str(), dst = dst.as_str(), "spliced ICC edge");
                } else {
                    warn!(
                        src = src.as_str(),
                        dst = dst.as_str(),
                        "spliced ICC edge not retrievable"
                    );
                }
            }
        }
        stats
    }
}
