//! On-disk report emission
//!
//! Layout per analyzed package:
//!
//! ```text
//! <out>/<package>/appInfo.json
//! <out>/<package>/<category>/constraints/<event-id>/execution.py
//! <out>/<package>/<category>/constraints/<event-id>/path.{txt|py}
//! <out>/<package>/<category>/constraints/<event-id>/metadata.json
//! ```
//!
//! Categories: `hijacking`, `traversal/partial`, `traversal/full`,
//! `execution_only`. `path.txt` is emitted for hard-coded classifications,
//! `path.py` for controlled ones, neither for execution-only events.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::errors::AnalysisResult;
use crate::features::predicates::domain::SymbolicVar;
use crate::features::reporting::domain::{Event, EventChain, PathOutcome};
use crate::features::strings::domain::PathType;
use crate::pipeline::driver::AppReport;
use crate::shared::models::app::AppModel;

use super::python::{render_path_script, render_path_text, PythonRenderer};

/// Write-shared staging area for finished chains. Workers push as they
/// complete; the emitter drains once. The lock serializes all mutation.
#[derive(Debug, Default)]
pub struct StagingBuffer {
    chains: Mutex<Vec<EventChain>>,
}

impl StagingBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, chain: EventChain) {
        self.chains.lock().push(chain);
    }

    pub fn drain(&self) -> Vec<EventChain> {
        std::mem::take(&mut *self.chains.lock())
    }

    pub fn len(&self) -> usize {
        self.chains.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.lock().is_empty()
    }
}

// ============================================================================
// appInfo.json DTOs (key spelling fixed by the downstream consumers)
// ============================================================================

#[derive(Debug, Serialize)]
struct AppInfoDto {
    package: String,
    #[serde(rename = "eventChains")]
    event_chains: Vec<ChainDto>,
}

#[derive(Debug, Serialize)]
struct ChainDto {
    id: u32,
    #[serde(rename = "satisfiable")]
    satisfiable: String,
    events: Vec<EventDto>,
}

#[derive(Debug, Serialize)]
struct EventDto {
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Component")]
    component: String,
    #[serde(rename = "Path")]
    path: Vec<String>,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "ExecutionConstraintFile", skip_serializing_if = "Option::is_none")]
    execution_file: Option<String>,
    #[serde(rename = "PathConstraintFile", skip_serializing_if = "Option::is_none")]
    path_file: Option<String>,
    #[serde(rename = "MetadataFile", skip_serializing_if = "Option::is_none")]
    metadata_file: Option<String>,
    #[serde(rename = "VulnerabilityType")]
    vulnerability: String,
    #[serde(rename = "PathType")]
    path_type: String,
    #[serde(rename = "Variables")]
    variables: BTreeMap<String, VariableDto>,
}

#[derive(Debug, Serialize)]
struct VariableDto {
    kind: String,
    #[serde(rename = "type")]
    ty: String,
    provenance: String,
}

#[derive(Debug, Serialize)]
struct MetadataDto {
    vulnerability_type: String,
    path_type: String,
    target_method: Option<String>,
    path_info: PathInfoDto,
    parameters: Vec<ParamDto>,
}

#[derive(Debug, Serialize)]
struct PathInfoDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    resolved: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    construction: String,
}

#[derive(Debug, Serialize)]
struct ParamDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
    path_type: String,
    sources: Vec<String>,
}

// ============================================================================
// Emitter
// ============================================================================

pub struct Emitter {
    out_dir: PathBuf,
}

impl Emitter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// Serialize the report. Returns the package directory written.
    pub fn write_report(&self, report: &AppReport, app: &AppModel) -> AnalysisResult<PathBuf> {
        let package_dir = self.out_dir.join(&report.package);
        fs::create_dir_all(&package_dir)?;

        let mut chain_dtos = Vec::with_capacity(report.chains.len());
        for chain in &report.chains {
            let mut events = Vec::with_capacity(1 + chain.supports.len());
            events.push(self.write_event(&package_dir, app, &chain.root, true)?);
            for support in &chain.supports {
                events.push(self.write_event(&package_dir, app, &support.event, false)?);
            }
            chain_dtos.push(ChainDto {
                id: chain.id,
                satisfiable: chain.satisfiable.as_str().to_string(),
                events,
            });
        }

        let app_info = AppInfoDto {
            package: report.package.clone(),
            event_chains: chain_dtos,
        };
        let app_info_path = package_dir.join("appInfo.json");
        fs::write(&app_info_path, serde_json::to_string_pretty(&app_info)?)?;
        info!(path = %app_info_path.display(), chains = report.chains.len(), "report written");
        Ok(package_dir)
    }

    /// Write one event's constraint files; returns its appInfo entry.
    fn write_event(
        &self,
        package_dir: &Path,
        app: &AppModel,
        event: &Event,
        is_root: bool,
    ) -> AnalysisResult<EventDto> {
        let event_dir = package_dir
            .join(event.vulnerability.category_dir())
            .join("constraints")
            .join(event.id.to_string());

        let mut execution_file = None;
        let mut path_file = None;
        let mut metadata_file = None;

        if let Some(eval) = &event.evaluation {
            fs::create_dir_all(&event_dir)?;

            let renderer = PythonRenderer::new(&eval.arena);
            let sink_desc = app
                .body_of(&event.path.terminal.method)
                .and_then(|b| b.unit(event.path.terminal.index))
                .map(|s| s.to_string())
                .unwrap_or_else(|| event.path.terminal.to_string());
            let script =
                renderer.render_script(&eval.constraint, &event.entry.canonical(), &sink_desc);
            fs::write(event_dir.join("execution.py"), script)?;
            execution_file = Some("execution.py".to_string());

            if is_root {
                path_file = self.write_path_file(&event_dir, event)?;
                let metadata = self.metadata_dto(event);
                fs::write(
                    event_dir.join("metadata.json"),
                    serde_json::to_string_pretty(&metadata)?,
                )?;
                metadata_file = Some("metadata.json".to_string());
            }
        }

        let worst = event
            .params
            .iter()
            .max_by_key(|p| p.path_type.severity())
            .map(|p| p.path_type)
            .unwrap_or(PathType::ExecutionOnly);

        Ok(EventDto {
            kind: event.kind.as_str().to_string(),
            component: event.component.clone(),
            path: event.path_strings(app),
            status: match &event.outcome {
                PathOutcome::Analyzed => "analyzed".to_string(),
                PathOutcome::Timeout => "timeout".to_string(),
                PathOutcome::Error(msg) => format!("error: {msg}"),
            },
            execution_file,
            path_file,
            metadata_file,
            vulnerability: event.vulnerability.as_str().to_string(),
            path_type: worst.as_str().to_string(),
            variables: self.variables_dto(event),
        })
    }

    /// `path.txt` for hard-coded events, `path.py` for controlled ones,
    /// nothing for execution-only.
    fn write_path_file(&self, event_dir: &Path, event: &Event) -> AnalysisResult<Option<String>> {
        let sources: Vec<_> = event
            .params
            .iter()
            .flat_map(|p| p.sources.iter().cloned())
            .collect();

        let controlled: Vec<_> = event
            .params
            .iter()
            .filter(|p| {
                matches!(
                    p.path_type,
                    PathType::PartiallyControlled | PathType::FullyControlled
                )
            })
            .collect();

        if !controlled.is_empty() {
            let prefix = controlled.iter().find_map(|p| p.prefix.as_deref());
            fs::write(
                event_dir.join("path.py"),
                render_path_script(prefix, &sources),
            )?;
            return Ok(Some("path.py".to_string()));
        }

        let literals: Vec<(Option<usize>, String)> = event
            .params
            .iter()
            .filter(|p| p.path_type == PathType::HardCoded)
            .filter_map(|p| p.literal.clone().map(|l| (p.arg_index, l)))
            .collect();
        if !literals.is_empty() {
            fs::write(
                event_dir.join("path.txt"),
                render_path_text(&literals, &sources),
            )?;
            return Ok(Some("path.txt".to_string()));
        }

        Ok(None)
    }

    fn metadata_dto(&self, event: &Event) -> MetadataDto {
        let worst = event
            .params
            .iter()
            .max_by_key(|p| p.path_type.severity());

        MetadataDto {
            vulnerability_type: event.vulnerability.as_str().to_string(),
            path_type: worst
                .map(|p| p.path_type.as_str())
                .unwrap_or(PathType::ExecutionOnly.as_str())
                .to_string(),
            target_method: event
                .evaluation
                .as_ref()
                .and_then(|e| e.sink.as_ref())
                .map(|s| s.canonical()),
            path_info: PathInfoDto {
                resolved: worst.and_then(|p| p.literal.clone()),
                prefix: worst.and_then(|p| p.prefix.clone()),
                construction: worst
                    .map(|p| p.construction.as_str())
                    .unwrap_or("direct")
                    .to_string(),
            },
            parameters: event
                .params
                .iter()
                .map(|p| ParamDto {
                    index: p.arg_index,
                    path_type: p.path_type.as_str().to_string(),
                    sources: p.sources.iter().map(|s| s.to_string()).collect(),
                })
                .collect(),
        }
    }

    /// Symbolic-variable summary for the appInfo entry: inputs and heap
    /// dependencies with their provenance.
    fn variables_dto(&self, event: &Event) -> BTreeMap<String, VariableDto> {
        let mut out = BTreeMap::new();
        let Some(eval) = &event.evaluation else {
            return out;
        };
        for id in &eval.inputs {
            if let SymbolicVar::Input { ty, name, .. } = eval.arena.get(*id) {
                out.insert(
                    name.clone(),
                    VariableDto {
                        kind: "input".to_string(),
                        ty: ty.clone(),
                        provenance: "parameter".to_string(),
                    },
                );
            }
        }
        for id in &eval.heap_vars {
            if let SymbolicVar::Heap { field, .. } = eval.arena.get(*id) {
                out.insert(
                    eval.arena.label(*id),
                    VariableDto {
                        kind: "heap".to_string(),
                        ty: field.ty.clone(),
                        provenance: format!("{}.{}", field.class, field.name),
                    },
                );
            }
        }
        out
    }
}
