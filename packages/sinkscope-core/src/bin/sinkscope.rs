//! Sinkscope CLI
//!
//! Analyzes one lifted application descriptor against a target-method list
//! and writes the per-package report tree.
//!
//! Exit codes: 0 success, 1 fatal analysis error, 2 configuration error.
//! Warnings never change the exit code.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use sinkscope_core::features::reporting::infrastructure::emitter::Emitter;
use sinkscope_core::{AnalysisConfig, AnalysisError, Analyzer, AppModel, TargetSet};

#[derive(Parser)]
#[command(name = "sinkscope")]
#[command(about = "Whole-program reachability and path-constraint analysis for file-system sinks")]
struct Cli {
    /// Lifted application descriptor (JSON).
    #[arg(short, long)]
    app: PathBuf,

    /// Target method signatures, one canonical signature per line.
    #[arg(short, long)]
    targets: PathBuf,

    /// Output directory for the report tree.
    #[arg(short, long, default_value = "out")]
    out: PathBuf,

    /// Worker pool size (defaults to the CPU count).
    #[arg(short, long)]
    workers: Option<usize>,

    /// Per-path budget in seconds (0 disables).
    #[arg(long, default_value = "60")]
    path_timeout: u64,

    /// Global budget in seconds (0 disables).
    #[arg(long, default_value = "1800")]
    global_timeout: u64,

    /// Class-name prefixes owning the application's components; defaults to
    /// the manifest package.
    #[arg(long)]
    package_prefix: Vec<String>,

    /// Keep paths entered through UI click handlers.
    #[arg(long)]
    keep_ui_entries: bool,

    /// Connect unresolved intent sites to every exported component of the
    /// matching kind.
    #[arg(long)]
    fanout_imprecise: bool,

    /// Verbose diagnostics (repeat for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sinkscope_core={default},sinkscope={default}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), AnalysisError> {
    let config = AnalysisConfig {
        package_prefixes: cli.package_prefix.clone(),
        workers: cli.workers.unwrap_or_else(num_cpus::get),
        per_path_timeout: (cli.path_timeout > 0).then(|| Duration::from_secs(cli.path_timeout)),
        global_timeout: (cli.global_timeout > 0).then(|| Duration::from_secs(cli.global_timeout)),
        drop_ui_entries: !cli.keep_ui_entries,
        fanout_imprecise: cli.fanout_imprecise,
        ..Default::default()
    };

    let mut app = AppModel::from_json_file(&cli.app).map_err(|e| match e {
        AnalysisError::Io(io) => {
            AnalysisError::Config(format!("cannot read {}: {io}", cli.app.display()))
        }
        AnalysisError::Serde(se) => {
            AnalysisError::Config(format!("malformed descriptor {}: {se}", cli.app.display()))
        }
        other => other,
    })?;
    let targets = TargetSet::from_file(&cli.targets).map_err(|e| match e {
        AnalysisError::Io(io) => {
            AnalysisError::Config(format!("cannot read {}: {io}", cli.targets.display()))
        }
        other => other,
    })?;

    let analyzer = Analyzer::new(config)?;
    let report = analyzer.analyze(&mut app, &targets)?;

    for warning in &report.warnings {
        warn!("{warning}");
    }

    let emitter = Emitter::new(&cli.out);
    let written = emitter.write_report(&report, &app)?;
    println!(
        "{}: {} event chain(s) written to {}",
        report.package,
        report.chains.len(),
        written.display()
    );
    Ok(())
}
