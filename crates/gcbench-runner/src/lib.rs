//! GC sweep runner: expands a campaign into JVM runs, executes them one at a
//! time inside a fresh workspace and writes one CSV row per run.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod invocation;
pub mod record;
pub mod spec;
pub mod sweep;
pub mod workspace;

pub use catalog::{BenchmarkCatalog, CatalogEntry, CatalogError};
pub use config::{check_runtime, CampaignConfig, CampaignOptions, ConfigError};
pub use error::CampaignError;
pub use executor::{execute, probe_runtime, ExecError, LogTarget, RunOutcome};
pub use invocation::{render_command, InvocationBuilder, InvocationError};
pub use record::{flush, record, ResultRecord};
pub use spec::{Collector, GcAlgorithm, HeuristicSelector, RunSpec, Suite};
pub use sweep::{generate, SweepParams};
pub use workspace::{Workspace, WorkspaceError};

pub const RUNNER_VERSION: &str = concat!("rust-", env!("CARGO_PKG_VERSION"));

/// What a finished campaign produced.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub workspace: PathBuf,
    pub output: PathBuf,
    pub gc_algorithm: GcAlgorithm,
    pub dry_run: bool,
    pub total_runs: usize,
    pub executed_runs: usize,
    /// Runs whose process exited non-zero or was killed.
    pub failed_runs: usize,
    pub commands: Vec<String>,
    pub records: Vec<ResultRecord>,
}

/// Run a whole sweep: validate, lay out the workspace, execute every run in
/// order, then write the CSV once.
///
/// Option and catalog problems are reported before the workspace is created.
pub fn run_campaign(
    options: &CampaignOptions,
    config: &CampaignConfig,
) -> Result<CampaignSummary, CampaignError> {
    run_campaign_with(options, config, |_| {})
}

/// Like [`run_campaign`], calling `on_command` with each rendered command
/// just before it is executed (or skipped, in a dry run).
pub fn run_campaign_with<F>(
    options: &CampaignOptions,
    config: &CampaignConfig,
    mut on_command: F,
) -> Result<CampaignSummary, CampaignError>
where
    F: FnMut(&str),
{
    options.validate()?;
    config.validate()?;
    let runtime = check_runtime(&options.runtime)?;
    if options.parallel_gc_threads != spec::PINNED_PARALLEL_GC_THREADS {
        warn!(
            requested = options.parallel_gc_threads,
            used = spec::PINNED_PARALLEL_GC_THREADS,
            "ParallelGCThreads is pinned for every run; ignoring requested value"
        );
    }

    let catalog = BenchmarkCatalog::resolve(config)?;
    let params = SweepParams::from(options);
    let specs = generate(&catalog, &params);
    info!(
        benchmarks = ?catalog.names(),
        runs = specs.len(),
        "Resolved sweep"
    );

    let workspace = Workspace::initialize(&options.workdir, &catalog.names())?;
    workspace.write_manifest(&campaign_manifest(options, &catalog, &runtime, specs.len()))?;

    info!(
        "-------------> USING {} GC <-------------",
        options.gc_algorithm.as_str().to_uppercase()
    );

    let builder = InvocationBuilder::new(
        runtime,
        catalog.dacapo_archive.clone(),
        catalog.specjvm_archive.clone(),
    )
    .with_gc_details(options.print_gc_details);

    let mut records = Vec::with_capacity(specs.len());
    let mut commands = Vec::with_capacity(specs.len());
    let mut executed_runs = 0;
    let mut failed_runs = 0;
    for (idx, run) in specs.iter().enumerate() {
        let workdir = workspace.benchmark_dir(&run.benchmark)?;
        let args = builder.build(run)?;
        let log_target = if run.dry_run {
            LogTarget::Discard
        } else {
            LogTarget::File(workdir.join(run.output_capture_name()))
        };
        info!(
            run = idx + 1,
            of = specs.len(),
            label = %run.label(),
            "Starting run"
        );
        let rendered = render_command(&args);
        on_command(&rendered);
        let outcome = execute(&args, &workdir, &log_target, run.dry_run)?;
        if outcome.was_executed() {
            executed_runs += 1;
            if !outcome.succeeded() {
                failed_runs += 1;
                warn!(
                    label = %run.label(),
                    exit_code = ?outcome.exit_code(),
                    "Benchmark run did not exit cleanly; recording it anyway"
                );
            }
        }
        records.push(record(run, &outcome, options.drop_warmup));
        commands.push(rendered);
    }

    flush(&records, &options.output)?;
    info!(
        output = %options.output.display(),
        rows = records.len(),
        failed = failed_runs,
        "=====[ DONE ]====="
    );

    Ok(CampaignSummary {
        workspace: workspace.root().to_path_buf(),
        output: options.output.clone(),
        gc_algorithm: options.gc_algorithm,
        dry_run: options.dry_run,
        total_runs: specs.len(),
        executed_runs,
        failed_runs,
        commands,
        records,
    })
}

fn campaign_manifest(
    options: &CampaignOptions,
    catalog: &BenchmarkCatalog,
    runtime: &Path,
    total_runs: usize,
) -> serde_json::Value {
    json!({
        "schema_version": "campaign_v1",
        "runner_version": RUNNER_VERSION,
        "created_at": Utc::now().to_rfc3339(),
        "runtime": runtime.to_string_lossy(),
        "gc_algorithm": options.gc_algorithm,
        "heuristic": options.heuristic.to_string(),
        "sweep": {
            "parallel_gc_threads": spec::PINNED_PARALLEL_GC_THREADS,
            "conc_gc_threads_max": options.conc_gc_threads,
            "app_threads_max_exclusive": options.app_threads,
            "iterations": options.iterations,
            "min_heap": options.min_heap,
            "max_heap": options.max_heap,
            "print_gc_details": options.print_gc_details,
            "drop_warmup": options.drop_warmup,
            "dry_run": options.dry_run,
            "total_runs": total_runs,
        },
        "catalog": catalog,
    })
}

pub(crate) fn ensure_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)
}

/// Write through a temp file in the same directory, then rename over `path`.
pub(crate) fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let ts = Utc::now().timestamp_micros();
    let pid = std::process::id();
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("tmpfile");
    let tmp = path.with_file_name(format!(".{}.tmp.{}.{}", name, pid, ts));
    let mut file = fs::File::create(&tmp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}
