use anyhow::{Context, Result};
use clap::Parser;
use gcbench_runner::error::EXIT_FAILURE;
use gcbench_runner::{
    check_runtime, probe_runtime, run_campaign_with, CampaignConfig, CampaignError, CampaignOptions,
    CampaignSummary, GcAlgorithm, HeuristicSelector,
};
use serde_json::{json, Value};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "gcbench",
    version,
    about = "Sweep JVM garbage collector settings over DaCapo and SPECjvm2008 benchmarks"
)]
struct Cli {
    /// Output CSV file for results.
    #[arg(required_unless_present = "testjava")]
    output: Option<PathBuf>,

    /// Configuration file (YAML with a `global` section).
    #[arg(long, required_unless_present = "testjava")]
    config: Option<PathBuf>,

    /// Java executable to benchmark.
    #[arg(long)]
    javapath: PathBuf,

    /// Number of iterations per benchmark.
    #[arg(long, default_value_t = 5)]
    num: u32,

    /// Requested -XX:ParallelGCThreads; every run currently uses 2.
    #[arg(long, default_value_t = 2)]
    pargcthreads: u32,

    /// Highest -XX:ConcGCThreads value to sweep (from 2, inclusive).
    #[arg(long, default_value_t = 2)]
    concgcthreads: u32,

    /// Application thread bound (from 1, exclusive).
    #[arg(long, default_value_t = 2)]
    appthreads: u32,

    /// Min heap passed to -Xms.
    #[arg(long)]
    xms: Option<String>,

    /// Max heap passed to -Xmx.
    #[arg(long)]
    xmx: Option<String>,

    /// Enable GC detail logging to a per-run log file.
    #[arg(long)]
    printgcdetails: bool,

    /// Use Shenandoah GC.
    #[arg(long)]
    shenandoah: bool,

    /// Use G1 GC. Mutually exclusive with --defaultgc and --shenandoah.
    #[arg(long)]
    g1: bool,

    /// Use the JVM's default GC. Mutually exclusive with --g1 and --shenandoah.
    #[arg(long)]
    defaultgc: bool,

    /// Shenandoah heuristic to use, or ALL.
    #[arg(long, default_value = "newadaptive")]
    heuristic: String,

    /// Enable debug output.
    #[arg(long)]
    debug: bool,

    /// Don't run. Just print out the commands to run.
    #[arg(long)]
    fake: bool,

    /// Log file for the campaign.
    #[arg(long, default_value = "gcbench.log")]
    logfile: PathBuf,

    /// Test the java executable only.
    #[arg(long)]
    testjava: bool,

    /// Campaign directory; must not exist yet.
    #[arg(long, default_value = "WORK")]
    workdir: PathBuf,

    /// Count the first iteration instead of dropping it as warm-up.
    #[arg(long)]
    keep_warmup: bool,

    /// Print the campaign summary as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    let json_mode = cli.json;
    let logfile = log_file_for(&cli);
    if let Err(err) = init_logging(cli.debug, logfile.as_deref()) {
        eprintln!("Error: {:#}", err);
        std::process::exit(EXIT_FAILURE);
    }

    match run_command(cli) {
        Ok(Some(payload)) => emit_json(&payload),
        Ok(None) => {}
        Err(err) => {
            let code = err
                .downcast_ref::<CampaignError>()
                .map(|e| e.exit_code())
                .unwrap_or(EXIT_FAILURE);
            if json_mode {
                emit_json(&json_error(code, format!("{:#}", err)));
            } else {
                tracing::error!("{:#}", err);
                eprintln!("Error: {:#}", err);
            }
            std::process::exit(code);
        }
    }
}

/// Only live campaigns write a log file.
fn log_file_for(cli: &Cli) -> Option<PathBuf> {
    if cli.fake || cli.testjava {
        None
    } else {
        Some(cli.logfile.clone())
    }
}

/// `RUST_LOG` wins when set; otherwise INFO, or DEBUG with `--debug`.
fn env_filter(debug: bool, rust_log: Option<&str>) -> EnvFilter {
    match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::new(directives),
        None if debug => EnvFilter::new("debug"),
        None => EnvFilter::new("info"),
    }
}

fn init_logging(debug: bool, logfile: Option<&Path>) -> Result<()> {
    let filter = env_filter(debug, std::env::var("RUST_LOG").ok().as_deref());
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    let file_layer = match logfile {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file '{}'", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();
    Ok(())
}

fn run_command(cli: Cli) -> Result<Option<Value>> {
    let runtime = check_runtime(&cli.javapath).map_err(CampaignError::from)?;

    if cli.testjava {
        let text = probe_runtime(&runtime).map_err(CampaignError::from)?;
        if cli.json {
            return Ok(Some(json!({
                "ok": true,
                "command": "testjava",
                "runtime": runtime.display().to_string(),
                "version_output": text,
            })));
        }
        print!("{}", text);
        return Ok(None);
    }

    let gc_algorithm =
        GcAlgorithm::from_flags(cli.shenandoah, cli.g1, cli.defaultgc).map_err(CampaignError::from)?;
    let heuristic: HeuristicSelector = cli.heuristic.parse().map_err(CampaignError::from)?;
    let (Some(output), Some(config_path)) = (cli.output, cli.config) else {
        // clap enforces both unless --testjava was given
        anyhow::bail!("output and --config are required");
    };

    let options = CampaignOptions {
        output,
        runtime,
        workdir: cli.workdir,
        gc_algorithm,
        heuristic,
        iterations: cli.num,
        parallel_gc_threads: cli.pargcthreads,
        conc_gc_threads: cli.concgcthreads,
        app_threads: cli.appthreads,
        min_heap: cli.xms,
        max_heap: cli.xmx,
        print_gc_details: cli.printgcdetails,
        drop_warmup: !cli.keep_warmup,
        dry_run: cli.fake,
    };
    options.validate().map_err(CampaignError::from)?;
    let config = CampaignConfig::load(&config_path).map_err(CampaignError::from)?;
    let json_mode = cli.json;
    let summary = run_campaign_with(&options, &config, |cmd| {
        if !json_mode {
            println!("CMD: {}", cmd);
        }
    })?;

    if cli.json {
        return Ok(Some(json!({
            "ok": true,
            "command": "run",
            "summary": summary_to_json(&summary),
        })));
    }
    print_summary(&summary);
    Ok(None)
}

fn summary_to_json(summary: &CampaignSummary) -> Value {
    serde_json::to_value(summary).unwrap_or_else(|_| json!({}))
}

fn print_summary(summary: &CampaignSummary) {
    println!("gc_algorithm: {}", summary.gc_algorithm);
    println!("workspace: {}", summary.workspace.display());
    println!("results: {}", summary.output.display());
    println!(
        "runs: {} (executed: {}, failed: {})",
        summary.total_runs, summary.executed_runs, summary.failed_runs
    );
}

fn emit_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(_) => println!("{}", value),
    }
}

fn json_error(exit_code: i32, message: String) -> Value {
    json!({
        "ok": false,
        "error": {
            "code": "campaign_failed",
            "exit_code": exit_code,
            "message": message,
        }
    })
}
