//! Synchronous child-process execution.
//!
//! One benchmark JVM at a time: `execute` blocks until the child exits and
//! its output is on disk. The working directory is handed to the spawned
//! command; the runner's own current directory is never changed.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::invocation::render_command;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("cannot execute an empty command")]
    EmptyCommand,

    #[error("Failed to spawn command '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write run output to '{path}': {source}")]
    Log {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where a run's captured stdout/stderr ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Discard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Dry run: the command was reported, never spawned.
    NotExecuted,
    Completed {
        /// `None` when the child was terminated by a signal.
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

impl RunOutcome {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunOutcome::Completed { exit_code, .. } => *exit_code,
            RunOutcome::NotExecuted => None,
        }
    }

    pub fn was_executed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }

    /// True only for a child that ran and exited with status 0.
    pub fn succeeded(&self) -> bool {
        self.exit_code() == Some(0)
    }

    /// stdout followed by stderr, the same layout as the log file.
    pub fn captured_text(&self) -> String {
        match self {
            RunOutcome::Completed { stdout, stderr, .. } => format!("{}{}", stdout, stderr),
            RunOutcome::NotExecuted => String::new(),
        }
    }
}

pub fn execute(
    args: &[String],
    workdir: &Path,
    log_target: &LogTarget,
    dry_run: bool,
) -> Result<RunOutcome, ExecError> {
    let (program, rest) = args.split_first().ok_or(ExecError::EmptyCommand)?;
    info!("CMD: {}", render_command(args));
    if dry_run {
        return Ok(RunOutcome::NotExecuted);
    }

    let mut log_file = match log_target {
        LogTarget::File(path) => Some(fs::File::create(path).map_err(|e| log_error(path, e))?),
        LogTarget::Discard => None,
    };

    debug!(workdir = %workdir.display(), "Spawning benchmark process");
    let output = Command::new(program)
        .args(rest)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

    if let (LogTarget::File(path), Some(file)) = (log_target, log_file.as_mut()) {
        file.write_all(&output.stdout)
            .and_then(|_| file.write_all(&output.stderr))
            .and_then(|_| file.sync_all())
            .map_err(|e| log_error(path, e))?;
    }

    let exit_code = output.status.code();
    match exit_code {
        Some(0) => debug!("Benchmark process exited cleanly"),
        Some(code) => warn!(
            exit_code = code,
            workdir = %workdir.display(),
            "Benchmark process exited non-zero"
        ),
        None => warn!(
            workdir = %workdir.display(),
            "Benchmark process terminated by signal"
        ),
    }

    Ok(RunOutcome::Completed {
        exit_code,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Run `<runtime> -version` and return everything it printed.
pub fn probe_runtime(runtime: &Path) -> Result<String, ExecError> {
    let program = runtime.to_string_lossy().to_string();
    info!(
        "Testing java: {}",
        render_command(&[program.clone(), "-version".to_string()])
    );
    let output = Command::new(runtime)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ExecError::Spawn { program, source })?;
    if !output.status.success() {
        warn!(status = %output.status, "Runtime version check exited non-zero");
    }
    Ok(format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    ))
}

fn log_error(path: &Path, source: std::io::Error) -> ExecError {
    ExecError::Log {
        path: path.display().to_string(),
        source,
    }
}
