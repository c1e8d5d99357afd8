//! JVM argument construction.
//!
//! Pure: nothing here touches the filesystem, so every branch can be checked
//! by comparing whole argument vectors.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::spec::{Collector, RunSpec, Suite};

/// SPECjvm2008 iteration count; its harness does not take `-n`.
pub const SPECJVM_ITERATIONS: u32 = 200;

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("no {suite} archive configured for benchmark '{benchmark}'")]
    MissingArchive {
        suite: &'static str,
        benchmark: String,
    },
}

#[derive(Debug, Clone)]
pub struct InvocationBuilder {
    runtime: PathBuf,
    dacapo_archive: Option<PathBuf>,
    specjvm_archive: Option<PathBuf>,
    print_gc_details: bool,
}

impl InvocationBuilder {
    pub fn new(
        runtime: impl Into<PathBuf>,
        dacapo_archive: Option<PathBuf>,
        specjvm_archive: Option<PathBuf>,
    ) -> Self {
        Self {
            runtime: runtime.into(),
            dacapo_archive,
            specjvm_archive,
            print_gc_details: false,
        }
    }

    /// Append GC logging flags, writing to the run's `-gc.log` file.
    pub fn with_gc_details(mut self, enabled: bool) -> Self {
        self.print_gc_details = enabled;
        self
    }

    pub fn build(&self, spec: &RunSpec) -> Result<Vec<String>, InvocationError> {
        let mut cmd = vec![
            self.runtime.to_string_lossy().to_string(),
            format!("-XX:ParallelGCThreads={}", spec.parallel_gc_threads),
            format!("-XX:ConcGCThreads={}", spec.conc_gc_threads),
        ];
        if let Some(min) = &spec.min_heap {
            cmd.push(format!("-Xms{}", min));
        }
        if let Some(max) = &spec.max_heap {
            cmd.push(format!("-Xmx{}", max));
        }

        match &spec.collector {
            Collector::Shenandoah { heuristic } => {
                cmd.push("-XX:+UseShenandoahGC".to_string());
                cmd.push(format!("-XX:ShenandoahGCHeuristics={}", heuristic));
            }
            Collector::G1 => cmd.push("-XX:+UseG1GC".to_string()),
            Collector::Default => {}
        }

        if self.print_gc_details {
            cmd.extend([
                "-XX:+PrintGCDetails".to_string(),
                "-XX:+PrintGCTimeStamps".to_string(),
                "-XX:+PrintGC".to_string(),
                format!("-Xloggc:{}", spec.gc_log_name()),
            ]);
        }

        match spec.suite {
            Suite::DaCapo => {
                let jar = self.archive(&self.dacapo_archive, spec)?;
                cmd.extend([
                    "-jar".to_string(),
                    path_arg(jar),
                    spec.benchmark.clone(),
                    format!("-n{}", spec.iterations),
                ]);
            }
            Suite::SpecJvm => {
                let jar = self.archive(&self.specjvm_archive, spec)?;
                let home = jar.parent().unwrap_or(Path::new("."));
                cmd.extend([
                    format!("-Dspecjvm.home.dir={}", home.display()),
                    "-jar".to_string(),
                    path_arg(jar),
                    "-ikv".to_string(),
                    "-ict".to_string(),
                    "-bt".to_string(),
                    spec.app_threads.to_string(),
                    "--iterations".to_string(),
                    SPECJVM_ITERATIONS.to_string(),
                    spec.benchmark.clone(),
                ]);
            }
        }
        Ok(cmd)
    }

    fn archive<'a>(
        &self,
        archive: &'a Option<PathBuf>,
        spec: &RunSpec,
    ) -> Result<&'a Path, InvocationError> {
        archive
            .as_deref()
            .ok_or_else(|| InvocationError::MissingArchive {
                suite: spec.suite.as_str(),
                benchmark: spec.benchmark.clone(),
            })
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Single-line shell rendering of a command, for reports and logs.
pub fn render_command(parts: &[String]) -> String {
    parts
        .iter()
        .map(|p| shell_quote(p))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        "''".to_string()
    } else if s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:=+".contains(c))
    {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', "'\"'\"'"))
    }
}
