//! Campaign configuration
//!
//! Two inputs feed a campaign: the YAML config file (benchmark lists and suite
//! archive locations) and the command-line options. Both are validated once,
//! before anything touches the filesystem.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::spec::{GcAlgorithm, HeuristicSelector};
use crate::workspace::MANIFEST_FILE;

/// Configuration and option validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Zero or several of --shenandoah, --g1, --defaultgc
    #[error("Invalid selection of GC algorithm. Please select just one of --shenandoah, --g1 or --defaultgc.")]
    InvalidGcSelection,

    /// ConcGCThreads below the minimum the sweep starts from
    #[error("ConcGCThreads must be >= 2, got {0}")]
    ConcGcThreadsTooLow(u32),

    /// Application thread bound leaves nothing to sweep
    #[error("appthreads is an exclusive upper bound and must be >= 2, got {0}")]
    AppThreadsTooLow(u32),

    /// Iteration count of zero
    #[error("number of iterations must be at least 1, got {0}")]
    InvalidIterations(u32),

    /// Heuristic not in the Shenandoah list and not ALL
    #[error("unknown Shenandoah heuristic '{0}' (expected ALL or one of halfway, newadaptive, statusquo, lazy, dynamic, aggressive)")]
    UnknownHeuristic(String),

    /// --javapath does not point at a file
    #[error("Invalid --javapath: {}", .0.display())]
    RuntimeNotFound(PathBuf),

    /// Benchmark name that is not a single plain directory name
    #[error("invalid benchmark name '{0}': must be a plain directory name")]
    InvalidBenchmarkName(String),

    /// --config does not point at a file
    #[error("Invalid --config: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// Failed to parse the YAML configuration
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Failed to read the configuration file
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    global: CampaignConfig,
}

/// The `global` section of a campaign config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignConfig {
    #[serde(default, deserialize_with = "benchmark_list")]
    pub dacapo_benchmarks: Vec<String>,
    #[serde(default, deserialize_with = "benchmark_list")]
    pub specjvm_benchmarks: Vec<String>,
    #[serde(default)]
    pub dacapo_path: Option<PathBuf>,
    #[serde(default)]
    pub specjvm_path: Option<PathBuf>,
}

impl CampaignConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)
            .map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_yaml::from_str(raw)?;
        file.global.validate()?;
        Ok(file.global)
    }

    /// Every benchmark gets its own directory under the workspace root, so
    /// each name must stay inside it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dacapo_benchmarks
            .iter()
            .chain(self.specjvm_benchmarks.iter())
            .try_for_each(|name| check_benchmark_name(name))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBenchmarkList {
    Csv(String),
    Items(Vec<String>),
}

fn benchmark_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawBenchmarkList>::deserialize(deserializer)?;
    Ok(match raw {
        None => Vec::new(),
        Some(RawBenchmarkList::Csv(s)) => split_benchmark_list(&s),
        Some(RawBenchmarkList::Items(items)) => items
            .iter()
            .flat_map(|item| split_benchmark_list(item))
            .collect(),
    })
}

/// Strip all whitespace, then split on commas. Empty entries are dropped.
pub fn split_benchmark_list(raw: &str) -> Vec<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn check_benchmark_name(name: &str) -> Result<(), ConfigError> {
    let mut components = Path::new(name).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(c)), None) if c == name
    );
    if !plain || name == MANIFEST_FILE {
        return Err(ConfigError::InvalidBenchmarkName(name.to_string()));
    }
    Ok(())
}

/// Everything the campaign needs from the command line.
#[derive(Debug, Clone)]
pub struct CampaignOptions {
    pub output: PathBuf,
    pub runtime: PathBuf,
    pub workdir: PathBuf,
    pub gc_algorithm: GcAlgorithm,
    pub heuristic: HeuristicSelector,
    pub iterations: u32,
    pub parallel_gc_threads: u32,
    pub conc_gc_threads: u32,
    pub app_threads: u32,
    pub min_heap: Option<String>,
    pub max_heap: Option<String>,
    pub print_gc_details: bool,
    pub drop_warmup: bool,
    pub dry_run: bool,
}

impl CampaignOptions {
    /// Range checks that must pass before any workspace is created.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conc_gc_threads < 2 {
            return Err(ConfigError::ConcGcThreadsTooLow(self.conc_gc_threads));
        }
        if self.app_threads < 2 {
            return Err(ConfigError::AppThreadsTooLow(self.app_threads));
        }
        if self.iterations == 0 {
            return Err(ConfigError::InvalidIterations(self.iterations));
        }
        check_runtime(&self.runtime)?;
        Ok(())
    }
}

/// Confirm the runtime executable exists and return its absolute path.
///
/// Runs execute from inside the workspace, so a relative path would resolve
/// against the wrong directory.
pub fn check_runtime(path: &Path) -> Result<PathBuf, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::RuntimeNotFound(path.to_path_buf()));
    }
    path.canonicalize()
        .map_err(|_| ConfigError::RuntimeNotFound(path.to_path_buf()))
}
