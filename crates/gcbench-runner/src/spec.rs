//! Run parameter model.
//!
//! A [`RunSpec`] is one fully resolved JVM invocation. The Shenandoah heuristic
//! lives inside [`Collector::Shenandoah`], so a spec carrying a heuristic for
//! any other collector cannot be built.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::ConfigError;

/// Heuristics understood by the Shenandoah build under test, in sweep order.
pub const SHENANDOAH_HEURISTICS: &[&str] = &[
    "halfway",
    "newadaptive",
    "statusquo",
    "lazy",
    "dynamic",
    "aggressive",
];

/// Value of `-XX:ParallelGCThreads` for every run.
pub const PINNED_PARALLEL_GC_THREADS: u32 = 2;

/// Label used wherever a heuristic or heap bound is absent.
pub const NONE_LABEL: &str = "None";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suite {
    DaCapo,
    SpecJvm,
}

impl Suite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Suite::DaCapo => "dacapo",
            Suite::SpecJvm => "specjvm",
        }
    }
}

/// Collector selected for a whole campaign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GcAlgorithm {
    Shenandoah,
    G1,
    #[serde(rename = "defaultgc")]
    Default,
}

impl GcAlgorithm {
    /// Resolve the three mutually exclusive CLI switches into one algorithm.
    pub fn from_flags(shenandoah: bool, g1: bool, default: bool) -> Result<Self, ConfigError> {
        match (shenandoah, g1, default) {
            (true, false, false) => Ok(GcAlgorithm::Shenandoah),
            (false, true, false) => Ok(GcAlgorithm::G1),
            (false, false, true) => Ok(GcAlgorithm::Default),
            _ => Err(ConfigError::InvalidGcSelection),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GcAlgorithm::Shenandoah => "shenandoah",
            GcAlgorithm::G1 => "g1",
            GcAlgorithm::Default => "defaultgc",
        }
    }
}

impl fmt::Display for GcAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which heuristics a campaign sweeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeuristicSelector {
    All,
    Named(String),
}

impl FromStr for HeuristicSelector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "ALL" {
            return Ok(HeuristicSelector::All);
        }
        if SHENANDOAH_HEURISTICS.contains(&s) {
            Ok(HeuristicSelector::Named(s.to_string()))
        } else {
            Err(ConfigError::UnknownHeuristic(s.to_string()))
        }
    }
}

impl fmt::Display for HeuristicSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeuristicSelector::All => f.write_str("ALL"),
            HeuristicSelector::Named(name) => f.write_str(name),
        }
    }
}

/// Collector for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collector {
    Shenandoah { heuristic: String },
    G1,
    Default,
}

impl Collector {
    pub fn algorithm(&self) -> GcAlgorithm {
        match self {
            Collector::Shenandoah { .. } => GcAlgorithm::Shenandoah,
            Collector::G1 => GcAlgorithm::G1,
            Collector::Default => GcAlgorithm::Default,
        }
    }

    pub fn heuristic(&self) -> Option<&str> {
        match self {
            Collector::Shenandoah { heuristic } => Some(heuristic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub benchmark: String,
    pub suite: Suite,
    pub collector: Collector,
    pub min_heap: Option<String>,
    pub max_heap: Option<String>,
    pub parallel_gc_threads: u32,
    pub conc_gc_threads: u32,
    pub app_threads: u32,
    pub iterations: u32,
    pub dry_run: bool,
}

impl RunSpec {
    pub fn gc_algorithm(&self) -> GcAlgorithm {
        self.collector.algorithm()
    }

    pub fn heuristic(&self) -> Option<&str> {
        self.collector.heuristic()
    }

    /// Stable per-run name; every file a run produces is derived from it.
    pub fn label(&self) -> String {
        format!(
            "{}-{}-{}-min{}-max{}-p{}-c{}-bt{}",
            self.benchmark,
            self.gc_algorithm(),
            self.heuristic().unwrap_or(NONE_LABEL),
            self.min_heap.as_deref().unwrap_or(NONE_LABEL),
            self.max_heap.as_deref().unwrap_or(NONE_LABEL),
            self.parallel_gc_threads,
            self.conc_gc_threads,
            self.app_threads
        )
    }

    pub fn gc_log_name(&self) -> String {
        format!("{}-gc.log", self.label())
    }

    pub fn output_capture_name(&self) -> String {
        format!("{}-gc-output.txt", self.label())
    }
}
