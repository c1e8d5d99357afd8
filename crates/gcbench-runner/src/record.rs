//! Per-run result rows and the CSV they are flushed to.

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::atomic_write_bytes;
use crate::executor::RunOutcome;
use crate::spec::{RunSpec, Suite, NONE_LABEL};

pub const CSV_HEADER: [&str; 9] = [
    "benchmark",
    "gc_algorithm",
    "heuristic",
    "min_heap",
    "max_heap",
    "parallel_gc_threads",
    "conc_gc_threads",
    "effective_iteration_count",
    "raw_output_samples",
];

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to write results to '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub benchmark: String,
    pub gc_algorithm: String,
    pub heuristic: Option<String>,
    pub min_heap: Option<String>,
    pub max_heap: Option<String>,
    pub parallel_gc_threads: u32,
    pub conc_gc_threads: u32,
    pub effective_iteration_count: u32,
    pub raw_output_samples: Vec<f64>,
}

/// Turn a finished run into its result row.
///
/// With `drop_warmup` the first iteration is not counted and its sample, if
/// one was captured, is discarded.
pub fn record(spec: &RunSpec, outcome: &RunOutcome, drop_warmup: bool) -> ResultRecord {
    let samples = extract_samples(spec.suite, &outcome.captured_text());
    let (effective_iteration_count, raw_output_samples) = if drop_warmup {
        (
            spec.iterations.saturating_sub(1),
            samples.into_iter().skip(1).collect(),
        )
    } else {
        (spec.iterations, samples)
    };
    ResultRecord {
        benchmark: spec.benchmark.clone(),
        gc_algorithm: spec.gc_algorithm().as_str().to_string(),
        heuristic: spec.heuristic().map(|h| h.to_string()),
        min_heap: spec.min_heap.clone(),
        max_heap: spec.max_heap.clone(),
        parallel_gc_threads: spec.parallel_gc_threads,
        conc_gc_threads: spec.conc_gc_threads,
        effective_iteration_count,
        raw_output_samples,
    }
}

/// Scrape per-iteration measurements from benchmark console output.
///
/// DaCapo reports wall time in msec for each warmup and for the final
/// iteration; SPECjvm2008 reports a throughput score per iteration.
pub fn extract_samples(suite: Suite, text: &str) -> Vec<f64> {
    text.lines()
        .filter_map(|line| match suite {
            Suite::DaCapo => dacapo_sample(line),
            Suite::SpecJvm => specjvm_sample(line),
        })
        .collect()
}

// ===== DaCapo 9.12 luindex completed warmup 1 in 1834 msec =====
// ===== DaCapo 9.12 luindex PASSED in 1190 msec =====
fn dacapo_sample(line: &str) -> Option<f64> {
    let line = line.trim();
    if !line.starts_with("===== DaCapo") {
        return None;
    }
    if !(line.contains(" completed warmup ") || line.contains(" PASSED in ")) {
        return None;
    }
    let before_unit = line.split(" msec").next()?;
    before_unit.rsplit(' ').next()?.parse().ok()
}

// Iteration 1 (4m0s) result: 112.35 ops/m
fn specjvm_sample(line: &str) -> Option<f64> {
    let line = line.trim();
    if !line.starts_with("Iteration ") {
        return None;
    }
    let (_, after) = line.split_once(" result: ")?;
    after.split_whitespace().next()?.parse().ok()
}

/// Samples as one scalar cell: `1834;1190;1102`.
pub fn render_samples(samples: &[f64]) -> String {
    samples
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Full CSV document: header plus one row per record. Text fields are
/// quoted, numeric fields are bare, and absent values are an empty quoted
/// string.
pub fn render_csv(records: &[ResultRecord]) -> String {
    let mut out = String::new();
    let header: Vec<String> = CSV_HEADER.iter().map(|h| quote(h)).collect();
    let _ = writeln!(out, "{}", header.join(","));
    for r in records {
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            quote(&r.benchmark),
            quote(&r.gc_algorithm),
            quote(r.heuristic.as_deref().unwrap_or(NONE_LABEL)),
            quote(r.min_heap.as_deref().unwrap_or("")),
            quote(r.max_heap.as_deref().unwrap_or("")),
            r.parallel_gc_threads,
            r.conc_gc_threads,
            r.effective_iteration_count,
            quote(&render_samples(&r.raw_output_samples)),
        );
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Write every record to `destination` in one go.
pub fn flush(records: &[ResultRecord], destination: &Path) -> Result<(), RecordError> {
    atomic_write_bytes(destination, render_csv(records).as_bytes()).map_err(|source| {
        RecordError::Io {
            path: destination.display().to_string(),
            source,
        }
    })
}
