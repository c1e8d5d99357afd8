//! Sweep enumeration.
//!
//! Order is benchmark, then heuristic, then ascending ConcGCThreads, then
//! ascending application threads. Output files and dry-run listings depend on
//! this order, so it must not change between runs of the same campaign.

use crate::catalog::BenchmarkCatalog;
use crate::config::CampaignOptions;
use crate::spec::{
    Collector, GcAlgorithm, HeuristicSelector, RunSpec, PINNED_PARALLEL_GC_THREADS,
    SHENANDOAH_HEURISTICS,
};

/// Ranges and fixed values shared by every run in a sweep.
#[derive(Debug, Clone)]
pub struct SweepParams {
    pub gc_algorithm: GcAlgorithm,
    pub heuristic: HeuristicSelector,
    /// Inclusive upper bound, starting from 2.
    pub conc_thread_max: u32,
    /// Exclusive upper bound, starting from 1.
    pub app_thread_max: u32,
    pub iterations: u32,
    pub min_heap: Option<String>,
    pub max_heap: Option<String>,
    pub dry_run: bool,
}

impl From<&CampaignOptions> for SweepParams {
    fn from(opts: &CampaignOptions) -> Self {
        Self {
            gc_algorithm: opts.gc_algorithm,
            heuristic: opts.heuristic.clone(),
            conc_thread_max: opts.conc_gc_threads,
            app_thread_max: opts.app_threads,
            iterations: opts.iterations,
            min_heap: opts.min_heap.clone(),
            max_heap: opts.max_heap.clone(),
            dry_run: opts.dry_run,
        }
    }
}

/// Collectors swept per benchmark.
///
/// Only Shenandoah has heuristics; G1 and the default collector always get a
/// single entry no matter what was requested.
pub fn collectors_for(algorithm: GcAlgorithm, selector: &HeuristicSelector) -> Vec<Collector> {
    match algorithm {
        GcAlgorithm::Shenandoah => match selector {
            HeuristicSelector::All => SHENANDOAH_HEURISTICS
                .iter()
                .map(|h| Collector::Shenandoah {
                    heuristic: h.to_string(),
                })
                .collect(),
            HeuristicSelector::Named(name) => vec![Collector::Shenandoah {
                heuristic: name.clone(),
            }],
        },
        GcAlgorithm::G1 => vec![Collector::G1],
        GcAlgorithm::Default => vec![Collector::Default],
    }
}

pub fn expected_len(benchmarks: usize, params: &SweepParams) -> usize {
    let heuristics = collectors_for(params.gc_algorithm, &params.heuristic).len();
    let conc = params.conc_thread_max.saturating_sub(1) as usize;
    let app = params.app_thread_max.saturating_sub(1) as usize;
    benchmarks * heuristics * conc * app
}

pub fn generate(catalog: &BenchmarkCatalog, params: &SweepParams) -> Vec<RunSpec> {
    let collectors = collectors_for(params.gc_algorithm, &params.heuristic);
    let mut specs = Vec::with_capacity(expected_len(catalog.len(), params));
    for entry in catalog.entries() {
        for collector in &collectors {
            for conc in 2..=params.conc_thread_max {
                for app in 1..params.app_thread_max {
                    specs.push(RunSpec {
                        benchmark: entry.name.clone(),
                        suite: entry.suite,
                        collector: collector.clone(),
                        min_heap: params.min_heap.clone(),
                        max_heap: params.max_heap.clone(),
                        parallel_gc_threads: PINNED_PARALLEL_GC_THREADS,
                        conc_gc_threads: conc,
                        app_threads: app,
                        iterations: params.iterations,
                        dry_run: params.dry_run,
                    });
                }
            }
        }
    }
    specs
}
