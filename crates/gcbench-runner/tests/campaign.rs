use chrono::Utc;
use gcbench_runner::error::{EXIT_INVALID_CONFIG, EXIT_NO_BENCHMARKS, EXIT_WORKSPACE_EXISTS};
use gcbench_runner::{
    run_campaign, run_campaign_with, CampaignConfig, CampaignOptions, GcAlgorithm, HeuristicSelector, Suite,
};
use std::fs;
use std::path::{Path, PathBuf};

struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "gcbench_campaign_{}_{}_{}",
            tag,
            std::process::id(),
            Utc::now().timestamp_micros()
        ));
        fs::create_dir_all(&root).expect("sandbox root");
        Self { root }
    }

    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    fn options(&self, runtime: &Path, gc_algorithm: GcAlgorithm) -> CampaignOptions {
        CampaignOptions {
            output: self.root.join("results.csv"),
            runtime: runtime.to_path_buf(),
            workdir: self.root.join("WORK"),
            gc_algorithm,
            heuristic: HeuristicSelector::All,
            iterations: 3,
            parallel_gc_threads: 2,
            conc_gc_threads: 3,
            app_threads: 3,
            min_heap: Some("2g".to_string()),
            max_heap: Some("2g".to_string()),
            print_gc_details: false,
            drop_warmup: true,
            dry_run: true,
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn dacapo_config(benchmarks: &[&str], jar: &Path) -> CampaignConfig {
    CampaignConfig {
        dacapo_benchmarks: benchmarks.iter().map(|s| s.to_string()).collect(),
        specjvm_benchmarks: vec![],
        dacapo_path: Some(jar.to_path_buf()),
        specjvm_path: None,
    }
}

#[test]
fn conc_threads_below_two_exit_2_before_workspace_exists() {
    let sb = Sandbox::new("conc");
    let java = sb.file("jdk/bin/java", "");
    let jar = sb.file("dacapo.jar", "jar");
    let mut opts = sb.options(&java, GcAlgorithm::Shenandoah);
    opts.conc_gc_threads = 1;

    let err = run_campaign(&opts, &dacapo_config(&["luindex"], &jar)).expect_err("must fail");
    assert_eq!(err.exit_code(), EXIT_INVALID_CONFIG);
    assert!(!opts.workdir.exists());
    assert!(!opts.output.exists());
}

#[test]
fn empty_catalogs_exit_44() {
    let sb = Sandbox::new("empty");
    let java = sb.file("jdk/bin/java", "");
    let opts = sb.options(&java, GcAlgorithm::G1);

    let err = run_campaign(&opts, &CampaignConfig::default()).expect_err("nothing to run");
    assert_eq!(err.exit_code(), EXIT_NO_BENCHMARKS);
    assert!(!opts.workdir.exists());
}

#[test]
fn missing_archives_exit_44() {
    let sb = Sandbox::new("noarchive");
    let java = sb.file("jdk/bin/java", "");
    let opts = sb.options(&java, GcAlgorithm::G1);
    let config = dacapo_config(&["luindex"], &sb.root.join("absent.jar"));

    let err = run_campaign(&opts, &config).expect_err("no archive");
    assert_eq!(err.exit_code(), EXIT_NO_BENCHMARKS);
}

#[test]
fn existing_workspace_exit_10() {
    let sb = Sandbox::new("exists");
    let java = sb.file("jdk/bin/java", "");
    let jar = sb.file("dacapo.jar", "jar");
    let opts = sb.options(&java, GcAlgorithm::G1);
    fs::create_dir_all(&opts.workdir).expect("pre-existing WORK");

    let err = run_campaign(&opts, &dacapo_config(&["luindex"], &jar)).expect_err("exists");
    assert_eq!(err.exit_code(), EXIT_WORKSPACE_EXISTS);
    assert!(!opts.output.exists());
}

#[test]
fn dry_run_g1_all_reports_every_command_and_spawns_nothing() {
    let sb = Sandbox::new("dry");
    // not executable: any attempt to spawn it would fail the campaign
    let java = sb.file("jdk/bin/java", "not a program");
    let jar = sb.file("dacapo.jar", "jar");
    let opts = sb.options(&java, GcAlgorithm::G1);

    let summary = run_campaign(&opts, &dacapo_config(&["luindex"], &jar)).expect("dry run");
    // conc 2..=3, app 1..3, heuristic collapsed to a single NONE
    assert_eq!(summary.total_runs, 4);
    assert_eq!(summary.executed_runs, 0);
    assert_eq!(summary.failed_runs, 0);
    assert_eq!(summary.commands.len(), 4);
    assert!(summary.commands.iter().all(|c| c.contains("-XX:+UseG1GC")));
    assert!(summary.commands.iter().all(|c| !c.contains("Heuristics")));
    assert!(summary.records.iter().all(|r| r.heuristic.is_none()));
    assert!(summary
        .records
        .iter()
        .all(|r| r.effective_iteration_count == 2 && r.raw_output_samples.is_empty()));

    let bench_dir = summary.workspace.join("luindex");
    assert!(bench_dir.is_dir());
    assert_eq!(fs::read_dir(&bench_dir).expect("bench dir").count(), 0);
    assert!(summary.workspace.join("campaign.json").is_file());

    let csv = fs::read_to_string(&opts.output).expect("csv");
    assert_eq!(csv.lines().count(), 5);
    assert!(csv.lines().skip(1).all(|l| l.starts_with("\"luindex\",\"g1\",\"None\"")));
}

#[test]
fn benchmark_name_escaping_the_workspace_exits_2() {
    let sb = Sandbox::new("escape");
    let java = sb.file("jdk/bin/java", "");
    let jar = sb.file("dacapo.jar", "jar");
    let opts = sb.options(&java, GcAlgorithm::G1);

    let err = run_campaign(&opts, &dacapo_config(&["../escaped"], &jar)).expect_err("escape");
    assert_eq!(err.exit_code(), EXIT_INVALID_CONFIG);
    assert!(!sb.root.join("escaped").exists());
    assert!(!opts.workdir.exists());
    assert!(!opts.output.exists());
}

#[test]
fn commands_are_reported_in_sweep_order_before_each_run() {
    let sb = Sandbox::new("report");
    let java = sb.file("jdk/bin/java", "not a program");
    let jar = sb.file("dacapo.jar", "jar");
    let opts = sb.options(&java, GcAlgorithm::G1);

    let mut reported = Vec::new();
    let summary = run_campaign_with(&opts, &dacapo_config(&["luindex"], &jar), |cmd| {
        reported.push(cmd.to_string())
    })
    .expect("dry run");
    assert_eq!(reported.len(), 4);
    assert_eq!(reported, summary.commands);
    assert!(reported[0].contains("-XX:ConcGCThreads=2"));
    assert!(reported[3].contains("-XX:ConcGCThreads=3"));
}

#[test]
fn collision_between_suites_runs_as_dacapo() {
    let sb = Sandbox::new("collide");
    let java = sb.file("jdk/bin/java", "");
    let dacapo = sb.file("dacapo.jar", "jar");
    let specjvm = sb.file("specjvm2008/SPECjvm2008.jar", "jar");
    let mut opts = sb.options(&java, GcAlgorithm::Default);
    opts.conc_gc_threads = 2;
    opts.app_threads = 2;
    let config = CampaignConfig {
        dacapo_benchmarks: vec!["sunflow".to_string()],
        specjvm_benchmarks: vec!["sunflow".to_string(), "compress".to_string()],
        dacapo_path: Some(dacapo),
        specjvm_path: Some(specjvm),
    };

    let summary = run_campaign(&opts, &config).expect("dry run");
    assert_eq!(summary.total_runs, 2);
    assert!(summary.commands[0].contains("dacapo.jar sunflow -n3"));
    assert!(summary.commands[1].contains("-ikv -ict -bt 1 --iterations 200 compress"));
    let catalog = gcbench_runner::BenchmarkCatalog::resolve(&config).expect("catalog");
    assert_eq!(catalog.entries()[0].suite, Suite::DaCapo);
}

#[cfg(unix)]
#[test]
fn live_runs_capture_output_and_record_failures() {
    use std::os::unix::fs::PermissionsExt;

    let sb = Sandbox::new("live");
    let script = "#!/bin/sh\n\
        echo \"===== DaCapo 9.12 luindex completed warmup 1 in 900 msec =====\" 1>&2\n\
        echo \"===== DaCapo 9.12 luindex completed warmup 2 in 800 msec =====\" 1>&2\n\
        echo \"===== DaCapo 9.12 luindex PASSED in 700 msec =====\" 1>&2\n\
        pwd\n\
        case \"$*\" in *ConcGCThreads=3*) exit 1 ;; esac\n\
        exit 0\n";
    let java = sb.file("jdk/bin/java", script);
    let mut perms = fs::metadata(&java).expect("meta").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&java, perms).expect("chmod");
    let jar = sb.file("dacapo.jar", "jar");

    let mut opts = sb.options(&java, GcAlgorithm::Shenandoah);
    opts.heuristic = HeuristicSelector::Named("lazy".to_string());
    opts.app_threads = 2;
    opts.dry_run = false;
    opts.print_gc_details = true;

    let summary = run_campaign(&opts, &dacapo_config(&["luindex"], &jar)).expect("live run");
    assert_eq!(summary.total_runs, 2);
    assert_eq!(summary.executed_runs, 2);
    assert_eq!(summary.failed_runs, 1);
    for rec in &summary.records {
        assert_eq!(rec.heuristic.as_deref(), Some("lazy"));
        assert_eq!(rec.raw_output_samples, vec![800.0, 700.0]);
        assert_eq!(rec.effective_iteration_count, 2);
    }

    let bench_dir = summary.workspace.join("luindex");
    let capture = bench_dir.join("luindex-shenandoah-lazy-min2g-max2g-p2-c2-bt1-gc-output.txt");
    let text = fs::read_to_string(&capture).expect("capture file");
    assert!(text.contains("PASSED in 700 msec"));
    let reported = PathBuf::from(text.lines().next().expect("pwd line").trim());
    assert_eq!(
        reported.canonicalize().expect("pwd"),
        bench_dir.canonicalize().expect("bench dir")
    );
    assert!(bench_dir
        .join("luindex-shenandoah-lazy-min2g-max2g-p2-c3-bt1-gc-output.txt")
        .is_file());
    assert!(summary.commands[0]
        .contains("-Xloggc:luindex-shenandoah-lazy-min2g-max2g-p2-c2-bt1-gc.log"));

    let csv = fs::read_to_string(&opts.output).expect("csv");
    let rows: Vec<&str> = csv.lines().skip(1).collect();
    assert_eq!(
        rows,
        vec![
            "\"luindex\",\"shenandoah\",\"lazy\",\"2g\",\"2g\",2,2,2,\"800;700\"",
            "\"luindex\",\"shenandoah\",\"lazy\",\"2g\",\"2g\",2,3,2,\"800;700\"",
        ]
    );
}
