//! Benchmark catalog: the ordered list of benchmarks a campaign can run,
//! given which suite archives are actually present.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::config::CampaignConfig;
use crate::spec::Suite;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// Both lists empty, or every listed benchmark belongs to a suite whose
    /// archive could not be found.
    #[error(
        "No benchmarks to run (dacapo path: {dacapo}, specjvm path: {specjvm}, benchmark list: [{benchmarks}])"
    )]
    NoRunnableBenchmarks {
        dacapo: String,
        specjvm: String,
        benchmarks: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub suite: Suite,
}

/// Benchmarks the campaign will actually run, in sweep order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BenchmarkCatalog {
    entries: Vec<CatalogEntry>,
    pub dacapo_archive: Option<PathBuf>,
    pub specjvm_archive: Option<PathBuf>,
}

impl BenchmarkCatalog {
    /// Merge both lists without checking archives.
    ///
    /// DaCapo entries come first. A name listed in both suites is kept once,
    /// as DaCapo, with a warning.
    pub fn from_lists(dacapo: &[String], specjvm: &[String]) -> Self {
        let mut seen = BTreeSet::new();
        let mut entries = Vec::with_capacity(dacapo.len() + specjvm.len());
        for name in dacapo {
            if !seen.insert(name.as_str()) {
                warn!(benchmark = %name, "Benchmark listed twice in dacapo_benchmarks, ignoring duplicate");
                continue;
            }
            if specjvm.contains(name) {
                warn!(
                    benchmark = %name,
                    "Benchmark found in both dacapo and specjvm. Defaulting to DaCapo."
                );
            }
            entries.push(CatalogEntry {
                name: name.clone(),
                suite: Suite::DaCapo,
            });
        }
        for name in specjvm {
            if !seen.insert(name.as_str()) {
                if !dacapo.contains(name) {
                    warn!(benchmark = %name, "Benchmark listed twice in specjvm_benchmarks, ignoring duplicate");
                }
                continue;
            }
            entries.push(CatalogEntry {
                name: name.clone(),
                suite: Suite::SpecJvm,
            });
        }
        Self {
            entries,
            dacapo_archive: None,
            specjvm_archive: None,
        }
    }

    /// Build the runnable catalog from a loaded config.
    ///
    /// A suite whose archive is missing is dropped for the whole campaign.
    /// Archive paths are made absolute because each run executes from its
    /// benchmark directory.
    pub fn resolve(config: &CampaignConfig) -> Result<Self, CatalogError> {
        let mut catalog = Self::from_lists(&config.dacapo_benchmarks, &config.specjvm_benchmarks);
        catalog.dacapo_archive = locate_archive(Suite::DaCapo, config.dacapo_path.as_deref());
        catalog.specjvm_archive = locate_archive(Suite::SpecJvm, config.specjvm_path.as_deref());

        let dacapo_ok = catalog.dacapo_archive.is_some();
        let specjvm_ok = catalog.specjvm_archive.is_some();
        catalog.entries.retain(|entry| match entry.suite {
            Suite::DaCapo => dacapo_ok,
            Suite::SpecJvm => specjvm_ok,
        });

        if catalog.entries.is_empty() {
            let all: Vec<&str> = config
                .dacapo_benchmarks
                .iter()
                .chain(config.specjvm_benchmarks.iter())
                .map(|s| s.as_str())
                .collect();
            return Err(CatalogError::NoRunnableBenchmarks {
                dacapo: display_opt(config.dacapo_path.as_deref()),
                specjvm: display_opt(config.specjvm_path.as_deref()),
                benchmarks: all.join(", "),
            });
        }
        Ok(catalog)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn locate_archive(suite: Suite, path: Option<&Path>) -> Option<PathBuf> {
    let Some(path) = path else {
        warn!(suite = suite.as_str(), "No archive path configured");
        return None;
    };
    if !path.is_file() {
        warn!(
            suite = suite.as_str(),
            path = %path.display(),
            "Can not find benchmark archive"
        );
        return None;
    }
    path.canonicalize().ok()
}

fn display_opt(path: Option<&Path>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "None".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn temp_root(tag: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!(
            "gcbench_catalog_{}_{}_{}",
            tag,
            std::process::id(),
            Utc::now().timestamp_micros()
        ));
        fs::create_dir_all(&root).expect("temp dir");
        root
    }

    #[test]
    fn dacapo_entries_precede_specjvm_in_listed_order() {
        let catalog = BenchmarkCatalog::from_lists(
            &names(&["luindex", "avrora"]),
            &names(&["compress", "derby"]),
        );
        let got: Vec<(&str, Suite)> = catalog
            .entries()
            .iter()
            .map(|e| (e.name.as_str(), e.suite))
            .collect();
        assert_eq!(
            got,
            vec![
                ("luindex", Suite::DaCapo),
                ("avrora", Suite::DaCapo),
                ("compress", Suite::SpecJvm),
                ("derby", Suite::SpecJvm),
            ]
        );
    }

    #[test]
    fn collision_defaults_to_dacapo_once() {
        let catalog =
            BenchmarkCatalog::from_lists(&names(&["sunflow"]), &names(&["compress", "sunflow"]));
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].name, "sunflow");
        assert_eq!(catalog.entries()[0].suite, Suite::DaCapo);
        assert_eq!(catalog.entries()[1].name, "compress");
    }

    #[test]
    fn missing_archive_drops_its_suite() {
        let root = temp_root("drop");
        let jar = root.join("dacapo.jar");
        fs::write(&jar, b"jar").expect("write jar");
        let config = CampaignConfig {
            dacapo_benchmarks: names(&["luindex"]),
            specjvm_benchmarks: names(&["compress"]),
            dacapo_path: Some(jar.clone()),
            specjvm_path: Some(root.join("missing.jar")),
        };
        let catalog = BenchmarkCatalog::resolve(&config).expect("dacapo still runnable");
        assert_eq!(catalog.names(), vec!["luindex"]);
        assert_eq!(
            catalog.dacapo_archive,
            Some(jar.canonicalize().expect("canonical"))
        );
        assert!(catalog.specjvm_archive.is_none());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn empty_catalogs_are_not_runnable() {
        let err = BenchmarkCatalog::resolve(&CampaignConfig::default()).expect_err("nothing to run");
        assert!(err.to_string().contains("No benchmarks to run"));
    }

    #[test]
    fn all_archives_missing_is_not_runnable() {
        let config = CampaignConfig {
            dacapo_benchmarks: names(&["luindex"]),
            specjvm_benchmarks: vec![],
            dacapo_path: Some(PathBuf::from("/nonexistent/dacapo.jar")),
            specjvm_path: None,
        };
        let err = BenchmarkCatalog::resolve(&config).expect_err("no archive");
        let msg = err.to_string();
        assert!(msg.contains("/nonexistent/dacapo.jar"), "unexpected: {}", msg);
        assert!(msg.contains("luindex"), "unexpected: {}", msg);
    }
}
