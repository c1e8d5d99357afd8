//! Campaign workspace: one fresh root directory with a subdirectory per
//! benchmark. A root that already exists is never reused.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::{atomic_write_bytes, ensure_dir};

pub const MANIFEST_FILE: &str = "campaign.json";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("{} directory exists. Please rename and try again.", .0.display())]
    AlreadyExists(PathBuf),

    #[error("benchmark '{0}' has no directory in this workspace")]
    UnknownBenchmark(String),

    #[error("Failed to write workspace path '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl WorkspaceError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    benchmarks: BTreeSet<String>,
}

impl Workspace {
    /// Create `root` and one directory per distinct benchmark name.
    ///
    /// Fails with [`WorkspaceError::AlreadyExists`] if `root` is present in any
    /// form. Any later failure leaves the partial tree on disk; it is not
    /// cleaned up or resumed.
    pub fn initialize(root: &Path, benchmark_names: &[String]) -> Result<Self, WorkspaceError> {
        if root.exists() {
            return Err(WorkspaceError::AlreadyExists(root.to_path_buf()));
        }
        if let Some(parent) = root.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent).map_err(|e| WorkspaceError::io(parent, e))?;
        }
        match fs::create_dir(root) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(WorkspaceError::AlreadyExists(root.to_path_buf()))
            }
            Err(e) => return Err(WorkspaceError::io(root, e)),
        }
        let root = root
            .canonicalize()
            .map_err(|e| WorkspaceError::io(root, e))?;

        let mut benchmarks = BTreeSet::new();
        for name in benchmark_names {
            if !benchmarks.insert(name.clone()) {
                continue;
            }
            let dir = root.join(name);
            fs::create_dir(&dir).map_err(|e| WorkspaceError::io(&dir, e))?;
            debug!(dir = %dir.display(), "Created benchmark directory");
        }
        info!(
            root = %root.display(),
            benchmarks = benchmarks.len(),
            "Initialized workspace"
        );
        Ok(Self { root, benchmarks })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn benchmark_dir(&self, benchmark: &str) -> Result<PathBuf, WorkspaceError> {
        if !self.benchmarks.contains(benchmark) {
            return Err(WorkspaceError::UnknownBenchmark(benchmark.to_string()));
        }
        Ok(self.root.join(benchmark))
    }

    pub fn write_manifest(&self, manifest: &Value) -> Result<PathBuf, WorkspaceError> {
        let path = self.root.join(MANIFEST_FILE);
        let bytes = serde_json::to_vec_pretty(manifest)
            .map_err(|e| WorkspaceError::io(&path, e.into()))?;
        atomic_write_bytes(&path, &bytes).map_err(|e| WorkspaceError::io(&path, e))?;
        Ok(path)
    }
}
