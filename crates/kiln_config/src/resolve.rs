//! Resolution of configured paths and durations against a project directory.

use crate::types::KilnConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

impl KilnConfig {
    /// The scratch cache root. Relative paths resolve against `project_dir`.
    pub fn scratch_root(&self, project_dir: &Path) -> PathBuf {
        resolve_path(project_dir, &self.cache.scratch_dir)
    }

    /// Import search roots, in configured order. Relative paths resolve
    /// against `project_dir`.
    pub fn search_roots(&self, project_dir: &Path) -> Vec<PathBuf> {
        self.resolve
            .search_paths
            .iter()
            .map(|p| resolve_path(project_dir, p))
            .collect()
    }

    /// Timeout for one local compiler run.
    pub fn compiler_timeout(&self) -> Duration {
        Duration::from_secs(self.compiler.timeout_secs)
    }

    /// Timeout for one remote call, if a remote service is configured.
    pub fn remote_timeout(&self) -> Option<Duration> {
        self.remote
            .as_ref()
            .map(|r| Duration::from_secs(r.timeout_secs))
    }
}

fn resolve_path(project_dir: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}
