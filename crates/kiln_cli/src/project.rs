//! Project discovery and configuration loading shared by the commands.

use std::path::{Path, PathBuf};

use kiln_config::{KilnConfig, CONFIG_FILE};

use crate::GlobalArgs;

/// A located project and its configuration.
pub struct Project {
    /// Directory relative config paths resolve against.
    pub dir: PathBuf,
    /// The loaded configuration.
    pub config: KilnConfig,
}

/// Walks up from `start` looking for the nearest directory containing `kiln.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Locates the project and loads its configuration.
///
/// With `--config <file>` that file is loaded and its directory is the
/// project directory; `--config <dir>` names the project directory. Otherwise
/// the nearest ancestor of the current directory holding `kiln.toml` is used,
/// falling back to the current directory with default settings.
pub fn load_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            let content = std::fs::read_to_string(&p)?;
            let dir = p
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            return Ok(Project {
                dir,
                config: kiln_config::load_config_from_str(&content)?,
            });
        }
        return Ok(Project {
            config: kiln_config::load_config(&p)?,
            dir: p,
        });
    }

    let cwd = std::env::current_dir()?;
    let dir = find_project_root(&cwd).unwrap_or(cwd);
    let config = kiln_config::load_config_or_default(&dir)?;
    tracing::debug!(project = %dir.display(), "loaded configuration");
    Ok(Project { dir, config })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: false,
            verbose: false,
            config,
        }
    }

    #[test]
    fn finds_root_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        let nested = dir.path().join("contracts/token");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_project_root(&nested), Some(dir.path().to_path_buf()));
    }

    #[test]
    fn no_root_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        // An ancestor of the temp dir could hold a kiln.toml; only check we
        // never report a directory inside the temp tree.
        if let Some(found) = find_project_root(&nested) {
            assert!(!found.starts_with(dir.path()));
        }
    }

    #[test]
    fn explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[compiler]\nbinary = \"solc-0.4.21\"\n").unwrap();

        let project = load_project(&global(Some(path.to_string_lossy().into_owned()))).unwrap();
        assert_eq!(project.dir, dir.path());
        assert_eq!(project.config.compiler.binary, "solc-0.4.21");
    }

    #[test]
    fn explicit_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[cache]\nscratch_dir = \"tmp\"\n").unwrap();

        let project =
            load_project(&global(Some(dir.path().to_string_lossy().into_owned()))).unwrap();
        assert_eq!(project.config.cache.scratch_dir, "tmp");
    }

    #[test]
    fn explicit_config_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiln.toml");
        std::fs::write(&path, "[compiler]\nbinary = \"\"\n").unwrap();
        assert!(load_project(&global(Some(path.to_string_lossy().into_owned()))).is_err());
    }
}
