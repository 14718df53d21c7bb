//! Transitive include resolution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use kiln_common::Language;

use crate::error::ResolveError;
use crate::include_map::{IncludeMap, IncludedFile, ResolvedBundle, SourceNames};
use crate::scan;
use crate::source_file::SourceFile;

/// Discovers every file an entry file transitively imports.
///
/// Import paths starting with `./` or `../` resolve against the importing
/// file's directory only. Other paths try the importing file's directory
/// first, then each search path in order.
#[derive(Debug, Clone)]
pub struct IncludeResolver {
    language: Language,
    search_paths: Vec<PathBuf>,
}

impl IncludeResolver {
    /// Creates a resolver for the given language with no search paths.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            search_paths: Vec::new(),
        }
    }

    /// Adds search paths consulted for non-relative imports.
    pub fn with_search_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.search_paths.extend(paths);
        self
    }

    /// Resolves the entry file and everything it imports into a bundle.
    pub fn resolve(&self, entry: &Path) -> Result<ResolvedBundle, ResolveError> {
        let entry_dir = entry
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut walk = Walk {
            resolver: self,
            display_root: canonical(&entry_dir),
            visited: HashMap::new(),
            origins: HashMap::new(),
            includes: IncludeMap::new(),
            names: SourceNames::new(),
        };
        let entry_key = walk.visit(entry)?;

        tracing::debug!(
            entry = %entry.display(),
            files = walk.includes.len(),
            "resolved includes"
        );

        Ok(ResolvedBundle {
            entry: entry_key,
            includes: walk.includes,
            names: walk.names,
        })
    }

    fn locate(&self, import: &str, from_dir: &Path) -> Option<PathBuf> {
        let path = Path::new(import);
        if path.is_absolute() {
            return path.is_file().then(|| path.to_path_buf());
        }

        let local = from_dir.join(path);
        if local.is_file() {
            return Some(local);
        }
        if import.starts_with("./") || import.starts_with("../") {
            return None;
        }

        self.search_paths
            .iter()
            .map(|root| root.join(path))
            .find(|candidate| candidate.is_file())
    }
}

/// State for a single resolution walk.
struct Walk<'a> {
    resolver: &'a IncludeResolver,
    display_root: PathBuf,
    /// Canonical path to include key, for every file entered so far.
    visited: HashMap<PathBuf, String>,
    /// Include key to the first path that produced it.
    origins: HashMap<String, PathBuf>,
    includes: IncludeMap,
    names: SourceNames,
}

impl Walk<'_> {
    fn visit(&mut self, path: &Path) -> Result<String, ResolveError> {
        let canonical_path = canonical(path);
        if let Some(key) = self.visited.get(&canonical_path) {
            return Ok(key.clone());
        }

        let file = SourceFile::read(path)?;
        let key = file.include_key(self.resolver.language);
        // Registered before recursing so import cycles terminate.
        self.visited.insert(canonical_path.clone(), key.clone());

        let text = file.text()?;
        let from_dir = path.parent().unwrap_or_else(|| Path::new("."));

        let mut replacements = Vec::new();
        for import in scan::scan_imports(text) {
            let dep = self
                .resolver
                .locate(&import.path, from_dir)
                .ok_or_else(|| ResolveError::NotFound {
                    import: import.path.clone(),
                    from: path.to_path_buf(),
                })?;
            let dep_key = self.visit(&dep)?;
            replacements.push((import.range, dep_key));
        }

        let script = scan::rewrite(text, &replacements);

        if let Some(existing) = self.includes.get(&key) {
            if existing.script != script {
                let first = self.origins.get(&key).cloned().unwrap_or_default();
                return Err(ResolveError::Conflict {
                    key,
                    first,
                    second: path.to_path_buf(),
                });
            }
            return Ok(key);
        }

        tracing::trace!(path = %path.display(), %key, "included");
        self.names.insert(&key, self.display_path(&canonical_path));
        self.origins.insert(key.clone(), path.to_path_buf());
        self.includes.insert(
            key.clone(),
            IncludedFile {
                object_names: scan::scan_declarations(text),
                script,
            },
        );
        Ok(key)
    }

    fn display_path(&self, canonical_path: &Path) -> PathBuf {
        canonical_path
            .strip_prefix(&self.display_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| canonical_path.to_path_buf())
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_common::ContentDigest;

    const SIMPLE: &str = "pragma solidity ^0.4.0;

contract c {
    function f() {
        uint8[5] memory foo3 = [1, 1, 1, 1, 1];
    }
}";

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn resolver() -> IncludeResolver {
        IncludeResolver::new(Language::Solidity)
    }

    #[test]
    fn single_file_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "simpleContract.sol", SIMPLE);

        let bundle = resolver().resolve(&entry).unwrap();
        let expected_key = ContentDigest::from_bytes(SIMPLE.as_bytes()).file_name(Language::Solidity);

        assert_eq!(bundle.entry, expected_key);
        assert_eq!(bundle.includes.len(), 1);
        let file = &bundle.includes[&expected_key];
        assert_eq!(file.object_names, vec!["c"]);
        assert_eq!(file.script, SIMPLE);
        assert_eq!(
            bundle.names.get(&expected_key),
            Some(&PathBuf::from("simpleContract.sol"))
        );
    }

    #[test]
    fn imports_are_rewritten_to_keys() {
        let dir = tempfile::tempdir().unwrap();
        let owned = "contract Owned {}";
        write(dir.path(), "lib/Owned.sol", owned);
        let entry = write(
            dir.path(),
            "Token.sol",
            "import \"./lib/Owned.sol\";\ncontract Token is Owned {}",
        );

        let bundle = resolver().resolve(&entry).unwrap();
        let owned_key = ContentDigest::from_bytes(owned.as_bytes()).file_name(Language::Solidity);

        assert_eq!(bundle.includes.len(), 2);
        let token = &bundle.includes[&bundle.entry];
        assert_eq!(
            token.script,
            format!("import \"{owned_key}\";\ncontract Token is Owned {{}}")
        );
        assert_eq!(token.object_names, vec!["Token"]);
        assert_eq!(bundle.includes[&owned_key].object_names, vec!["Owned"]);
        assert_eq!(
            bundle.names.get(&owned_key),
            Some(&Path::new("lib").join("Owned.sol"))
        );
    }

    #[test]
    fn entry_key_is_digest_of_raw_bytes_even_with_imports() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "A.sol", "contract A {}");
        let raw = "import \"./A.sol\";\ncontract B {}";
        let entry = write(dir.path(), "B.sol", raw);

        let bundle = resolver().resolve(&entry).unwrap();
        assert_eq!(
            bundle.entry,
            ContentDigest::from_bytes(raw.as_bytes()).file_name(Language::Solidity)
        );
    }

    #[test]
    fn identical_files_collapse() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/Same.sol", "library Same {}");
        write(dir.path(), "b/Same.sol", "library Same {}");
        let entry = write(
            dir.path(),
            "Main.sol",
            "import \"./a/Same.sol\";\nimport \"./b/Same.sol\";\ncontract Main {}",
        );

        let bundle = resolver().resolve(&entry).unwrap();
        assert_eq!(bundle.includes.len(), 2);
    }

    #[test]
    fn cyclic_imports_terminate() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "A.sol", "import \"./B.sol\";\ncontract A {}");
        let entry = write(dir.path(), "B.sol", "import \"./A.sol\";\ncontract B {}");

        let bundle = resolver().resolve(&entry).unwrap();
        assert_eq!(bundle.includes.len(), 2);
        let b = &bundle.includes[&bundle.entry];
        let a_key = b.script.split('"').nth(1).unwrap().to_string();
        assert!(bundle.includes[&a_key].script.contains(&bundle.entry));
    }

    #[test]
    fn search_path_lookup() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "vendor/math/SafeMath.sol", "library SafeMath {}");
        let entry = write(
            dir.path(),
            "src/Token.sol",
            "import \"math/SafeMath.sol\";\ncontract Token {}",
        );

        let bundle = resolver()
            .with_search_paths([dir.path().join("vendor")])
            .resolve(&entry)
            .unwrap();
        assert_eq!(bundle.includes.len(), 2);
    }

    #[test]
    fn relative_import_skips_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "vendor/X.sol", "contract X {}");
        let entry = write(dir.path(), "src/Main.sol", "import \"./X.sol\";");

        let err = resolver()
            .with_search_paths([dir.path().join("vendor")])
            .resolve(&entry)
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { ref import, .. } if import == "./X.sol"));
    }

    #[test]
    fn missing_import_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "Main.sol", "import \"./Gone.sol\";\ncontract Main {}");

        let err = resolver().resolve(&entry).unwrap_err();
        match err {
            ResolveError::NotFound { import, from } => {
                assert_eq!(import, "./Gone.sol");
                assert_eq!(from, entry);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn missing_entry_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolver().resolve(&dir.path().join("Nope.sol")).unwrap_err();
        assert!(matches!(err, ResolveError::Read { .. }));
    }

    #[test]
    fn same_bytes_different_targets_conflict() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/Dep.sol", "contract DepA {}");
        write(dir.path(), "b/Dep.sol", "contract DepB {}");
        let shim = "import \"./Dep.sol\";";
        write(dir.path(), "a/Shim.sol", shim);
        write(dir.path(), "b/Shim.sol", shim);
        let entry = write(
            dir.path(),
            "Main.sol",
            "import \"./a/Shim.sol\";\nimport \"./b/Shim.sol\";",
        );

        let err = resolver().resolve(&entry).unwrap_err();
        assert!(matches!(err, ResolveError::Conflict { .. }));
    }

    #[test]
    fn resolution_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "A.sol", "contract A {}");
        write(dir.path(), "B.sol", "contract B {}");
        let entry = write(
            dir.path(),
            "Main.sol",
            "import \"./B.sol\";\nimport \"./A.sol\";\ncontract Main {}",
        );

        let first = resolver().resolve(&entry).unwrap();
        let second = resolver().resolve(&entry).unwrap();
        assert_eq!(
            serde_json::to_string(&first.includes).unwrap(),
            serde_json::to_string(&second.includes).unwrap()
        );
    }
}
