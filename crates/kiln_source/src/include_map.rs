//! The content-addressed source bundle produced by include resolution.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A single file in a source bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludedFile {
    /// Names of the objects (contracts, libraries, interfaces) declared in
    /// this file, in declaration order.
    pub object_names: Vec<String>,
    /// The file's source text with import paths rewritten to include keys.
    pub script: String,
}

/// Include key (`"<hex digest>.<ext>"`) to file, ordered by key.
///
/// Keys derive from file content only, so identical files at different paths
/// collapse into one entry.
pub type IncludeMap = BTreeMap<String, IncludedFile>;

/// Maps include keys back to the paths the files were read from.
///
/// The compiler only ever sees digest-named files, so its diagnostics mention
/// include keys. [`SourceNames::restore`] turns those back into the paths a
/// user recognizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceNames {
    names: BTreeMap<String, PathBuf>,
}

impl SourceNames {
    /// Creates an empty name table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the display path for a key. The first path recorded wins.
    pub fn insert(&mut self, key: &str, path: PathBuf) {
        self.names.entry(key.to_string()).or_insert(path);
    }

    /// Returns the display path for a key.
    pub fn get(&self, key: &str) -> Option<&PathBuf> {
        self.names.get(key)
    }

    /// Replaces every include key in `text` with its display path.
    pub fn restore(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (key, path) in &self.names {
            if out.contains(key.as_str()) {
                out = out.replace(key.as_str(), &path.display().to_string());
            }
        }
        out
    }
}

/// The result of resolving an entry file.
#[derive(Debug, Clone)]
pub struct ResolvedBundle {
    /// Include key of the entry file.
    pub entry: String,
    /// Every file reachable from the entry, keyed by include key.
    pub includes: IncludeMap,
    /// Display paths for the include keys.
    pub names: SourceNames,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_replaces_keys() {
        let mut names = SourceNames::new();
        names.insert("aaaa.sol", PathBuf::from("Token.sol"));
        names.insert("bbbb.sol", PathBuf::from("lib/Owned.sol"));
        let text = "aaaa.sol:3:5: Warning: unused\nbbbb.sol:1:1: Warning: pragma";
        assert_eq!(
            names.restore(text),
            "Token.sol:3:5: Warning: unused\nlib/Owned.sol:1:1: Warning: pragma"
        );
    }

    #[test]
    fn restore_leaves_unknown_text() {
        let names = SourceNames::new();
        assert_eq!(names.restore("nothing to see"), "nothing to see");
    }

    #[test]
    fn first_insert_wins() {
        let mut names = SourceNames::new();
        names.insert("k.sol", PathBuf::from("first.sol"));
        names.insert("k.sol", PathBuf::from("second.sol"));
        assert_eq!(names.get("k.sol"), Some(&PathBuf::from("first.sol")));
    }

    #[test]
    fn include_map_iterates_sorted() {
        let mut map = IncludeMap::new();
        for key in ["c.sol", "a.sol", "b.sol"] {
            map.insert(
                key.to_string(),
                IncludedFile {
                    object_names: vec![],
                    script: String::new(),
                },
            );
        }
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["a.sol", "b.sol", "c.sol"]);
    }
}
