//! Compile request construction.
//!
//! A [`CompileRequest`] is the complete, path-free description of one
//! compilation: the bundle of digest-keyed sources plus the compiler flags.
//! Its [`digest`](CompileRequest::digest) is the cache key.

use std::path::{Path, PathBuf};

use kiln_common::{ContentDigest, Language};
use kiln_source::{IncludeMap, IncludeResolver, SourceNames};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Everything a compiler needs to build one entry file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileRequest {
    /// Source language, derived from the entry file's extension.
    pub language: Language,
    /// Whether to run the optimizer.
    pub optimize: bool,
    /// Library link directives (`name:address` pairs), possibly empty.
    pub libraries: String,
    /// Include key of the compilation root.
    pub entry: String,
    /// Every source file reachable from the entry.
    pub includes: IncludeMap,
}

impl CompileRequest {
    /// The content digest identifying this request.
    ///
    /// Computed over a length-prefixed encoding of every field, so two
    /// requests share a digest exactly when they compile the same sources
    /// with the same flags. Source paths play no part.
    pub fn digest(&self) -> ContentDigest {
        let mut buf = Vec::new();
        push_field(&mut buf, self.language.tag().as_bytes());
        push_field(&mut buf, &[u8::from(self.optimize)]);
        push_field(&mut buf, self.libraries.as_bytes());
        push_field(&mut buf, self.entry.as_bytes());
        buf.extend_from_slice(&(self.includes.len() as u64).to_le_bytes());
        for (key, file) in &self.includes {
            push_field(&mut buf, key.as_bytes());
            buf.extend_from_slice(&(file.object_names.len() as u64).to_le_bytes());
            for name in &file.object_names {
                push_field(&mut buf, name.as_bytes());
            }
            push_field(&mut buf, file.script.as_bytes());
        }
        ContentDigest::from_bytes(&buf)
    }

    /// Serializes the request as JSON, the remote wire format.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Library directives normalized to a single space-separated line.
    pub fn libraries_arg(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .libraries
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|p| !p.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

fn push_field(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    buf.extend_from_slice(bytes);
}

/// A request together with the table that maps its include keys back to
/// source paths.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// The request to dispatch.
    pub request: CompileRequest,
    /// Display paths for the request's include keys.
    pub names: SourceNames,
}

/// Builds compile requests from entry files.
#[derive(Debug, Clone, Default)]
pub struct RequestBuilder {
    search_paths: Vec<PathBuf>,
}

impl RequestBuilder {
    /// Creates a builder with no import search paths.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds search paths for non-relative imports.
    pub fn with_search_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.search_paths.extend(paths);
        self
    }

    /// Resolves `entry` and assembles a request.
    pub fn prepare(
        &self,
        entry: &Path,
        libraries: &str,
        optimize: bool,
    ) -> Result<PreparedRequest, RequestError> {
        let language = Language::from_path(entry).ok_or_else(|| RequestError::UnsupportedLanguage {
            path: entry.to_path_buf(),
        })?;
        let bundle = IncludeResolver::new(language)
            .with_search_paths(self.search_paths.iter().cloned())
            .resolve(entry)?;

        Ok(PreparedRequest {
            request: CompileRequest {
                language,
                optimize,
                libraries: libraries.to_string(),
                entry: bundle.entry,
                includes: bundle.includes,
            },
            names: bundle.names,
        })
    }

    /// Resolves `entry` and returns only the request.
    pub fn create_request(
        &self,
        entry: &Path,
        libraries: &str,
        optimize: bool,
    ) -> Result<CompileRequest, RequestError> {
        self.prepare(entry, libraries, optimize).map(|p| p.request)
    }
}

/// Builds a request for `entry` with no extra search paths.
pub fn create_request(
    entry: &Path,
    libraries: &str,
    optimize: bool,
) -> Result<CompileRequest, RequestError> {
    RequestBuilder::new().create_request(entry, libraries, optimize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_source::ResolveError;
    use std::fs;

    const TOKEN: &str = "pragma solidity ^0.4.21;\ncontract c { function f() public {} }\n";

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn single_file_request() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "contractImport1.sol", TOKEN);

        let request = create_request(&entry, "", false).unwrap();
        let key = ContentDigest::from_bytes(TOKEN.as_bytes()).file_name(Language::Solidity);

        assert_eq!(request.language, Language::Solidity);
        assert_eq!(request.entry, key);
        assert_eq!(request.includes.len(), 1);
        assert_eq!(request.includes[&key].object_names, vec!["c"]);
        assert_eq!(request.includes[&key].script, TOKEN);
    }

    #[test]
    fn unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "main.vy", "x = 1");
        let err = create_request(&entry, "", false).unwrap_err();
        assert!(matches!(err, RequestError::UnsupportedLanguage { .. }));
    }

    #[test]
    fn missing_import_is_resolve_error() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "a.sol", "import \"./gone.sol\";\ncontract a {}\n");
        let err = create_request(&entry, "", false).unwrap_err();
        assert!(matches!(err, RequestError::Resolve(ResolveError::NotFound { .. })));
    }

    #[test]
    fn flags_copied_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "a.sol", TOKEN);
        let request = create_request(&entry, "L:0x1234", true).unwrap();
        assert!(request.optimize);
        assert_eq!(request.libraries, "L:0x1234");
    }

    #[test]
    fn identical_content_identical_request() {
        let one = tempfile::tempdir().unwrap();
        let two = tempfile::tempdir().unwrap();
        write(one.path(), "lib/Owned.sol", "contract Owned {}\n");
        write(two.path(), "lib/Owned.sol", "contract Owned {}\n");
        let main = "import \"./lib/Owned.sol\";\ncontract Main is Owned {}\n";
        let a = create_request(&write(one.path(), "Main.sol", main), "", false).unwrap();
        let b = create_request(&write(two.path(), "Other.sol", main), "", false).unwrap();

        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn digest_depends_on_flags() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "a.sol", TOKEN);
        let plain = create_request(&entry, "", false).unwrap();
        let optimized = create_request(&entry, "", true).unwrap();
        let linked = create_request(&entry, "L:0x1", false).unwrap();
        assert_ne!(plain.digest(), optimized.digest());
        assert_ne!(plain.digest(), linked.digest());
    }

    #[test]
    fn digest_depends_on_content() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "a.sol", TOKEN);
        let before = create_request(&entry, "", false).unwrap().digest();
        write(dir.path(), "a.sol", "contract d {}\n");
        let after = create_request(&entry, "", false).unwrap().digest();
        assert_ne!(before, after);
    }

    #[test]
    fn json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "a.sol", TOKEN);
        let request = create_request(&entry, "", true).unwrap();
        let json = request.to_json().unwrap();
        assert!(json.contains("\"language\":\"sol\""));
        let back: CompileRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn libraries_arg_normalized() {
        let request = CompileRequest {
            language: Language::Solidity,
            optimize: false,
            libraries: " A:0x1,B:0x2\n C:0x3 ".to_string(),
            entry: String::new(),
            includes: IncludeMap::new(),
        };
        assert_eq!(request.libraries_arg().as_deref(), Some("A:0x1 B:0x2 C:0x3"));

        let empty = CompileRequest {
            libraries: " , ".to_string(),
            ..request
        };
        assert_eq!(empty.libraries_arg(), None);
    }

    #[test]
    fn prepare_keeps_source_names() {
        let dir = tempfile::tempdir().unwrap();
        let entry = write(dir.path(), "Token.sol", TOKEN);
        let prepared = RequestBuilder::new().prepare(&entry, "", false).unwrap();
        let shown = prepared.names.get(&prepared.request.entry).unwrap();
        assert!(shown.ends_with("Token.sol"));
    }

    #[test]
    fn search_paths_used() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "vendor/Owned.sol", "contract Owned {}\n");
        let entry = write(
            dir.path(),
            "src/Main.sol",
            "import \"Owned.sol\";\ncontract Main is Owned {}\n",
        );
        let request = RequestBuilder::new()
            .with_search_paths([dir.path().join("vendor")])
            .create_request(&entry, "", false)
            .unwrap();
        assert_eq!(request.includes.len(), 2);
    }
}
