//! Error types for include resolution.

use std::path::PathBuf;

/// Errors that can occur while resolving an entry file's includes.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// An import directive names a file that exists nowhere on the search path.
    #[error("import \"{import}\" in {from} not found")]
    NotFound {
        /// The path literal as written in the directive.
        import: String,
        /// The file containing the directive.
        from: PathBuf,
    },

    /// A source file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A source file is not valid UTF-8 and cannot be scanned.
    #[error("{path} is not valid UTF-8")]
    Encoding {
        /// The offending file.
        path: PathBuf,
    },

    /// Two files share identical bytes but their imports resolve to different
    /// dependencies, so they cannot share one include key.
    #[error("{first} and {second} have identical content ({key}) but import different files")]
    Conflict {
        /// The include key both files map to.
        key: String,
        /// The file seen first.
        first: PathBuf,
        /// The file seen second.
        second: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = ResolveError::NotFound {
            import: "./missing.sol".to_string(),
            from: PathBuf::from("contracts/Main.sol"),
        };
        assert_eq!(
            err.to_string(),
            "import \"./missing.sol\" in contracts/Main.sol not found"
        );
    }

    #[test]
    fn read_display() {
        let err = ResolveError::Read {
            path: PathBuf::from("Main.sol"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to read Main.sol"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn conflict_display() {
        let err = ResolveError::Conflict {
            key: "ab.sol".to_string(),
            first: PathBuf::from("a/X.sol"),
            second: PathBuf::from("b/X.sol"),
        };
        let msg = err.to_string();
        assert!(msg.contains("a/X.sol"));
        assert!(msg.contains("b/X.sol"));
        assert!(msg.contains("ab.sol"));
    }
}
