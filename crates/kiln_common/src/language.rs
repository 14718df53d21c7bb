//! Source language detection from file extensions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A contract source language Kiln knows how to bundle and compile.
///
/// The language of a compile request is derived solely from the entry file's
/// extension. The serialized form is the short tag (`"sol"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    /// Solidity (`.sol`).
    #[serde(rename = "sol")]
    Solidity,
}

impl Language {
    /// Every supported language, in detection order.
    pub const ALL: &'static [Language] = &[Language::Solidity];

    /// Detects the language from a bare extension (without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|l| l.extension() == ext)
    }

    /// Detects the language from a file path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// The file extension used for sources of this language.
    pub fn extension(self) -> &'static str {
        match self {
            Language::Solidity => "sol",
        }
    }

    /// The short language tag carried in compile requests.
    pub fn tag(self) -> &'static str {
        match self {
            Language::Solidity => "sol",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_solidity() {
        assert_eq!(
            Language::from_path(Path::new("contracts/Token.sol")),
            Some(Language::Solidity)
        );
    }

    #[test]
    fn unknown_extension() {
        assert_eq!(Language::from_path(Path::new("main.rs")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn extension_is_case_sensitive() {
        assert_eq!(Language::from_path(Path::new("Token.SOL")), None);
    }

    #[test]
    fn serde_uses_tag() {
        let json = serde_json::to_string(&Language::Solidity).unwrap();
        assert_eq!(json, "\"sol\"");
    }
}
