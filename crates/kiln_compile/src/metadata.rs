//! Removal of the metadata trailer compilers append to bytecode.
//!
//! The trailer embeds a hash of the compiler's metadata JSON, which includes
//! source paths. Stripping it makes bytecode depend only on source content.
//! The trailer length changed across compiler releases, so the strip length
//! is looked up by compiler version.

use semver::{Version, VersionReq};

/// Strip `hex_len` trailing hex characters for compilers matching `versions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripRule {
    /// Compiler versions this rule applies to.
    pub versions: VersionReq,
    /// Trailer length in hex characters.
    pub hex_len: usize,
}

impl StripRule {
    fn new(versions: &str, hex_len: usize) -> Self {
        Self {
            // Built-in requirement strings are constants known to parse.
            versions: VersionReq::parse(versions).unwrap_or(VersionReq::STAR),
            hex_len,
        }
    }
}

/// Ordered strip rules; the first rule matching a version wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataPolicy {
    rules: Vec<StripRule>,
}

impl Default for MetadataPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                StripRule::new("<0.4.7", 0),
                StripRule::new(">=0.4.7, <0.5.9", 86),
                StripRule::new(">=0.5.9, <0.6.0", 104),
                StripRule::new(">=0.6.0", 106),
            ],
        }
    }
}

impl MetadataPolicy {
    /// The built-in rules with `overrides` consulted first.
    ///
    /// Override requirements that fail to parse are skipped; the config
    /// loader rejects them before they get here.
    pub fn from_config(overrides: &[kiln_config::StripRule]) -> Self {
        let mut rules: Vec<StripRule> = overrides
            .iter()
            .filter_map(|rule| {
                VersionReq::parse(&rule.versions).ok().map(|versions| StripRule {
                    versions,
                    hex_len: rule.hex_len,
                })
            })
            .collect();
        rules.extend(Self::default().rules);
        Self { rules }
    }

    /// The rules in lookup order.
    pub fn rules(&self) -> &[StripRule] {
        &self.rules
    }

    /// Trailer length for bytecode from the given compiler version.
    ///
    /// Falls back to the CBOR length field at the end of the bytecode when
    /// the version is unknown or matches no rule.
    pub fn strip_len(&self, version: Option<&Version>, bytecode: &str) -> usize {
        let by_version = version.and_then(|v| {
            let release = Version::new(v.major, v.minor, v.patch);
            self.rules
                .iter()
                .find(|rule| rule.versions.matches(&release))
                .map(|rule| rule.hex_len)
        });
        by_version.unwrap_or_else(|| cbor_trailer_len(bytecode))
    }

    /// Removes the metadata trailer from `bytecode`.
    ///
    /// Bytecode shorter than the trailer is returned unchanged.
    pub fn strip<'a>(&self, version: Option<&Version>, bytecode: &'a str) -> &'a str {
        let len = self.strip_len(version, bytecode);
        if len == 0 || bytecode.len() < len || !bytecode.is_char_boundary(bytecode.len() - len) {
            tracing::debug!(len, bytecode_len = bytecode.len(), "bytecode left unstripped");
            return bytecode;
        }
        &bytecode[..bytecode.len() - len]
    }
}

/// CBOR map headers a metadata trailer can open with (one to three entries).
const CBOR_MAP_HEADERS: [&str; 3] = ["a1", "a2", "a3"];

/// Trailer length from the final two bytes, which give the CBOR payload
/// length in bytes. Zero unless that many bytes before the length field
/// start with a CBOR map header.
fn cbor_trailer_len(bytecode: &str) -> usize {
    if bytecode.len() < 4 {
        return 0;
    }
    let Some(tail) = bytecode.get(bytecode.len() - 4..) else {
        return 0;
    };
    let Ok(payload) = usize::from_str_radix(tail, 16) else {
        return 0;
    };
    let total = (payload + 2) * 2;
    if payload == 0 || total > bytecode.len() {
        return 0;
    }
    let start = bytecode.len() - total;
    match bytecode.get(start..start + 2) {
        Some(header) if CBOR_MAP_HEADERS.iter().any(|h| header.eq_ignore_ascii_case(h)) => total,
        _ => 0,
    }
}

/// Extracts the release version from a compiler version string.
///
/// Accepts forms like `0.4.21+commit.dfe3193c.Linux.g++` and
/// `0.8.19+commit.7dd6d404`, which are not strict semver.
pub fn parse_compiler_version(text: &str) -> Option<Version> {
    let text = text.trim();
    let text = text.strip_prefix('v').unwrap_or(text);
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let mut parts = text[..end].split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next()?.parse().ok()?;
    Some(Version::new(major, minor, patch))
}
