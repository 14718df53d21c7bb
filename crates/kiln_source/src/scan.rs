//! Lexical scanning for import directives and object declarations.
//!
//! This is pattern matching over source text, not parsing. Comments are
//! masked out before matching so commented-out imports and declarations are
//! ignored, and string literals are masked before looking for declarations.
//! Anything the patterns do not recognize (imports assembled by macros,
//! declarations split by unusual tokens) is silently missed.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// An import directive found in source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDirective {
    /// The imported path as written, without quotes.
    pub path: String,
    /// Byte range of the path inside the original text, excluding quotes.
    pub range: Range<usize>,
}

fn import_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"\bimport\s+(?:(?:\*\s*as\s+[A-Za-z_$][\w$]*|\{[^}]*\}|[A-Za-z_$][\w$]*)\s+from\s+)?(?:"([^"\n]*)"|'([^'\n]*)')"#,
        )
        .expect("import pattern is valid")
    })
}

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:abstract\s+)?(?:contract|library|interface)\s+([A-Za-z_$][A-Za-z0-9_$]*)")
            .expect("declaration pattern is valid")
    })
}

/// Finds every import directive in `text`, in source order.
pub fn scan_imports(text: &str) -> Vec<ImportDirective> {
    let masked = mask(text, false);
    import_regex()
        .captures_iter(&masked)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| ImportDirective {
            path: text[m.range()].to_string(),
            range: m.range(),
        })
        .collect()
}

/// Finds the names of all contracts, libraries and interfaces declared in
/// `text`, in source order.
pub fn scan_declarations(text: &str) -> Vec<String> {
    let masked = mask(text, true);
    declaration_regex()
        .captures_iter(&masked)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Replaces byte ranges of `text` with new content.
///
/// `replacements` must be sorted by range start and non-overlapping, which is
/// what [`scan_imports`] produces.
pub fn rewrite(text: &str, replacements: &[(Range<usize>, String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (range, replacement) in replacements {
        out.push_str(&text[cursor..range.start]);
        out.push_str(replacement);
        cursor = range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Blanks comments (and optionally string literal contents) with spaces,
/// preserving byte offsets and newlines.
fn mask(text: &str, mask_strings: bool) -> String {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut out = bytes.to_vec();
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                let end = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(len, |p| i + p);
                blank(&mut out, i..end);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = bytes[i + 2..]
                    .windows(2)
                    .position(|w| w == b"*/")
                    .map_or(len, |p| i + 2 + p + 2);
                blank(&mut out, i..end);
                i = end;
            }
            quote @ (b'"' | b'\'') => {
                let mut j = i + 1;
                while j < len && bytes[j] != quote && bytes[j] != b'\n' {
                    if bytes[j] == b'\\' {
                        j += 1;
                    }
                    j += 1;
                }
                let close = j.min(len);
                if mask_strings {
                    blank(&mut out, i + 1..close);
                }
                i = (close + 1).min(len);
            }
            _ => i += 1,
        }
    }

    // Masking only ever replaces whole characters with ASCII spaces.
    String::from_utf8_lossy(&out).into_owned()
}

fn blank(out: &mut [u8], range: Range<usize>) {
    for b in &mut out[range] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}
