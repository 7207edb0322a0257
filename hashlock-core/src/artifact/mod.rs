//! Artifact serializers
//!
//! The generate and verify logic never depends on the concrete artifact
//! syntax. Each target ecosystem gets an [`ArtifactFormat`] that renders a
//! [`Manifest`] to text and parses that text back.

pub mod cpp;
pub mod json;
pub mod rust;

use crate::error::{IntegrityError, Result};
use crate::hasher::Digest;
use crate::manifest::Manifest;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use cpp::CppHeaderFormat;
pub use json::JsonFormat;
pub use rust::RustFormat;

/// Command printed in every artifact banner
pub const REGENERATE_COMMAND: &str = "hashlock --generate";

/// Renders a manifest into a checked-in artifact and reads it back
pub trait ArtifactFormat {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Render the manifest, sorted by path, ending with a newline
    fn render(&self, manifest: &Manifest) -> Result<String>;

    /// Parse previously rendered text back into a manifest
    fn parse(&self, text: &str) -> Result<Manifest>;
}

/// Selectable artifact formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatKind {
    /// C++ header with a `constexpr std::array` table
    CppHeader,
    /// Rust source with a `const` array of `(&str, &str)` pairs
    Rust,
    /// JSON document
    Json,
}

impl FormatKind {
    pub fn serializer(&self) -> Box<dyn ArtifactFormat> {
        match self {
            FormatKind::CppHeader => Box::new(CppHeaderFormat),
            FormatKind::Rust => Box::new(RustFormat),
            FormatKind::Json => Box::new(JsonFormat),
        }
    }

    /// Guess the format from the artifact's file extension
    pub fn infer(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "h" | "hh" | "hpp" | "hxx" => Some(FormatKind::CppHeader),
            "rs" => Some(FormatKind::Rust),
            "json" => Some(FormatKind::Json),
            _ => None,
        }
    }
}

fn parse_error(reason: impl Into<String>) -> IntegrityError {
    IntegrityError::ArtifactParse {
        reason: reason.into(),
    }
}

/// Escape a path for use inside a double-quoted C++ or Rust literal
pub(crate) fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn unescape_literal(value: &str) -> Result<String> {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('\\' | '"')) => unescaped.push(next),
            Some(other) => {
                return Err(parse_error(format!(
                    "unsupported escape sequence '\\{other}' in path literal"
                )))
            }
            None => return Err(parse_error("dangling escape in path literal")),
        }
    }
    Ok(unescaped)
}

/// Drop `//` line comments, leaving `//` inside string literals intact
fn strip_line_comments(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    for line in text.lines() {
        let mut in_string = false;
        let mut escaped = false;
        let mut prev_slash = false;
        let mut cut = line.len();

        for (i, c) in line.char_indices() {
            if in_string {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match c {
                '"' => in_string = true,
                '/' if prev_slash => {
                    cut = i - 1;
                    break;
                }
                _ => {}
            }
            prev_slash = c == '/';
        }

        stripped.push_str(&line[..cut]);
        stripped.push('\n');
    }
    stripped
}

/// Shared parser for the source-code formats
///
/// `entry_pattern` must capture the path literal body as group 1 and the
/// digest literal as group 2. `count_pattern` captures a declared entry count
/// as group 1; when present it must agree with the number of entries found.
/// Entries inside `//` comments are ignored.
pub(crate) fn parse_literal_table(
    text: &str,
    entry_pattern: &str,
    count_pattern: &str,
) -> Result<Manifest> {
    let entry_regex = Regex::new(entry_pattern)?;
    let count_regex = Regex::new(count_pattern)?;
    let text = strip_line_comments(text);
    let text = text.as_str();

    let mut manifest = Manifest::new();
    for captures in entry_regex.captures_iter(text) {
        let path = unescape_literal(&captures[1])?;
        let digest = Digest::parse(&captures[2]).map_err(|e| parse_error(e.to_string()))?;
        manifest
            .insert(path, digest)
            .map_err(|e| parse_error(e.to_string()))?;
    }

    if let Some(captures) = count_regex.captures(text) {
        let declared: usize = captures[1]
            .parse()
            .map_err(|_| parse_error(format!("invalid FILE_COUNT '{}'", &captures[1])))?;
        if declared != manifest.len() {
            return Err(parse_error(format!(
                "FILE_COUNT is {declared} but {} entries were found",
                manifest.len()
            )));
        }
    }

    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_from_extension() {
        assert_eq!(
            FormatKind::infer(Path::new("src/core/integrity_hashes.h")),
            Some(FormatKind::CppHeader)
        );
        assert_eq!(
            FormatKind::infer(Path::new("src/integrity.rs")),
            Some(FormatKind::Rust)
        );
        assert_eq!(
            FormatKind::infer(Path::new("integrity.json")),
            Some(FormatKind::Json)
        );
        assert_eq!(FormatKind::infer(Path::new("integrity")), None);
        assert_eq!(FormatKind::infer(Path::new("integrity.txt")), None);
    }

    #[test]
    fn test_escape_round_trip() {
        let raw = r#"dir\with "quotes".rs"#;
        let escaped = escape_literal(raw);
        assert_eq!(escaped, r#"dir\\with \"quotes\".rs"#);
        assert_eq!(unescape_literal(&escaped).unwrap(), raw);
    }

    #[test]
    fn test_unescape_rejects_unknown_sequences() {
        assert!(unescape_literal(r"bad\n").is_err());
        assert!(unescape_literal("bad\\").is_err());
    }

    #[test]
    fn test_strip_line_comments() {
        let text = "keep // drop\n// gone\n\"a//b.rs\" // tail\n\"q\\\"//x\"\n";
        assert_eq!(
            strip_line_comments(text),
            "keep \n\n\"a//b.rs\" \n\"q\\\"//x\"\n"
        );
    }

    #[test]
    fn test_format_names() {
        assert_eq!(FormatKind::CppHeader.serializer().name(), "cpp-header");
        assert_eq!(FormatKind::Rust.serializer().name(), "rust");
        assert_eq!(FormatKind::Json.serializer().name(), "json");
    }
}
