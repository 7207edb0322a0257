//! C++ header artifact, consumed by a `static_assert` or startup check

use super::{escape_literal, parse_literal_table, ArtifactFormat, REGENERATE_COMMAND};
use crate::error::Result;
use crate::manifest::Manifest;

const ENTRY_PATTERN: &str = r#"\{\s*"((?:[^"\\]|\\.)*)"\s*,\s*"([^"]*)"\s*\}"#;
const COUNT_PATTERN: &str = r"FILE_COUNT\s*=\s*(\d+)";

/// `#pragma once` header exposing `Integrity::EXPECTED_HASHES`
#[derive(Debug, Clone, Copy, Default)]
pub struct CppHeaderFormat;

impl ArtifactFormat for CppHeaderFormat {
    fn name(&self) -> &'static str {
        "cpp-header"
    }

    fn render(&self, manifest: &Manifest) -> Result<String> {
        let rule = "// ============================================================================";
        let mut lines = vec![
            "#pragma once".to_string(),
            rule.to_string(),
            "//  AUTO-GENERATED -- Do not edit manually!".to_string(),
            format!("//  Run: {REGENERATE_COMMAND}"),
            "//".to_string(),
            "//  SHA-256 hashes of protected source files (CRLF normalized to LF).".to_string(),
            "//  If any hash mismatches at build time, a protected file was modified;".to_string(),
            "//  review the change before regenerating this header.".to_string(),
            rule.to_string(),
            String::new(),
            "#include <array>".to_string(),
            "#include <cstddef>".to_string(),
            "#include <string_view>".to_string(),
            "#include <utility>".to_string(),
            String::new(),
            "namespace Integrity {".to_string(),
            String::new(),
            format!("static constexpr size_t FILE_COUNT = {};", manifest.len()),
            String::new(),
            "// {filename, expected_sha256}".to_string(),
            "static constexpr std::array<std::pair<std::string_view, std::string_view>, FILE_COUNT> EXPECTED_HASHES = {{".to_string(),
        ];

        for (path, digest) in manifest.iter() {
            lines.push(format!("    {{\"{}\", \"{}\"}},", escape_literal(path), digest));
        }

        lines.push("}};".to_string());
        lines.push(String::new());
        lines.push("} // namespace Integrity".to_string());
        lines.push(String::new());

        Ok(lines.join("\n"))
    }

    fn parse(&self, text: &str) -> Result<Manifest> {
        parse_literal_table(text, ENTRY_PATTERN, COUNT_PATTERN)
    }
}
