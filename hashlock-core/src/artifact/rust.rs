//! Rust source artifact
//!
//! The rendered module can be pulled into a crate with `include!` and handed
//! to [`crate::embedded::check_embedded`].

use super::{escape_literal, parse_literal_table, ArtifactFormat, REGENERATE_COMMAND};
use crate::error::Result;
use crate::manifest::Manifest;

const ENTRY_PATTERN: &str = r#"\(\s*"((?:[^"\\]|\\.)*)"\s*,\s*"([^"]*)"\s*,?\s*\)"#;
const COUNT_PATTERN: &str = r"FILE_COUNT\s*:\s*usize\s*=\s*(\d+)";

#[derive(Debug, Clone, Copy, Default)]
pub struct RustFormat;

impl ArtifactFormat for RustFormat {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn render(&self, manifest: &Manifest) -> Result<String> {
        let mut out = String::new();
        out.push_str("// @generated by hashlock. Do not edit manually!\n");
        out.push_str(&format!("// Run: {REGENERATE_COMMAND}\n"));
        out.push_str("//\n");
        out.push_str("// SHA-256 hashes of protected source files (CRLF normalized to LF).\n");
        out.push_str("// A mismatch means a protected file changed; review it before regenerating.\n");
        out.push('\n');
        out.push_str(&format!("pub const FILE_COUNT: usize = {};\n", manifest.len()));
        out.push('\n');
        out.push_str("/// (path, expected_sha256), sorted by path\n");
        out.push_str("pub const EXPECTED_HASHES: [(&str, &str); FILE_COUNT] = [\n");
        for (path, digest) in manifest.iter() {
            out.push_str(&format!("    (\"{}\", \"{}\"),\n", escape_literal(path), digest));
        }
        out.push_str("];\n");
        Ok(out)
    }

    fn parse(&self, text: &str) -> Result<Manifest> {
        parse_literal_table(text, ENTRY_PATTERN, COUNT_PATTERN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntegrityError;
    use crate::hasher::hash_bytes;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_rust_table() {
        let mut manifest = Manifest::new();
        let digest = hash_bytes(b"fn main() {}\n");
        manifest.insert("src/main.rs".to_string(), digest.clone()).unwrap();

        let expected = format!(
            "// @generated by hashlock. Do not edit manually!\n\
             // Run: hashlock --generate\n\
             //\n\
             // SHA-256 hashes of protected source files (CRLF normalized to LF).\n\
             // A mismatch means a protected file changed; review it before regenerating.\n\
             \n\
             pub const FILE_COUNT: usize = 1;\n\
             \n\
             /// (path, expected_sha256), sorted by path\n\
             pub const EXPECTED_HASHES: [(&str, &str); FILE_COUNT] = [\n    \
             (\"src/main.rs\", \"{digest}\"),\n\
             ];\n"
        );
        assert_eq!(RustFormat.render(&manifest).unwrap(), expected);
    }

    #[test]
    fn test_parse_rendered_table() {
        let mut manifest = Manifest::new();
        manifest.insert("b.rs".to_string(), hash_bytes(b"b")).unwrap();
        manifest.insert("a.rs".to_string(), hash_bytes(b"a")).unwrap();
        manifest
            .insert(r#"odd "name".rs"#.to_string(), hash_bytes(b"odd"))
            .unwrap();

        let parsed = RustFormat.parse(&RustFormat.render(&manifest).unwrap()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_parse_rejects_duplicate_paths() {
        let digest = hash_bytes(b"a");
        let text = format!("[(\"a.rs\", \"{digest}\"), (\"a.rs\", \"{digest}\")]");
        assert!(matches!(
            RustFormat.parse(&text),
            Err(IntegrityError::ArtifactParse { .. })
        ));
    }

    #[test]
    fn test_commented_out_entry_does_not_count() {
        let live = hash_bytes(b"live");
        let old = hash_bytes(b"old");
        let text = format!(
            "pub const FILE_COUNT: usize = 1;\n\
             // pub const FILE_COUNT: usize = 2;\n\
             pub const EXPECTED_HASHES: [(&str, &str); FILE_COUNT] = [\n    \
             // (\"old.rs\", \"{old}\"),\n    \
             (\"live.rs\", \"{live}\"), // was (\"x.rs\", \"{old}\")\n\
             ];\n"
        );

        let parsed = RustFormat.parse(&text).unwrap();
        assert_eq!(parsed.paths().collect::<Vec<_>>(), vec!["live.rs"]);
        assert_eq!(parsed.get("live.rs"), Some(&live));
    }

    #[test]
    fn test_parse_empty_table() {
        let text = "pub const FILE_COUNT: usize = 0;\npub const EXPECTED_HASHES: [(&str, &str); FILE_COUNT] = [];\n";
        assert!(RustFormat.parse(text).unwrap().is_empty());
    }
}
