//! Startup check against a compiled-in digest table
//!
//! A binary that `include!`s a Rust artifact can re-hash its own sources when
//! they are present next to it. Distributed binaries usually ship without
//! sources, so an absent root or file is a warning rather than a failure.

use crate::hasher::hash_file;
use std::path::Path;
use tracing::{error, warn};

/// Length of the digest prefix shown in failure lines
const PREFIX_LEN: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedCheck {
    pub passed: bool,
    /// Non-fatal issues
    pub warnings: Vec<String>,
    /// Tampered files
    pub failures: Vec<String>,
}

/// Re-hash each `(path, expected_sha256)` pair under `root`
pub fn check_embedded(root: &Path, expected: &[(&str, &str)]) -> EmbeddedCheck {
    let mut result = EmbeddedCheck {
        passed: true,
        ..Default::default()
    };

    if !root.is_dir() {
        result.warnings.push(format!(
            "Source root {} not found - skipping source integrity check",
            root.display()
        ));
        return result;
    }

    let mut verified = 0;
    for (path, expected_digest) in expected {
        let hashed = match hash_file(root, path) {
            Ok(hashed) if hashed.missing => {
                result.warnings.push(format!("Missing: {path}"));
                continue;
            }
            Ok(hashed) => hashed,
            Err(e) => {
                result.warnings.push(format!("Could not read: {path} ({e})"));
                continue;
            }
        };

        if hashed.digest.as_str() != *expected_digest {
            result.passed = false;
            result.failures.push(format!(
                "TAMPERED: {} (expected {}..., got {}...)",
                path,
                expected_digest.get(..PREFIX_LEN).unwrap_or(*expected_digest),
                hashed.digest.prefix(PREFIX_LEN)
            ));
        } else {
            verified += 1;
        }
    }

    if result.passed && verified > 0 && verified < expected.len() {
        result.warnings.push(format!(
            "Verified {}/{} protected files",
            verified,
            expected.len()
        ));
    }

    for warning in &result.warnings {
        warn!("[Integrity] {}", warning);
    }
    for failure in &result.failures {
        error!("[Integrity] {}", failure);
    }

    result
}
