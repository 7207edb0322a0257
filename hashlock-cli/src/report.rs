//! Human-readable report printed to stdout

use hashlock_core::artifact::REGENERATE_COMMAND;
use hashlock_core::{FileHash, ManifestEngine, MismatchKind, VerificationResult};
use std::path::Path;

/// Digest characters shown per file line
const PREFIX_LEN: usize = 16;

pub fn header(generate: bool, engine: &ManifestEngine) {
    let mode = if generate { "Generator" } else { "Verifier" };
    println!("hashlock Integrity Hash {mode}");
    println!("Repository root: {}", engine.root().display());
    println!("Protected files: {}", engine.files().len());
    println!();
}

pub fn file_lines(files: &[FileHash]) {
    for file in files {
        if file.missing {
            println!("  WARNING: {} not found, recording sentinel digest", file.path);
        }
        println!("  {}... {}", file.digest.prefix(PREFIX_LEN), file.path);
    }
}

pub fn generated(artifact: &Path) {
    println!("\nGenerated: {}", artifact.display());
    println!("Commit this file alongside any approved changes to protected files.");
}

pub fn passed() {
    println!("\nAll integrity checks passed.");
}

pub fn failed(result: &VerificationResult) {
    println!(
        "\nINTEGRITY CHECK FAILED: {} file(s) modified:",
        result.mismatches.len()
    );
    for mismatch in &result.mismatches {
        let detail = match &mismatch.kind {
            MismatchKind::Modified { expected, actual } => format!(
                "expected {}..., found {}...",
                expected.prefix(PREFIX_LEN),
                actual.prefix(PREFIX_LEN)
            ),
            MismatchKind::NotRecorded { .. } => "not recorded in artifact".to_string(),
            MismatchKind::Stale { .. } => "recorded in artifact but no longer protected".to_string(),
            MismatchKind::DigestNotFound { actual } => {
                format!("digest {}... not found in artifact", actual.prefix(PREFIX_LEN))
            }
        };
        println!("  MISMATCH: {} ({})", mismatch.path, detail);
    }
    println!("\nIf these changes are intentional and have been reviewed:");
    println!("  {REGENERATE_COMMAND}");
    println!("Then commit the updated artifact alongside your changes.");
}

pub fn artifact_missing(artifact: &Path) {
    println!("\nERROR: {} not found!", artifact.display());
    println!("Run: {REGENERATE_COMMAND}");
}
