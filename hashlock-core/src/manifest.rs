//! Manifest engine - the generate/verify state machine
//!
//! Both modes share one digest-computation step over the configured paths.
//! Generate serializes the result and overwrites the artifact; verify loads
//! the artifact and compares without mutating anything. There are no retries:
//! any I/O error ends the invocation.

use crate::artifact::{ArtifactFormat, FormatKind};
use crate::config::ProtectedFiles;
use crate::error::{IntegrityError, Result};
use crate::hasher::{hash_file, Digest, FileHash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Mapping from protected path to expected digest, ordered by path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: BTreeMap<String, Digest>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manifest from computed digests, one entry per file
    pub fn from_hashes(hashes: &[FileHash]) -> Result<Self> {
        let mut manifest = Manifest::new();
        for hashed in hashes {
            manifest.insert(hashed.path.clone(), hashed.digest.clone())?;
        }
        Ok(manifest)
    }

    /// Add an entry; a path may only appear once
    pub fn insert(&mut self, path: String, digest: Digest) -> Result<()> {
        if self.entries.contains_key(&path) {
            return Err(IntegrityError::DuplicateEntry { path });
        }
        self.entries.insert(path, digest);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Digest> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by path
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Digest)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// How verify decides whether a digest is still recorded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyStrategy {
    /// Parse the artifact and compare path by path
    #[default]
    Structured,
    /// Accept any occurrence of the digest text anywhere in the artifact
    Substring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Pass,
    Fail,
}

/// Why a path failed verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MismatchKind {
    /// Recorded digest differs from the current one
    Modified { expected: Digest, actual: Digest },
    /// Configured path has no entry in the artifact
    NotRecorded { actual: Digest },
    /// Artifact entry for a path that is no longer configured
    Stale { expected: Digest },
    /// Substring strategy: the current digest text does not occur in the artifact
    DigestNotFound { actual: Digest },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub path: String,
    pub kind: MismatchKind,
}

/// Outcome of one verify invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    /// Configured paths in declared order, then stale artifact entries by path
    pub mismatches: Vec<Mismatch>,
    /// Digests computed for this run, in declared order
    pub files: Vec<FileHash>,
}

impl VerificationResult {
    pub fn passed(&self) -> bool {
        self.status == VerificationStatus::Pass
    }

    pub fn mismatched_paths(&self) -> Vec<&str> {
        self.mismatches.iter().map(|m| m.path.as_str()).collect()
    }

    /// Protected files that were absent when hashed
    pub fn missing_files(&self) -> impl Iterator<Item = &str> {
        self.files.iter().filter(|f| f.missing).map(|f| f.path.as_str())
    }
}

/// Result of a successful generate
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub files: Vec<FileHash>,
    pub manifest: Manifest,
    pub artifact: PathBuf,
}

/// Compare freshly computed digests against artifact text
///
/// Pure: no filesystem access. Every mismatch is collected, never just the
/// first one.
pub fn compare(
    current: &[FileHash],
    artifact_text: &str,
    format: &dyn ArtifactFormat,
    strategy: VerifyStrategy,
) -> Result<Vec<Mismatch>> {
    let mut mismatches = Vec::new();

    match strategy {
        VerifyStrategy::Substring => {
            for hashed in current {
                if !artifact_text.contains(hashed.digest.as_str()) {
                    mismatches.push(Mismatch {
                        path: hashed.path.clone(),
                        kind: MismatchKind::DigestNotFound {
                            actual: hashed.digest.clone(),
                        },
                    });
                }
            }
        }
        VerifyStrategy::Structured => {
            let recorded = format.parse(artifact_text)?;

            for hashed in current {
                let kind = match recorded.get(&hashed.path) {
                    Some(expected) if *expected == hashed.digest => continue,
                    Some(expected) => MismatchKind::Modified {
                        expected: expected.clone(),
                        actual: hashed.digest.clone(),
                    },
                    None => MismatchKind::NotRecorded {
                        actual: hashed.digest.clone(),
                    },
                };
                mismatches.push(Mismatch {
                    path: hashed.path.clone(),
                    kind,
                });
            }

            for (path, expected) in recorded.iter() {
                if !current.iter().any(|hashed| &hashed.path == path) {
                    mismatches.push(Mismatch {
                        path: path.clone(),
                        kind: MismatchKind::Stale {
                            expected: expected.clone(),
                        },
                    });
                }
            }
        }
    }

    Ok(mismatches)
}

/// Drives generate and verify for one repository
pub struct ManifestEngine {
    root: PathBuf,
    files: ProtectedFiles,
    format: Box<dyn ArtifactFormat>,
    artifact_path: PathBuf,
}

impl ManifestEngine {
    /// `artifact_path` is resolved against `root` when relative
    pub fn new(root: &Path, files: ProtectedFiles, format: FormatKind, artifact_path: &Path) -> Self {
        Self::with_serializer(root, files, format.serializer(), artifact_path)
    }

    /// Use a custom serializer for a target ecosystem not covered by [`FormatKind`]
    pub fn with_serializer(
        root: &Path,
        files: ProtectedFiles,
        format: Box<dyn ArtifactFormat>,
        artifact_path: &Path,
    ) -> Self {
        let artifact_path = if artifact_path.is_absolute() {
            artifact_path.to_path_buf()
        } else {
            root.join(artifact_path)
        };

        ManifestEngine {
            root: root.to_path_buf(),
            files,
            format,
            artifact_path,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    pub fn files(&self) -> &ProtectedFiles {
        &self.files
    }

    /// Hash every protected file in declared order
    pub fn compute(&self) -> Result<Vec<FileHash>> {
        self.files
            .iter()
            .map(|path| hash_file(&self.root, path))
            .collect()
    }

    /// Render the artifact text for a set of computed digests
    pub fn render(&self, hashes: &[FileHash]) -> Result<(Manifest, String)> {
        let manifest = Manifest::from_hashes(hashes)?;
        let text = self.format.render(&manifest)?;
        Ok((manifest, text))
    }

    /// Compute digests and overwrite the artifact
    pub fn generate(&self) -> Result<GenerateReport> {
        info!(
            "Generating {} artifact for {} protected files",
            self.format.name(),
            self.files.len()
        );

        let files = self.compute()?;
        let (manifest, text) = self.render(&files)?;
        write_atomically(&self.artifact_path, text.as_bytes())?;

        info!("Wrote integrity artifact: {}", self.artifact_path.display());

        Ok(GenerateReport {
            files,
            manifest,
            artifact: self.artifact_path.clone(),
        })
    }

    /// Compute digests and compare them with the existing artifact
    pub fn verify(&self, strategy: VerifyStrategy) -> Result<VerificationResult> {
        let files = self.compute()?;
        self.verify_hashes(files, strategy)
    }

    /// Compare digests already produced by [`ManifestEngine::compute`]
    pub fn verify_hashes(
        &self,
        files: Vec<FileHash>,
        strategy: VerifyStrategy,
    ) -> Result<VerificationResult> {
        if !self.artifact_path.exists() {
            return Err(IntegrityError::ArtifactMissing {
                path: self.artifact_path.clone(),
            });
        }

        let artifact_text = std::fs::read_to_string(&self.artifact_path).map_err(|e| {
            IntegrityError::ArtifactRead {
                path: self.artifact_path.clone(),
                source: e,
            }
        })?;

        debug!(
            "Comparing {} digests against {} using {:?} strategy",
            files.len(),
            self.artifact_path.display(),
            strategy
        );

        let mismatches = compare(&files, &artifact_text, self.format.as_ref(), strategy)?;
        let status = if mismatches.is_empty() {
            VerificationStatus::Pass
        } else {
            VerificationStatus::Fail
        };

        info!(
            "Verification {:?}: {} of {} protected files mismatched",
            status,
            mismatches.len(),
            files.len()
        );

        Ok(VerificationResult {
            status,
            mismatches,
            files,
        })
    }
}

/// Write through a temporary file in the target directory, then rename
///
/// A failed write never leaves a truncated artifact behind.
fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let write_error = |source: std::io::Error| IntegrityError::ArtifactWrite {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_error)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
    temp.write_all(content).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    temp.persist(path).map_err(|e| write_error(e.error))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::RustFormat;
    use crate::hasher::hash_bytes;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn file_hash(path: &str, content: &[u8]) -> FileHash {
        FileHash {
            path: path.to_string(),
            digest: hash_bytes(content),
            missing: false,
        }
    }

    fn rendered(hashes: &[FileHash]) -> String {
        RustFormat
            .render(&Manifest::from_hashes(hashes).unwrap())
            .unwrap()
    }

    #[test]
    fn test_manifest_rejects_duplicates() {
        let mut manifest = Manifest::new();
        manifest.insert("a".to_string(), hash_bytes(b"a")).unwrap();

        let result = manifest.insert("a".to_string(), hash_bytes(b"b"));
        assert!(matches!(result, Err(IntegrityError::DuplicateEntry { .. })));
        assert_eq!(manifest.get("a"), Some(&hash_bytes(b"a")));
    }

    #[test]
    fn test_manifest_iterates_sorted() {
        let manifest =
            Manifest::from_hashes(&[file_hash("b", b"b"), file_hash("a", b"a")]).unwrap();
        let paths: Vec<&str> = manifest.paths().collect();
        assert_eq!(paths, vec!["a", "b"]);
    }

    #[test]
    fn test_compare_unchanged_passes() {
        let hashes = vec![file_hash("a.rs", b"a"), file_hash("b.rs", b"b")];
        let text = rendered(&hashes);

        for strategy in [VerifyStrategy::Structured, VerifyStrategy::Substring] {
            let mismatches = compare(&hashes, &text, &RustFormat, strategy).unwrap();
            assert!(mismatches.is_empty(), "{strategy:?} reported {mismatches:?}");
        }
    }

    #[test]
    fn test_compare_reports_every_modified_file() {
        let original = vec![
            file_hash("a.rs", b"a"),
            file_hash("b.rs", b"b"),
            file_hash("c.rs", b"c"),
        ];
        let text = rendered(&original);
        let current = vec![
            file_hash("a.rs", b"a2"),
            file_hash("b.rs", b"b"),
            file_hash("c.rs", b"c2"),
        ];

        let mismatches = compare(&current, &text, &RustFormat, VerifyStrategy::Structured).unwrap();
        assert_eq!(
            mismatches,
            vec![
                Mismatch {
                    path: "a.rs".to_string(),
                    kind: MismatchKind::Modified {
                        expected: hash_bytes(b"a"),
                        actual: hash_bytes(b"a2"),
                    },
                },
                Mismatch {
                    path: "c.rs".to_string(),
                    kind: MismatchKind::Modified {
                        expected: hash_bytes(b"c"),
                        actual: hash_bytes(b"c2"),
                    },
                },
            ]
        );

        let loose = compare(&current, &text, &RustFormat, VerifyStrategy::Substring).unwrap();
        let paths: Vec<&str> = loose.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "c.rs"]);
    }

    #[test]
    fn test_compare_detects_stale_and_unrecorded_entries() {
        let text = rendered(&[file_hash("old.rs", b"old"), file_hash("kept.rs", b"kept")]);
        let current = vec![file_hash("kept.rs", b"kept"), file_hash("new.rs", b"new")];

        let mismatches = compare(&current, &text, &RustFormat, VerifyStrategy::Structured).unwrap();
        assert_eq!(
            mismatches,
            vec![
                Mismatch {
                    path: "new.rs".to_string(),
                    kind: MismatchKind::NotRecorded {
                        actual: hash_bytes(b"new"),
                    },
                },
                Mismatch {
                    path: "old.rs".to_string(),
                    kind: MismatchKind::Stale {
                        expected: hash_bytes(b"old"),
                    },
                },
            ]
        );
    }

    #[test]
    fn test_substring_strategy_ignores_structure() {
        let digest = hash_bytes(b"a");
        let text = format!("anything at all {digest} trailing");
        let current = vec![file_hash("renamed.rs", b"a")];

        assert!(compare(&current, &text, &RustFormat, VerifyStrategy::Substring)
            .unwrap()
            .is_empty());
        assert_eq!(
            compare(&current, &text, &RustFormat, VerifyStrategy::Structured)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_write_atomically_replaces_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("artifact.rs");

        write_atomically(&path, b"first").unwrap();
        write_atomically(&path, b"second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");

        let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_engine_resolves_relative_artifact() {
        let files = ProtectedFiles::new(["a.rs"]).unwrap();
        let engine = ManifestEngine::new(
            Path::new("/repo"),
            files,
            FormatKind::Rust,
            Path::new("src/integrity.rs"),
        );
        assert_eq!(engine.artifact_path(), Path::new("/repo/src/integrity.rs"));
    }
}
