//! Protected file configuration
//!
//! The list of protected files is supplied from outside the engine, normally
//! through a `hashlock.yml` at the repository root.

use crate::artifact::FormatKind;
use crate::error::{IntegrityError, Result};
use crate::manifest::VerifyStrategy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file name, looked up in the repository root
pub const CONFIG_FILE_NAME: &str = "hashlock.yml";

/// Validated, ordered list of protected paths relative to the repository root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectedFiles {
    paths: Vec<String>,
}

impl ProtectedFiles {
    /// Validate a list of relative paths, keeping their declared order
    pub fn new<I, S>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut validated = Vec::new();

        for raw in paths {
            let path = normalize_protected_path(&raw.into())?;
            if !seen.insert(path.clone()) {
                return Err(IntegrityError::DuplicateProtectedPath { path });
            }
            validated.push(path);
        }

        if validated.is_empty() {
            return Err(IntegrityError::NoProtectedFiles);
        }

        Ok(ProtectedFiles { paths: validated })
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }
}

/// Rewrite separators to `/` and reject anything that escapes the root
fn normalize_protected_path(raw: &str) -> Result<String> {
    let invalid = |reason: &str| IntegrityError::InvalidProtectedPath {
        path: raw.to_string(),
        reason: reason.to_string(),
    };

    let path = raw.replace('\\', "/");
    if path.is_empty() {
        return Err(invalid("path is empty"));
    }
    if path.trim() != path {
        return Err(invalid("leading or trailing whitespace is not allowed"));
    }
    if path.starts_with('/') || Path::new(&path).is_absolute() || has_drive_prefix(&path) {
        return Err(invalid("must be relative to the repository root"));
    }

    for segment in path.split('/') {
        match segment {
            "" => return Err(invalid("must name a file")),
            "." | ".." => return Err(invalid("'.' and '..' components are not allowed")),
            _ => {}
        }
    }

    Ok(path)
}

/// `C:` style prefix, absolute or drive-relative on Windows
fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Contents of `hashlock.yml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashlockConfig {
    /// Artifact location, relative to the repository root
    pub artifact: PathBuf,

    /// Serializer; inferred from the artifact extension when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatKind>,

    #[serde(default)]
    pub strategy: VerifyStrategy,

    /// Protected files in declared order
    pub files: Vec<String>,
}

impl HashlockConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IntegrityError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| IntegrityError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: HashlockConfig =
            serde_yaml_ng::from_str(&content).map_err(|e| IntegrityError::ConfigParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!(
            "Loaded configuration from {}: {} protected files",
            path.display(),
            config.files.len()
        );

        Ok(config)
    }

    /// Validated protected file list
    pub fn protected_files(&self) -> Result<ProtectedFiles> {
        ProtectedFiles::new(self.files.iter().cloned())
    }

    /// Explicit format, or the one implied by the artifact extension
    pub fn format_kind(&self) -> Result<FormatKind> {
        match self.format {
            Some(kind) => Ok(kind),
            None => FormatKind::infer(&self.artifact).ok_or_else(|| {
                IntegrityError::UnknownArtifactFormat {
                    path: self.artifact.clone(),
                }
            }),
        }
    }
}
