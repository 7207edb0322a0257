//! Integrity error types with clear, actionable messages

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while hashing, generating or verifying a manifest
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// No configuration file where one was expected
    #[error("No hashlock configuration found at {path}\n\nCreate one listing the protected files, for example:\n  artifact: src/integrity_hashes.rs\n  files:\n    - src/main.rs")]
    ConfigNotFound { path: PathBuf },

    /// The configuration file exists but could not be read
    #[error("Failed to read configuration from {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid YAML for this schema
    #[error("Failed to parse configuration {path}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// The configuration lists no files at all
    #[error("The protected file list is empty; nothing would be verified")]
    NoProtectedFiles,

    /// A protected path is not a clean path relative to the repository root
    #[error("Invalid protected path '{path}': {reason}")]
    InvalidProtectedPath { path: String, reason: String },

    /// The same protected path is listed twice
    #[error("Protected path listed more than once: {path}")]
    DuplicateProtectedPath { path: String },

    /// The artifact format could not be derived from the artifact path
    #[error("Cannot infer artifact format from {path}\n\nSet `format:` in the configuration (cpp-header, rust or json) or pass --format")]
    UnknownArtifactFormat { path: PathBuf },

    /// A protected file exists but could not be read
    #[error("Failed to read protected file for hashing: {path}")]
    HashRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Verify mode has no baseline to compare against
    #[error("Integrity artifact not found: {path}\n\nThere is no baseline to verify against. Generate one with:\n  hashlock --generate")]
    ArtifactMissing { path: PathBuf },

    /// The artifact exists but could not be read
    #[error("Failed to read integrity artifact from {path}")]
    ArtifactRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact text does not hold a well-formed manifest
    #[error("Integrity artifact is corrupted or was edited by hand: {reason}\n\nRegenerate it with:\n  hashlock --generate")]
    ArtifactParse { reason: String },

    /// The artifact could not be written
    #[error("Failed to write integrity artifact to {path}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A string is not a 64-character lowercase hex digest
    #[error("Invalid SHA-256 digest: '{value}'")]
    InvalidDigest { value: String },

    /// A manifest received the same path twice
    #[error("Duplicate manifest entry: {path}")]
    DuplicateEntry { path: String },

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IntegrityError>;

impl IntegrityError {
    /// Log errors that suggest the artifact itself was tampered with
    pub fn log_if_security_critical(&self) {
        match self {
            IntegrityError::ArtifactParse { .. } | IntegrityError::DuplicateEntry { .. } => {
                tracing::error!(target: "security", "INTEGRITY ARTIFACT INVALID: {}", self);
            }
            _ => {}
        }
    }
}
