//! hashlock core library
//!
//! Computes line-ending-stable SHA-256 digests of a configured set of
//! protected files, writes them to a checked-in artifact, and later verifies
//! the files against that artifact.

pub mod artifact;
pub mod config;
pub mod embedded;
pub mod error;
pub mod hasher;
pub mod manifest;

pub use artifact::{ArtifactFormat, FormatKind};
pub use config::{HashlockConfig, ProtectedFiles};
pub use error::{IntegrityError, Result};
pub use hasher::{hash_file, Digest, FileHash};
pub use manifest::{
    GenerateReport, Manifest, ManifestEngine, Mismatch, MismatchKind, VerificationResult,
    VerificationStatus, VerifyStrategy,
};
