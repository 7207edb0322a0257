//! Canonical hashing of protected files
//!
//! Every CRLF pair is rewritten to LF before hashing so a file checked out
//! with either line-ending convention produces the same digest. Nothing else
//! is normalized: encoding, BOMs and trailing whitespace all change the digest.

use crate::error::{IntegrityError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};

/// Length of a rendered SHA-256 digest
pub const DIGEST_HEX_LEN: usize = 64;

/// Lowercase hex SHA-256 of canonicalized file content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// The all-zero digest recorded for a file that was not found
    pub fn sentinel() -> Self {
        Digest("0".repeat(DIGEST_HEX_LEN))
    }

    /// Parse a rendered digest, accepting only 64 lowercase hex characters
    pub fn parse(value: &str) -> Result<Self> {
        let well_formed = value.len() == DIGEST_HEX_LEN
            && value
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        if !well_formed {
            return Err(IntegrityError::InvalidDigest {
                value: value.to_string(),
            });
        }

        Ok(Digest(value.to_string()))
    }

    pub fn is_sentinel(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading `len` characters, used for the short report form
    pub fn prefix(&self, len: usize) -> &str {
        &self.0[..len.min(DIGEST_HEX_LEN)]
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Digest {
    type Error = IntegrityError;

    fn try_from(value: String) -> Result<Self> {
        Digest::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

/// Digest of one protected file as observed on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHash {
    /// Path relative to the repository root, as configured
    pub path: String,
    pub digest: Digest,
    /// The file did not exist; `digest` is the sentinel
    pub missing: bool,
}

/// Rewrite every CRLF pair to a single LF, leaving lone CR bytes alone
pub fn normalize_line_endings(content: &[u8]) -> Cow<'_, [u8]> {
    if !content.windows(2).any(|pair| pair == b"\r\n") {
        return Cow::Borrowed(content);
    }

    let mut normalized = Vec::with_capacity(content.len());
    let mut bytes = content.iter().peekable();
    while let Some(&byte) = bytes.next() {
        if byte == b'\r' && bytes.peek() == Some(&&b'\n') {
            continue;
        }
        normalized.push(byte);
    }

    Cow::Owned(normalized)
}

/// Hash raw content after line-ending canonicalization
pub fn hash_bytes(content: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(normalize_line_endings(content));
    Digest(hex::encode(hasher.finalize()))
}

/// Hash a protected file given its path relative to `root`
///
/// A file that does not exist yields the sentinel digest with `missing` set,
/// so a verify pass can still report it. That includes a path whose parent
/// directory has been replaced by a regular file. Any other read failure is
/// fatal.
pub fn hash_file(root: &Path, relative: &str) -> Result<FileHash> {
    let full_path = root.join(relative);

    let content = match std::fs::read(&full_path) {
        Ok(content) => content,
        Err(e)
            if e.kind() == std::io::ErrorKind::NotFound
                || parent_is_regular_file(root, relative) =>
        {
            warn!("Protected file not found: {}", relative);
            return Ok(FileHash {
                path: relative.to_string(),
                digest: Digest::sentinel(),
                missing: true,
            });
        }
        Err(e) => {
            return Err(IntegrityError::HashRead {
                path: full_path,
                source: e,
            })
        }
    };

    let digest = hash_bytes(&content);
    debug!("Hashed {} ({} bytes): {}", relative, content.len(), digest);

    Ok(FileHash {
        path: relative.to_string(),
        digest,
        missing: false,
    })
}

/// True when some ancestor of `relative` under `root` exists but is not a directory
fn parent_is_regular_file(root: &Path, relative: &str) -> bool {
    Path::new(relative)
        .ancestors()
        .skip(1)
        .filter(|ancestor| !ancestor.as_os_str().is_empty())
        .any(|ancestor| {
            std::fs::metadata(root.join(ancestor))
                .map(|metadata| !metadata.is_dir())
                .unwrap_or(false)
        })
}
