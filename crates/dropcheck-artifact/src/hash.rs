//! SHA-256 digests of fetched artifacts.

use std::fs::File;
use std::path::Path;

use dropcheck_common::error::{DropcheckError, Result};
use sha2::{Digest, Sha256};

/// Digest and size of a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Lowercase hex SHA-256.
    pub sha256: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// Computes the SHA-256 digest of a file without loading it into memory.
///
/// # Errors
///
/// Returns `DropcheckError::Io` if the file cannot be read.
pub fn digest_file(path: &Path) -> Result<FileDigest> {
    tracing::debug!(path = %path.display(), "computing SHA-256 digest");
    let io_err = |e| DropcheckError::Io {
        path: path.to_path_buf(),
        source: e,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let size_bytes = std::io::copy(&mut file, &mut hasher).map_err(io_err)?;
    Ok(FileDigest {
        sha256: format!("{:x}", hasher.finalize()),
        size_bytes,
    })
}
