//! Single-pass lookup of one named entry in a deployment artifact.
//!
//! Artifacts are gzip-compressed tar streams. The archive is decoded
//! incrementally and exposed as a lazy sequence of pending entries: the
//! header path is available before the body is read, so a caller can stop
//! pulling as soon as it sees the entry it wants. Bodies of skipped entries
//! are never buffered.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use dropcheck_common::error::{DropcheckError, Result};
use flate2::read::GzDecoder;

/// Upper bound on the buffer reserved up front from a header's size field.
const MAX_PREALLOC: u64 = 1024 * 1024;

/// An entry read out of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Header path exactly as stored in the archive.
    pub path: String,
    /// Full body of the entry.
    pub bytes: Vec<u8>,
}

/// A gzip-compressed tar artifact opened for streaming.
///
/// The underlying reader is owned by this value and released when it is
/// dropped, whether or not the entries were read to the end.
pub struct ArtifactArchive<R: Read> {
    source: PathBuf,
    archive: tar::Archive<GzDecoder<R>>,
}

impl ArtifactArchive<File> {
    /// Opens an artifact on local disk.
    ///
    /// # Errors
    ///
    /// Returns `DropcheckError::Io` if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| DropcheckError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::from_reader(file, path))
    }
}

impl<R: Read> ArtifactArchive<R> {
    /// Wraps an arbitrary byte stream. `source` labels errors and logs.
    pub fn from_reader(reader: R, source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            archive: tar::Archive::new(GzDecoder::new(reader)),
        }
    }

    /// Returns the label of the underlying stream.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the lazy sequence of entries in archive order.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive has already been read past its
    /// first entry.
    pub fn entries(&mut self) -> Result<Entries<'_, R>> {
        let source = self.source.as_path();
        let inner = self.archive.entries().map_err(|e| classify(e, source))?;
        Ok(Entries { inner, source })
    }

    /// Returns the first entry whose header path equals `target` byte for
    /// byte, or `None` when the archive ends without a match.
    ///
    /// Scanning stops at the first match; the rest of the stream is left
    /// unread.
    ///
    /// # Errors
    ///
    /// Returns `CorruptArchive`, `TruncatedArchive`, or `Io` if the stream
    /// cannot be decoded up to the match.
    pub fn find_entry(&mut self, target: &str) -> Result<Option<ArchiveEntry>> {
        let mut scanned = 0_usize;
        for pending in self.entries()? {
            let pending = pending?;
            scanned += 1;
            if pending.path_bytes().as_ref() == target.as_bytes() {
                tracing::debug!(entry = target, scanned, size = pending.size(), "entry found");
                return pending.into_entry().map(Some);
            }
            tracing::trace!(entry = %pending.path_lossy(), "skipping entry");
        }
        tracing::debug!(
            entry = target,
            scanned,
            archive = %self.source.display(),
            "archive exhausted without a match"
        );
        Ok(None)
    }
}

/// Opens the artifact at `path` and looks up `target`.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded.
pub fn locate_entry(path: &Path, target: &str) -> Result<Option<ArchiveEntry>> {
    tracing::info!(archive = %path.display(), entry = target, "scanning artifact");
    let mut archive = ArtifactArchive::open(path)?;
    archive.find_entry(target)
}

/// Lazy iterator over the entries of an [`ArtifactArchive`].
pub struct Entries<'a, R: Read + 'a> {
    inner: tar::Entries<'a, GzDecoder<R>>,
    source: &'a Path,
}

impl<'a, R: Read + 'a> Iterator for Entries<'a, R> {
    type Item = Result<PendingEntry<'a, R>>;

    fn next(&mut self) -> Option<Self::Item> {
        let source = self.source;
        self.inner.next().map(|item| {
            item.map(|entry| PendingEntry { entry, source })
                .map_err(|e| classify(e, source))
        })
    }
}

/// An entry whose header has been read but whose body has not.
pub struct PendingEntry<'a, R: Read + 'a> {
    entry: tar::Entry<'a, GzDecoder<R>>,
    source: &'a Path,
}

impl<'a, R: Read + 'a> PendingEntry<'a, R> {
    /// Raw header path bytes.
    #[must_use]
    pub fn path_bytes(&self) -> Cow<'_, [u8]> {
        self.entry.path_bytes()
    }

    /// Header path with invalid UTF-8 replaced.
    #[must_use]
    pub fn path_lossy(&self) -> String {
        String::from_utf8_lossy(&self.entry.path_bytes()).into_owned()
    }

    /// Body size declared by the header.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.entry.size()
    }

    /// Reads the body into memory.
    ///
    /// # Errors
    ///
    /// Returns `TruncatedArchive` if the stream ends before the declared
    /// size, or the classified decoding error.
    pub fn into_entry(mut self) -> Result<ArchiveEntry> {
        let path = self.path_lossy();
        let declared = self.entry.size();
        let capacity = usize::try_from(declared.min(MAX_PREALLOC)).unwrap_or(0);
        let mut bytes = Vec::with_capacity(capacity);
        let _ = self
            .entry
            .read_to_end(&mut bytes)
            .map_err(|e| classify(e, self.source))?;

        let read = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        if read < declared {
            return Err(DropcheckError::TruncatedArchive {
                path: self.source.to_path_buf(),
                message: format!("entry {path} ended after {read} of {declared} bytes"),
            });
        }
        Ok(ArchiveEntry { path, bytes })
    }
}

/// Maps a decoder error onto the archive failure taxonomy.
fn classify(err: io::Error, source: &Path) -> DropcheckError {
    let path = source.to_path_buf();
    match err.kind() {
        io::ErrorKind::UnexpectedEof => DropcheckError::TruncatedArchive {
            path,
            message: err.to_string(),
        },
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => {
            DropcheckError::CorruptArchive {
                path,
                message: err.to_string(),
            }
        }
        // tar reports its own format errors as `Other`; a short header
        // block is the one that means the stream ran out. The wording is
        // "failed to read entire block" as of tar 0.4.46.
        io::ErrorKind::Other => {
            let message = err.to_string();
            if message.contains("entire block") {
                DropcheckError::TruncatedArchive { path, message }
            } else {
                DropcheckError::CorruptArchive { path, message }
            }
        }
        _ => DropcheckError::Io { path, source: err },
    }
}
