//! Launch-command verification of a fetched artifact.

use std::path::Path;

use dropcheck_artifact::archive;
use dropcheck_artifact::manifest::{self, Comparison, FieldPath};
use dropcheck_common::error::{DropcheckError, Result};

/// Locates `entry` in the artifact at `path` and compares the string at
/// `field` with `expected`, both whitespace-normalized.
///
/// A mismatch is not an error; callers inspect [`Comparison::matched`].
///
/// # Errors
///
/// Returns `EntryNotFound` when the archive has no such entry, and the
/// archive or manifest errors of the underlying readers otherwise.
pub fn verify_artifact(
    path: &Path,
    entry: &str,
    field: &FieldPath,
    expected: &str,
) -> Result<Comparison> {
    let found = archive::locate_entry(path, entry)?.ok_or_else(|| DropcheckError::EntryNotFound {
        entry: entry.to_owned(),
        archive: path.to_path_buf(),
    })?;
    manifest::compare_field(&found.bytes, &found.path, field, expected)
}
