//! Unified error types for the dropcheck workspace.
//!
//! Every library crate returns [`DropcheckError`]. Scenario reports do not
//! carry the error itself; they carry its [`FailureKind`] and rendered
//! message, so a run can be summarized and serialized after the fact.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ScenarioStage;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum DropcheckError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The artifact is not a well-formed gzip-compressed tar stream.
    #[error("corrupt archive {path}: {message}")]
    CorruptArchive {
        /// Archive being read.
        path: PathBuf,
        /// What the decoder rejected.
        message: String,
    },

    /// The artifact ended before a header or entry body was complete.
    #[error("truncated archive {path}: {message}")]
    TruncatedArchive {
        /// Archive being read.
        path: PathBuf,
        /// Where the stream ran out.
        message: String,
    },

    /// The archive was read to the end without finding the target entry.
    #[error("entry {entry} not found in {archive}")]
    EntryNotFound {
        /// Exact entry path that was searched for.
        entry: String,
        /// Archive that was scanned.
        archive: PathBuf,
    },

    /// The manifest entry is not a valid JSON document.
    #[error("manifest {entry} is not valid JSON: {source}")]
    UnparseableManifest {
        /// Archive entry the manifest was read from.
        entry: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// A field path does not resolve to a string value.
    #[error("field {field} is missing: {reason}")]
    MissingField {
        /// Dotted field path that was requested.
        field: String,
        /// Which segment failed and why.
        reason: String,
    },

    /// A platform lifecycle call failed.
    #[error("platform operation {operation} failed: {message}")]
    Platform {
        /// Lifecycle operation name (for example `bind-service`).
        operation: &'static str,
        /// Diagnostic output returned by the platform.
        message: String,
    },

    /// The run was cancelled before the given stage could start.
    #[error("interrupted before reaching {stage}")]
    Interrupted {
        /// Stage that was about to start.
        stage: ScenarioStage,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A configuration file could not be parsed.
    #[error("invalid configuration file {path}: {source}")]
    ConfigFile {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
}

impl DropcheckError {
    /// Classifies this error into the reporting taxonomy.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Io { .. } => FailureKind::IoFailure,
            Self::CorruptArchive { .. } => FailureKind::CorruptArchive,
            Self::TruncatedArchive { .. } => FailureKind::TruncatedArchive,
            Self::EntryNotFound { .. } => FailureKind::EntryNotFound,
            Self::UnparseableManifest { .. } => FailureKind::UnparseableManifest,
            Self::MissingField { .. } => FailureKind::MissingField,
            Self::Platform { .. } => FailureKind::ProvisioningFailure,
            Self::Interrupted { .. } => FailureKind::Interrupted,
            Self::Config { .. } | Self::ConfigFile { .. } => FailureKind::Configuration,
        }
    }
}

/// Failure classes surfaced in scenario reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// A platform call on the forward path failed.
    ProvisioningFailure,
    /// The artifact could not be decompressed or its tar headers are invalid.
    CorruptArchive,
    /// The artifact stream ended early.
    TruncatedArchive,
    /// Reading the artifact failed at the operating-system level.
    #[serde(rename = "IOFailure")]
    IoFailure,
    /// The artifact does not contain the target entry.
    EntryNotFound,
    /// The manifest entry is not valid JSON.
    UnparseableManifest,
    /// The manifest lacks the requested string field.
    MissingField,
    /// The normalized launch command differs from the expected one.
    AssertionMismatch,
    /// A cleanup action failed.
    TeardownFailure,
    /// The run was cancelled.
    Interrupted,
    /// The scenario configuration is invalid.
    Configuration,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ProvisioningFailure => "ProvisioningFailure",
            Self::CorruptArchive => "CorruptArchive",
            Self::TruncatedArchive => "TruncatedArchive",
            Self::IoFailure => "IOFailure",
            Self::EntryNotFound => "EntryNotFound",
            Self::UnparseableManifest => "UnparseableManifest",
            Self::MissingField => "MissingField",
            Self::AssertionMismatch => "AssertionMismatch",
            Self::TeardownFailure => "TeardownFailure",
            Self::Interrupted => "Interrupted",
            Self::Configuration => "Configuration",
        };
        f.write_str(name)
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DropcheckError>;
