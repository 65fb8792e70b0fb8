//! Scenario reports.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use dropcheck_artifact::hash::FileDigest;
use dropcheck_artifact::manifest::Comparison;
use dropcheck_common::error::{DropcheckError, FailureKind};
use dropcheck_common::types::{ResourceName, ScenarioId, ScenarioStage};
use serde::Serialize;

use crate::teardown::TeardownFailure;

/// The first failure of a scenario's forward path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    /// Stage that was being attempted.
    pub step: ScenarioStage,
    /// Failure class.
    pub kind: FailureKind,
    /// Human-readable description.
    pub message: String,
    /// Normalized expected value, for assertion mismatches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Normalized actual value, for assertion mismatches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl StepFailure {
    /// Builds a failure from an error raised while attempting `step`.
    #[must_use]
    pub fn from_error(step: ScenarioStage, error: &DropcheckError) -> Self {
        Self {
            step,
            kind: error.kind(),
            message: error.to_string(),
            expected: None,
            actual: None,
        }
    }

    /// Builds an assertion mismatch carrying both normalized strings.
    #[must_use]
    pub fn mismatch(step: ScenarioStage, field: &str, comparison: &Comparison) -> Self {
        Self {
            step,
            kind: FailureKind::AssertionMismatch,
            message: format!(
                "{field} mismatch: expected {:?}, actual {:?}",
                comparison.expected, comparison.actual
            ),
            expected: Some(comparison.expected.clone()),
            actual: Some(comparison.actual.clone()),
        }
    }
}

/// Verdict of the forward path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Every step succeeded and the launch command matched.
    Passed,
    /// A step failed.
    Failed(StepFailure),
}

/// Location and fingerprint of the fetched artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    /// Where the artifact was downloaded.
    pub path: PathBuf,
    /// Lowercase hex SHA-256.
    pub sha256: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

impl ArtifactSummary {
    /// Combines a download path with its digest.
    #[must_use]
    pub fn new(path: PathBuf, digest: FileDigest) -> Self {
        Self {
            path,
            sha256: digest.sha256,
            size_bytes: digest.size_bytes,
        }
    }
}

/// Everything known about one finished scenario.
///
/// Teardown failures are reported next to the outcome and never turn a
/// passed scenario into a failed one.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Run identifier.
    pub scenario_id: ScenarioId,
    /// Generated application name.
    pub app_name: ResourceName,
    /// Generated credential record name.
    pub credential_name: ResourceName,
    /// Local artifact path (removed during teardown).
    pub artifact_path: PathBuf,
    /// Last stage the forward path completed.
    pub reached: ScenarioStage,
    /// Verdict.
    pub outcome: Outcome,
    /// Artifact fingerprint, when the fetch succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactSummary>,
    /// Application logs captured after a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_logs: Option<String>,
    /// Cleanup actions that failed.
    pub teardown_failures: Vec<TeardownFailure>,
    /// Number of cleanup actions attempted.
    pub cleanup_actions_run: usize,
    /// When the scenario started.
    pub started_at: DateTime<Utc>,
    /// When teardown finished.
    pub finished_at: DateTime<Utc>,
}

impl ScenarioReport {
    /// Whether the forward path passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Passed)
    }

    /// The forward-path failure, if any.
    #[must_use]
    pub const fn failure(&self) -> Option<&StepFailure> {
        match &self.outcome {
            Outcome::Passed => None,
            Outcome::Failed(failure) => Some(failure),
        }
    }

    /// Whether every cleanup action succeeded.
    #[must_use]
    pub fn teardown_clean(&self) -> bool {
        self.teardown_failures.is_empty()
    }
}
