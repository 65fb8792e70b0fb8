//! Domain primitive types used across the dropcheck workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScenarioId(String);

impl ScenarioId {
    /// Creates a scenario ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random scenario ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a resource owned by one scenario on the remote platform
/// (an application or a credential record).
///
/// Generated names carry a random suffix so concurrent runs never
/// collide on the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceName(String);

impl ResourceName {
    /// Wraps an existing name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Generates `<prefix>-<suffix>` with a random lowercase hex suffix of
    /// `suffix_len` characters.
    #[must_use]
    pub fn generate(prefix: &str, suffix_len: usize) -> Self {
        Self(format!("{prefix}-{}", random_suffix(suffix_len)))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns `len` random lowercase hex characters.
#[must_use]
pub fn random_suffix(len: usize) -> String {
    let mut out = String::with_capacity(len + 32);
    while out.len() < len {
        out.push_str(&uuid::Uuid::new_v4().simple().to_string());
    }
    out.truncate(len);
    out
}

/// Position of a scenario in its linear lifecycle.
///
/// Forward stages are ordered; a report records the last stage the
/// forward path completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScenarioStage {
    /// Nothing has been provisioned yet.
    Init,
    /// The credential record exists on the platform.
    CredentialCreated,
    /// The application has been pushed without starting.
    AppPushed,
    /// The credential record is bound to the application.
    CredentialBound,
    /// The application was restarted and its build ran.
    AppStarted,
    /// The deployment artifact is on local disk.
    ArtifactFetched,
    /// The launch command inside the artifact was checked.
    ArtifactVerified,
    /// Cleanup actions are running.
    Teardown,
    /// The scenario is finished.
    Terminal,
}

impl fmt::Display for ScenarioStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::CredentialCreated => write!(f, "credential-created"),
            Self::AppPushed => write!(f, "app-pushed"),
            Self::CredentialBound => write!(f, "credential-bound"),
            Self::AppStarted => write!(f, "app-started"),
            Self::ArtifactFetched => write!(f, "artifact-fetched"),
            Self::ArtifactVerified => write!(f, "artifact-verified"),
            Self::Teardown => write!(f, "teardown"),
            Self::Terminal => write!(f, "terminal"),
        }
    }
}
