//! Compensating actions and the best-effort teardown that runs them.
//!
//! Each resource-creating step registers the action that undoes it. At the
//! end of a scenario every registered action runs exactly once, newest
//! first, and a failing action never prevents the remaining ones from
//! running.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use dropcheck_common::error::{DropcheckError, FailureKind, Result};
use dropcheck_common::types::ResourceName;
use dropcheck_platform::backend::PlatformBackend;
use serde::Serialize;

/// Undo step for one provisioned resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupAction {
    /// Remove the binding between an application and a credential record.
    UnbindCredential {
        /// Bound application.
        app: ResourceName,
        /// Bound credential record.
        record: ResourceName,
    },
    /// Delete a credential record.
    DeleteCredential {
        /// Record to delete.
        record: ResourceName,
    },
    /// Delete an application.
    DeleteApp {
        /// Application to delete.
        app: ResourceName,
    },
    /// Delete a local file. A file that is already gone counts as removed.
    RemoveFile {
        /// File to delete.
        path: PathBuf,
    },
}

impl CleanupAction {
    /// Runs the action against the platform or the local filesystem.
    ///
    /// # Errors
    ///
    /// Returns the platform or I/O error of the underlying operation.
    pub fn execute(&self, platform: &dyn PlatformBackend) -> Result<()> {
        match self {
            Self::UnbindCredential { app, record } => platform.unbind(app, record),
            Self::DeleteCredential { record } => platform.delete_credential_record(record),
            Self::DeleteApp { app } => platform.delete_app(app),
            Self::RemoveFile { path } => match std::fs::remove_file(path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "file already absent");
                    Ok(())
                }
                Err(e) => Err(DropcheckError::Io {
                    path: path.clone(),
                    source: e,
                }),
            },
        }
    }
}

impl fmt::Display for CleanupAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnbindCredential { app, record } => write!(f, "unbind {record} from {app}"),
            Self::DeleteCredential { record } => write!(f, "delete credential record {record}"),
            Self::DeleteApp { app } => write!(f, "delete app {app}"),
            Self::RemoveFile { path } => write!(f, "remove {}", path.display()),
        }
    }
}

/// A cleanup action that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownFailure {
    /// Always [`FailureKind::TeardownFailure`]; kept so serialized reports
    /// carry the taxonomy name.
    pub kind: FailureKind,
    /// The action, rendered for humans.
    pub action: String,
    /// Why it failed.
    pub message: String,
}

/// Result of running a [`CleanupStack`].
#[derive(Debug, Default)]
pub struct TeardownOutcome {
    /// Actions that were attempted, in execution order.
    pub executed: Vec<CleanupAction>,
    /// Actions that failed.
    pub failures: Vec<TeardownFailure>,
}

/// Ordered list of registered cleanup actions.
#[derive(Debug, Default)]
pub struct CleanupStack {
    actions: Vec<CleanupAction>,
}

impl CleanupStack {
    /// Creates an empty stack.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Registers an action to run at teardown.
    pub fn register(&mut self, action: CleanupAction) {
        tracing::debug!(action = %action, "registered cleanup");
        self.actions.push(action);
    }

    /// Registered actions in registration order.
    #[must_use]
    pub fn actions(&self) -> &[CleanupAction] {
        &self.actions
    }

    /// Number of registered actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether no action is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Runs every action once, newest first, collecting failures.
    ///
    /// A panicking action is recorded as a failure like any other error, so
    /// the actions registered before it still run.
    pub fn run_all(self, platform: &dyn PlatformBackend) -> TeardownOutcome {
        let mut outcome = TeardownOutcome::default();
        for action in self.actions.into_iter().rev() {
            let error = match panic::catch_unwind(AssertUnwindSafe(|| action.execute(platform))) {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
            };
            match error {
                None => tracing::info!(action = %action, "cleanup done"),
                Some(message) => {
                    tracing::warn!(action = %action, error = %message, "cleanup failed");
                    outcome.failures.push(TeardownFailure {
                        kind: FailureKind::TeardownFailure,
                        action: action.to_string(),
                        message,
                    });
                }
            }
            outcome.executed.push(action);
        }
        outcome
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned())
}
