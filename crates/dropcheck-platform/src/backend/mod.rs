//! Platform backend abstraction for the application lifecycle.

pub mod cf;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dropcheck_common::error::Result;
use dropcheck_common::types::ResourceName;

/// Everything the platform needs to stage an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppManifest {
    /// Application name.
    pub name: ResourceName,
    /// Directory holding the application source.
    pub source_dir: PathBuf,
    /// Memory quota (for example `256M`).
    pub memory: String,
    /// Disk quota (for example `512M`).
    pub disk: String,
    /// Environment variables set before the first start.
    pub env: BTreeMap<String, String>,
    /// Buildpack to stage with, if pinned.
    pub buildpack: Option<String>,
}

/// Lifecycle operations of the hosting platform.
///
/// Every call blocks until the platform has finished the operation and
/// reports failure as `DropcheckError::Platform`. Implementations do not
/// retry.
pub trait PlatformBackend: Send + Sync {
    /// Creates a named credential record holding `payload`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform rejects the record (name collision,
    /// quota).
    fn create_credential_record(
        &self,
        name: &ResourceName,
        payload: &serde_json::Value,
    ) -> Result<()>;

    /// Deletes a credential record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be deleted.
    fn delete_credential_record(&self, name: &ResourceName) -> Result<()>;

    /// Stages the application without starting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the push or any environment update fails.
    fn push_app(&self, manifest: &AppManifest) -> Result<()>;

    /// Binds a credential record to an application.
    ///
    /// # Errors
    ///
    /// Returns an error if the binding cannot be created.
    fn bind(&self, app: &ResourceName, record: &ResourceName) -> Result<()>;

    /// Removes the binding between an application and a credential record.
    ///
    /// # Errors
    ///
    /// Returns an error if the binding cannot be removed.
    fn unbind(&self, app: &ResourceName, record: &ResourceName) -> Result<()>;

    /// Starts or restarts the application, running its build.
    ///
    /// # Errors
    ///
    /// Returns an error if staging or startup fails.
    fn restart(&self, app: &ResourceName) -> Result<()>;

    /// Deletes the application and its routes.
    ///
    /// # Errors
    ///
    /// Returns an error if the application cannot be deleted.
    fn delete_app(&self, app: &ResourceName) -> Result<()>;

    /// Downloads the application's deployment artifact to `dest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact cannot be downloaded.
    fn fetch_artifact(&self, app: &ResourceName, dest: &Path) -> Result<()>;

    /// Returns the application's recent log lines.
    ///
    /// # Errors
    ///
    /// Returns an error if logs cannot be retrieved.
    fn recent_logs(&self, app: &ResourceName) -> Result<String> {
        let _ = app;
        Ok(String::new())
    }

    /// Returns whether this backend can reach its platform.
    fn is_available(&self) -> bool;
}
