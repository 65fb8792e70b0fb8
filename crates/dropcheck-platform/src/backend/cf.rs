//! Cloud Foundry backend driving the `cf` command-line client.
//!
//! Credential records are user-provided services and artifacts are
//! droplets. The client must already be logged in and targeted at an org
//! and space; the harness never authenticates on its own.

use std::path::{Path, PathBuf};

use dropcheck_common::constants::CF_BINARY;
use dropcheck_common::error::{DropcheckError, Result};
use dropcheck_common::types::ResourceName;

use super::{AppManifest, PlatformBackend};
use crate::exec::{self, CommandOutput};

/// Backend that shells out to the `cf` CLI.
#[derive(Debug, Clone)]
pub struct CfCliBackend {
    binary: PathBuf,
    cf_home: Option<PathBuf>,
}

impl CfCliBackend {
    /// Creates a backend using the given `cf` binary.
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            cf_home: None,
        }
    }

    /// Resolves the `cf` binary, preferring an explicit path over `PATH`.
    ///
    /// # Errors
    ///
    /// Returns `DropcheckError::Config` if no binary can be found.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        let binary = match explicit {
            Some(path) => which::which(path),
            None => which::which(CF_BINARY),
        }
        .map_err(|e| DropcheckError::Config {
            message: format!("cannot find the {CF_BINARY} CLI ({e}); install it or set cf_binary"),
        })?;
        tracing::debug!(binary = %binary.display(), "resolved cf CLI");
        Ok(Self::new(binary))
    }

    /// Points the client at an alternate `CF_HOME` (login and target state).
    #[must_use]
    pub fn with_cf_home(mut self, cf_home: Option<PathBuf>) -> Self {
        self.cf_home = cf_home;
        self
    }

    /// Path of the `cf` binary in use.
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn envs(&self) -> Vec<(String, String)> {
        let mut envs = vec![("CF_COLOR".to_string(), "false".to_string())];
        if let Some(home) = &self.cf_home {
            envs.push(("CF_HOME".to_string(), home.to_string_lossy().into_owned()));
        }
        envs
    }

    /// Runs one `cf` command, mapping spawn errors and non-zero exits to
    /// `DropcheckError::Platform` for `operation`.
    fn run(&self, operation: &'static str, args: &[&str]) -> Result<CommandOutput> {
        let args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        let output = exec::run_command(&self.binary, &args, &self.envs()).map_err(|e| {
            DropcheckError::Platform {
                operation,
                message: e.to_string(),
            }
        })?;
        if !output.success() {
            return Err(DropcheckError::Platform {
                operation,
                message: output.diagnostic(),
            });
        }
        Ok(output)
    }
}

impl PlatformBackend for CfCliBackend {
    fn create_credential_record(
        &self,
        name: &ResourceName,
        payload: &serde_json::Value,
    ) -> Result<()> {
        tracing::info!(record = %name, "creating user-provided service");
        let payload = payload.to_string();
        let _ = self.run(
            "create-user-provided-service",
            &["create-user-provided-service", name.as_str(), "-p", payload.as_str()],
        )?;
        Ok(())
    }

    fn delete_credential_record(&self, name: &ResourceName) -> Result<()> {
        tracing::info!(record = %name, "deleting user-provided service");
        let _ = self.run("delete-service", &["delete-service", "-f", name.as_str()])?;
        Ok(())
    }

    fn push_app(&self, manifest: &AppManifest) -> Result<()> {
        tracing::info!(
            app = %manifest.name,
            source = %manifest.source_dir.display(),
            memory = %manifest.memory,
            disk = %manifest.disk,
            "pushing app without starting"
        );
        let source = manifest.source_dir.to_string_lossy();
        let mut args = vec![
            "push",
            manifest.name.as_str(),
            "-p",
            source.as_ref(),
            "-m",
            manifest.memory.as_str(),
            "-k",
            manifest.disk.as_str(),
            "--no-start",
        ];
        if let Some(buildpack) = &manifest.buildpack {
            args.extend(["-b", buildpack.as_str()]);
        }
        let _ = self.run("push", &args)?;

        for (key, value) in &manifest.env {
            tracing::debug!(app = %manifest.name, key = %key, "setting environment variable");
            let _ = self.run(
                "set-env",
                &["set-env", manifest.name.as_str(), key.as_str(), value.as_str()],
            )?;
        }
        Ok(())
    }

    fn bind(&self, app: &ResourceName, record: &ResourceName) -> Result<()> {
        tracing::info!(app = %app, record = %record, "binding service");
        let _ = self.run("bind-service", &["bind-service", app.as_str(), record.as_str()])?;
        Ok(())
    }

    fn unbind(&self, app: &ResourceName, record: &ResourceName) -> Result<()> {
        tracing::info!(app = %app, record = %record, "unbinding service");
        let _ = self.run(
            "unbind-service",
            &["unbind-service", app.as_str(), record.as_str()],
        )?;
        Ok(())
    }

    fn restart(&self, app: &ResourceName) -> Result<()> {
        tracing::info!(app = %app, "restarting app");
        let _ = self.run("restart", &["restart", app.as_str()])?;
        Ok(())
    }

    fn delete_app(&self, app: &ResourceName) -> Result<()> {
        tracing::info!(app = %app, "deleting app");
        let _ = self.run("delete", &["delete", "-f", "-r", app.as_str()])?;
        Ok(())
    }

    fn fetch_artifact(&self, app: &ResourceName, dest: &Path) -> Result<()> {
        tracing::info!(app = %app, dest = %dest.display(), "downloading droplet");
        let dest = dest.to_string_lossy();
        let _ = self.run(
            "download-droplet",
            &["download-droplet", app.as_str(), "--path", dest.as_ref()],
        )?;
        Ok(())
    }

    fn recent_logs(&self, app: &ResourceName) -> Result<String> {
        let output = self.run("logs", &["logs", app.as_str(), "--recent"])?;
        Ok(output.stdout)
    }

    fn is_available(&self) -> bool {
        self.run("target", &["target"]).is_ok()
    }
}
