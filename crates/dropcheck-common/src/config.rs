//! Scenario configuration model.
//!
//! A scenario is configured from an optional YAML file; every field has a
//! default, so an empty file (or no file) describes the stock
//! instrumentation check.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{DropcheckError, Result};

/// Configuration of one deployment-verification scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Application source directory pushed to the platform.
    pub fixture_dir: PathBuf,
    /// Prefix of the generated application name.
    pub app_prefix: String,
    /// Prefix of the generated credential record name.
    pub credential_prefix: String,
    /// Memory quota passed to the platform (for example `256M`).
    pub memory: String,
    /// Disk quota passed to the platform (for example `512M`).
    pub disk: String,
    /// Buildpack to stage with; the platform chooses when unset.
    pub buildpack: Option<String>,
    /// Build session identifier injected into the application environment.
    pub build_session_id: String,
    /// Token stored in the credential record.
    pub token: String,
    /// Script wrapped by the instrumented launch command.
    pub entry_point: String,
    /// Exact path of the manifest entry inside the artifact.
    pub entry_path: String,
    /// Dotted path of the launch command inside the manifest.
    pub field_path: String,
    /// Directory receiving fetched artifacts; the system temp dir when unset.
    pub artifact_dir: Option<PathBuf>,
    /// Explicit platform CLI binary; looked up on `PATH` when unset.
    pub cf_binary: Option<PathBuf>,
    /// `CF_HOME` handed to the platform CLI.
    pub cf_home: Option<PathBuf>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            fixture_dir: PathBuf::from(constants::DEFAULT_FIXTURE_DIR),
            app_prefix: constants::DEFAULT_APP_PREFIX.into(),
            credential_prefix: constants::DEFAULT_CREDENTIAL_PREFIX.into(),
            memory: constants::DEFAULT_MEMORY.into(),
            disk: constants::DEFAULT_DISK.into(),
            buildpack: None,
            build_session_id: constants::DEFAULT_BUILD_SESSION_ID.into(),
            token: constants::DEFAULT_TOKEN.into(),
            entry_point: constants::DEFAULT_ENTRY_POINT.into(),
            entry_path: constants::DEFAULT_ENTRY_PATH.into(),
            field_path: constants::DEFAULT_FIELD_PATH.into(),
            artifact_dir: None,
            cf_binary: None,
            cf_home: None,
        }
    }
}

impl ScenarioConfig {
    /// Loads a configuration file, filling unset fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid YAML,
    /// or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading scenario configuration");
        let content = std::fs::read_to_string(path).map_err(|e| DropcheckError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config = Self::from_yaml(&content).map_err(|e| match e {
            DropcheckError::ConfigFile { source, .. } => DropcheckError::ConfigFile {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        Ok(config)
    }

    /// Parses a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML or fails validation.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| DropcheckError::ConfigFile {
                path: PathBuf::from("<inline>"),
                source: e,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every value the scenario interpolates is present.
    ///
    /// # Errors
    ///
    /// Returns `DropcheckError::Config` naming the first empty field.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("app_prefix", &self.app_prefix),
            ("credential_prefix", &self.credential_prefix),
            ("memory", &self.memory),
            ("disk", &self.disk),
            ("build_session_id", &self.build_session_id),
            ("token", &self.token),
            ("entry_point", &self.entry_point),
            ("entry_path", &self.entry_path),
            ("field_path", &self.field_path),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DropcheckError::Config {
                    message: format!("{field} must not be empty"),
                });
            }
        }
        Ok(())
    }

    /// Builds the launch command the instrumentation step should produce.
    ///
    /// The result is compared after whitespace normalization, so the
    /// spacing of the template is not significant.
    #[must_use]
    pub fn expected_launch_command(&self) -> String {
        format!(
            "{} --token {} --buildsessionid {}  {}",
            constants::LAUNCH_COMMAND_TEMPLATE,
            self.token,
            self.build_session_id,
            self.entry_point
        )
    }

    /// Environment variables set on the application before it is started.
    #[must_use]
    pub fn app_env(&self) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        let _ = env.insert(
            constants::BUILD_SESSION_ENV.to_string(),
            self.build_session_id.clone(),
        );
        env
    }

    /// Document stored in the credential record.
    #[must_use]
    pub fn credential_payload(&self) -> serde_json::Value {
        let mut payload = serde_json::Map::new();
        let _ = payload.insert(
            constants::TOKEN_FIELD.to_string(),
            serde_json::Value::String(self.token.clone()),
        );
        serde_json::Value::Object(payload)
    }

    /// Directory that receives fetched artifacts.
    #[must_use]
    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn default_expected_command_matches_instrumented_start() {
        let config = ScenarioConfig::default();
        assert_eq!(
            strip(&config.expected_launch_command()),
            strip(
                "./node_modules/.bin/slnodejs run --useinitialcolor true --token token1 \
                 --buildsessionid bs1 ./dist/server.js"
            )
        );
    }

    #[test]
    fn default_env_and_payload() {
        let config = ScenarioConfig::default();
        assert_eq!(
            config.app_env().get("SL_BUILD_SESSION_ID").map(String::as_str),
            Some("bs1")
        );
        assert_eq!(config.credential_payload(), serde_json::json!({"token": "token1"}));
    }

    #[test]
    fn empty_yaml_yields_defaults() {
        let config = ScenarioConfig::from_yaml("  \n").expect("parse");
        assert_eq!(config, ScenarioConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_only_given_fields() {
        let config = ScenarioConfig::from_yaml("token: other\nmemory: 1G\n").expect("parse");
        assert_eq!(config.token, "other");
        assert_eq!(config.memory, "1G");
        assert_eq!(config.disk, "512M");
        assert!(config.expected_launch_command().contains("--token other"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ScenarioConfig::from_yaml("tokn: typo\n").expect_err("should fail");
        assert!(matches!(err, DropcheckError::ConfigFile { .. }));
    }

    #[test]
    fn empty_field_path_fails_validation() {
        let err = ScenarioConfig::from_yaml("field_path: \"\"\n").expect_err("should fail");
        assert!(err.to_string().contains("field_path"));
    }

    #[test]
    fn load_reads_file_and_reports_its_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("scenario.yml");
        std::fs::write(&good, "app_prefix: smoke\n").expect("write");
        assert_eq!(ScenarioConfig::load(&good).expect("load").app_prefix, "smoke");

        let bad = dir.path().join("bad.yml");
        std::fs::write(&bad, "memory: [unclosed\n").expect("write");
        let err = ScenarioConfig::load(&bad).expect_err("should fail");
        assert!(matches!(err, DropcheckError::ConfigFile { ref path, .. } if *path == bad));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = ScenarioConfig::load(Path::new("/nonexistent/scenario.yml"))
            .expect_err("should fail");
        assert!(matches!(err, DropcheckError::Io { .. }));
    }
}
