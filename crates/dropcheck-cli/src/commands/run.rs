//! `dropcheck run`: Run one deployment-verification scenario.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Args;
use dropcheck_common::config::ScenarioConfig;
use dropcheck_common::constants::BUILD_SESSION_ENV;
use dropcheck_platform::backend::PlatformBackend;
use dropcheck_platform::backend::cf::CfCliBackend;
use dropcheck_runtime::engine::Engine;
use dropcheck_runtime::report::ScenarioReport;

use crate::output;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scenario configuration file (YAML). Defaults apply when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Application source directory to push.
    #[arg(long)]
    pub fixture_dir: Option<PathBuf>,

    /// Token stored in the credential record.
    #[arg(long)]
    pub token: Option<String>,

    /// Build session identifier injected into the application.
    #[arg(long, env = BUILD_SESSION_ENV)]
    pub build_session_id: Option<String>,

    /// Buildpack to stage with.
    #[arg(short, long)]
    pub buildpack: Option<String>,

    /// Directory receiving the fetched droplet.
    #[arg(long)]
    pub artifact_dir: Option<PathBuf>,

    /// Path to the `cf` binary.
    #[arg(long, env = "DROPCHECK_CF_BINARY")]
    pub cf_binary: Option<PathBuf>,

    /// `CF_HOME` holding the CLI login and target.
    #[arg(long, env = "CF_HOME")]
    pub cf_home: Option<PathBuf>,

    /// Write the scenario report as JSON to this file.
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl RunArgs {
    /// Loads the configuration file, if any, and applies flag overrides.
    fn scenario_config(&self) -> anyhow::Result<ScenarioConfig> {
        let mut config = match &self.config {
            Some(path) => ScenarioConfig::load(path)?,
            None => ScenarioConfig::default(),
        };
        if let Some(dir) = &self.fixture_dir {
            config.fixture_dir.clone_from(dir);
        }
        if let Some(token) = &self.token {
            config.token.clone_from(token);
        }
        if let Some(session) = &self.build_session_id {
            config.build_session_id.clone_from(session);
        }
        if self.buildpack.is_some() {
            config.buildpack.clone_from(&self.buildpack);
        }
        if self.artifact_dir.is_some() {
            config.artifact_dir.clone_from(&self.artifact_dir);
        }
        if self.cf_binary.is_some() {
            config.cf_binary.clone_from(&self.cf_binary);
        }
        if self.cf_home.is_some() {
            config.cf_home.clone_from(&self.cf_home);
        }
        config.validate()?;
        Ok(config)
    }
}

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the `cf` CLI is not
/// usable, or the scenario does not pass.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    output::print_header();

    let config = args.scenario_config()?;
    if !config.fixture_dir.is_dir() {
        anyhow::bail!(
            "Fixture directory not found: {}\n\
             Point --fixture-dir (or fixture_dir in the config file) at the app to push.",
            config.fixture_dir.display()
        );
    }

    let backend = CfCliBackend::locate(config.cf_binary.as_deref())?
        .with_cf_home(config.cf_home.clone());
    if !backend.is_available() {
        anyhow::bail!(
            "{} cannot reach a Cloud Foundry target.\n\
             Run `cf login` and `cf target -o ORG -s SPACE` first.",
            backend.binary().display()
        );
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        tracing::warn!("interrupt received; stopping after the current step and tearing down");
        flag.store(true, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let engine = Engine::new(Box::new(backend), config)?.with_cancel_flag(cancel);
    output::print_expected(engine.expected_launch_command());

    let report = engine.run();
    output::print_report(&report);

    if let Some(path) = &args.report {
        write_report(&report, path)?;
        tracing::debug!(path = %path.display(), "report written");
        output::print_saved(path);
    }

    match report.failure() {
        None => Ok(()),
        Some(failure) => Err(anyhow::anyhow!(
            "scenario failed at {}: {}",
            failure.step,
            failure.kind
        )),
    }
}

/// Serializes `report` as pretty JSON to `path`.
fn write_report(report: &ScenarioReport, path: &Path) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::commands::{Cli, Command};

    fn parse(args: &[&str]) -> RunArgs {
        let cli = Cli::try_parse_from(std::iter::once("dropcheck").chain(args.iter().copied()))
            .expect("parse");
        match cli.command {
            Command::Run(args) => args,
            Command::Inspect(_) => unreachable!("parsed as run"),
        }
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("scenario.yml");
        std::fs::write(&path, "token: from-file\nmemory: 1G\n").expect("write");

        let args = parse(&[
            "run",
            "--config",
            path.to_str().expect("utf-8"),
            "--token",
            "from-flag",
            "--buildpack",
            "nodejs_buildpack",
        ]);
        let config = args.scenario_config().expect("config");

        assert_eq!(config.token, "from-flag");
        assert_eq!(config.memory, "1G");
        assert_eq!(config.buildpack.as_deref(), Some("nodejs_buildpack"));
    }

    #[test]
    fn empty_override_is_rejected() {
        let args = parse(&["run", "--token", ""]);
        assert!(args.scenario_config().is_err());
    }

    #[test]
    fn report_file_is_pretty_json() {
        use chrono::Utc;
        use dropcheck_common::types::{ResourceName, ScenarioId, ScenarioStage};
        use dropcheck_runtime::report::Outcome;

        let dir = tempfile::tempdir().expect("tempdir");
        let report = ScenarioReport {
            scenario_id: ScenarioId::new("s-1"),
            app_name: ResourceName::new("nodejs-sealights-a"),
            credential_name: ResourceName::new("sealights-b"),
            artifact_path: dir.path().join("droplet.tgz"),
            reached: ScenarioStage::ArtifactVerified,
            outcome: Outcome::Passed,
            artifact: None,
            recent_logs: None,
            teardown_failures: Vec::new(),
            cleanup_actions_run: 4,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        };
        let path = dir.path().join("report.json");

        write_report(&report, &path).expect("write");

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(json["outcome"]["status"], "passed");
        assert_eq!(json["reached"], "ArtifactVerified");
    }
}
