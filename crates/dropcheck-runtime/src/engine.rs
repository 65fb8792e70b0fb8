//! Scenario engine that drives one deployment check end to end.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::Utc;
use dropcheck_artifact::hash;
use dropcheck_artifact::manifest::FieldPath;
use dropcheck_common::config::ScenarioConfig;
use dropcheck_common::error::{DropcheckError, Result};
use dropcheck_common::types::ScenarioStage;
use dropcheck_platform::backend::{AppManifest, PlatformBackend};

use crate::context::ScenarioContext;
use crate::report::{ArtifactSummary, Outcome, ScenarioReport, StepFailure};
use crate::teardown::CleanupAction;
use crate::verify;

/// Forward-path result: the first failing step, if any.
type StepResult<T> = std::result::Result<T, StepFailure>;

/// Runs deployment-verification scenarios against a platform backend.
///
/// Every run generates fresh resource names, so one engine can run
/// scenarios repeatedly.
pub struct Engine {
    backend: Box<dyn PlatformBackend>,
    config: ScenarioConfig,
    field: FieldPath,
    expected: String,
    cancel: Arc<AtomicBool>,
}

impl Engine {
    /// Creates an engine for `config`.
    ///
    /// # Errors
    ///
    /// Returns `DropcheckError::Config` if the configuration is invalid or
    /// its field path cannot be parsed.
    pub fn new(backend: Box<dyn PlatformBackend>, config: ScenarioConfig) -> Result<Self> {
        config.validate()?;
        let field = FieldPath::parse(&config.field_path)?;
        let expected = config.expected_launch_command();
        Ok(Self {
            backend,
            config,
            field,
            expected,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Shares a cancellation flag. Setting it stops the forward path before
    /// its next step; teardown still runs.
    #[must_use]
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// The launch command the artifact must contain.
    #[must_use]
    pub fn expected_launch_command(&self) -> &str {
        &self.expected
    }

    /// Runs one scenario and tears it down.
    ///
    /// Failures never escape as errors: they are recorded in the report,
    /// next to any teardown failures.
    #[must_use]
    pub fn run(&self) -> ScenarioReport {
        let started_at = Utc::now();
        let mut ctx = ScenarioContext::new(
            self.backend.as_ref(),
            &self.config,
            Arc::clone(&self.cancel),
        );
        let span = tracing::info_span!(
            "scenario",
            id = %ctx.id(),
            app = %ctx.app_name(),
            record = %ctx.credential_name()
        );
        let _enter = span.enter();
        tracing::info!(expected = %self.expected, "scenario started");

        let mut artifact = None;
        let outcome = match self.forward(&mut ctx, &mut artifact) {
            Ok(()) => Outcome::Passed,
            Err(failure) => {
                tracing::error!(
                    step = %failure.step,
                    kind = %failure.kind,
                    error = %failure.message,
                    "scenario failed"
                );
                Outcome::Failed(failure)
            }
        };

        let recent_logs = match outcome {
            Outcome::Failed(_) if ctx.stage() >= ScenarioStage::AppPushed => {
                self.collect_logs(&ctx)
            }
            _ => None,
        };

        let scenario_id = ctx.id().clone();
        let app_name = ctx.app_name().clone();
        let credential_name = ctx.credential_name().clone();
        let artifact_path = ctx.artifact_path().to_path_buf();
        let reached = ctx.stage();
        let teardown = ctx.finish();

        let report = ScenarioReport {
            scenario_id,
            app_name,
            credential_name,
            artifact_path,
            reached,
            outcome,
            artifact,
            recent_logs,
            cleanup_actions_run: teardown.executed.len(),
            teardown_failures: teardown.failures,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            passed = report.passed(),
            reached = %report.reached,
            teardown_failures = report.teardown_failures.len(),
            "scenario finished"
        );
        report
    }

    /// Provisions, builds, fetches, and verifies. Stops at the first
    /// failing step.
    fn forward(
        &self,
        ctx: &mut ScenarioContext<'_>,
        artifact: &mut Option<ArtifactSummary>,
    ) -> StepResult<()> {
        let platform = self.backend.as_ref();
        let app = ctx.app_name().clone();
        let record = ctx.credential_name().clone();
        let fail = |step: ScenarioStage| move |e: DropcheckError| StepFailure::from_error(step, &e);

        // A failed create may mean the name is taken; only delete what we made.
        let step = ScenarioStage::CredentialCreated;
        ctx.checkpoint(step).map_err(fail(step))?;
        platform
            .create_credential_record(&record, &self.config.credential_payload())
            .map_err(fail(step))?;
        ctx.register(CleanupAction::DeleteCredential {
            record: record.clone(),
        });
        ctx.advance(step);

        // A failed push can leave a half-created app behind.
        let step = ScenarioStage::AppPushed;
        ctx.checkpoint(step).map_err(fail(step))?;
        ctx.register(CleanupAction::DeleteApp { app: app.clone() });
        let manifest = AppManifest {
            name: app.clone(),
            source_dir: self.config.fixture_dir.clone(),
            memory: self.config.memory.clone(),
            disk: self.config.disk.clone(),
            env: self.config.app_env(),
            buildpack: self.config.buildpack.clone(),
        };
        platform.push_app(&manifest).map_err(fail(step))?;
        ctx.advance(step);

        let step = ScenarioStage::CredentialBound;
        ctx.checkpoint(step).map_err(fail(step))?;
        platform.bind(&app, &record).map_err(fail(step))?;
        ctx.register(CleanupAction::UnbindCredential {
            app: app.clone(),
            record,
        });
        ctx.advance(step);

        let step = ScenarioStage::AppStarted;
        ctx.checkpoint(step).map_err(fail(step))?;
        platform.restart(&app).map_err(fail(step))?;
        ctx.advance(step);

        let step = ScenarioStage::ArtifactFetched;
        ctx.checkpoint(step).map_err(fail(step))?;
        let path = ctx.artifact_path().to_path_buf();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| DropcheckError::Io {
                    path: dir.to_path_buf(),
                    source: e,
                })
                .map_err(fail(step))?;
        }
        ctx.register(CleanupAction::RemoveFile { path: path.clone() });
        platform.fetch_artifact(&app, &path).map_err(fail(step))?;
        let digest = hash::digest_file(&path).map_err(fail(step))?;
        tracing::info!(sha256 = %digest.sha256, size_bytes = digest.size_bytes, "artifact fetched");
        *artifact = Some(ArtifactSummary::new(path.clone(), digest));
        ctx.advance(step);

        let step = ScenarioStage::ArtifactVerified;
        ctx.checkpoint(step).map_err(fail(step))?;
        let comparison =
            verify::verify_artifact(&path, &self.config.entry_path, &self.field, &self.expected)
                .map_err(fail(step))?;
        if !comparison.matched() {
            return Err(StepFailure::mismatch(step, self.field.as_str(), &comparison));
        }
        ctx.advance(step);
        Ok(())
    }

    fn collect_logs(&self, ctx: &ScenarioContext<'_>) -> Option<String> {
        match self.backend.recent_logs(ctx.app_name()) {
            Ok(logs) if !logs.trim().is_empty() => Some(logs),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, "could not retrieve recent logs");
                None
            }
        }
    }
}
