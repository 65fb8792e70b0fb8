//! Per-run scenario state.
//!
//! The context owns the names generated for one run, the stage reached so
//! far, and the cleanup stack. It guarantees that registered cleanup runs:
//! explicitly through [`ScenarioContext::finish`], or from `Drop` if the
//! forward path unwinds.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dropcheck_common::config::ScenarioConfig;
use dropcheck_common::constants::{APP_SUFFIX_LEN, ARTIFACT_SUFFIX_LEN, CREDENTIAL_SUFFIX_LEN};
use dropcheck_common::error::{DropcheckError, Result};
use dropcheck_common::types::{self, ResourceName, ScenarioId, ScenarioStage};
use dropcheck_platform::backend::PlatformBackend;

use crate::teardown::{CleanupAction, CleanupStack, TeardownOutcome};

/// State of one scenario run.
pub struct ScenarioContext<'p> {
    id: ScenarioId,
    app_name: ResourceName,
    credential_name: ResourceName,
    artifact_path: PathBuf,
    stage: ScenarioStage,
    cancel: Arc<AtomicBool>,
    platform: &'p dyn PlatformBackend,
    cleanup: Option<CleanupStack>,
}

impl<'p> ScenarioContext<'p> {
    /// Generates fresh names for a run against `platform`.
    #[must_use]
    pub fn new(
        platform: &'p dyn PlatformBackend,
        config: &ScenarioConfig,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        let artifact_path = config.artifact_dir().join(format!(
            "droplet-{}.tgz",
            types::random_suffix(ARTIFACT_SUFFIX_LEN)
        ));
        Self {
            id: ScenarioId::generate(),
            app_name: ResourceName::generate(&config.app_prefix, APP_SUFFIX_LEN),
            credential_name: ResourceName::generate(
                &config.credential_prefix,
                CREDENTIAL_SUFFIX_LEN,
            ),
            artifact_path,
            stage: ScenarioStage::Init,
            cancel,
            platform,
            cleanup: Some(CleanupStack::new()),
        }
    }

    /// Run identifier.
    #[must_use]
    pub const fn id(&self) -> &ScenarioId {
        &self.id
    }

    /// Generated application name.
    #[must_use]
    pub const fn app_name(&self) -> &ResourceName {
        &self.app_name
    }

    /// Generated credential record name.
    #[must_use]
    pub const fn credential_name(&self) -> &ResourceName {
        &self.credential_name
    }

    /// Local path the artifact is downloaded to.
    #[must_use]
    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Last stage the forward path completed.
    #[must_use]
    pub const fn stage(&self) -> ScenarioStage {
        self.stage
    }

    /// Number of cleanup actions registered so far.
    #[must_use]
    pub fn pending_cleanup(&self) -> usize {
        self.cleanup.as_ref().map_or(0, CleanupStack::len)
    }

    /// Fails with `Interrupted` if cancellation was requested before
    /// `next` starts.
    ///
    /// # Errors
    ///
    /// Returns `DropcheckError::Interrupted` once the cancel flag is set.
    pub fn checkpoint(&self, next: ScenarioStage) -> Result<()> {
        if self.cancel.load(Ordering::SeqCst) {
            tracing::warn!(stage = %next, "cancellation requested");
            return Err(DropcheckError::Interrupted { stage: next });
        }
        Ok(())
    }

    /// Records that the forward path completed `stage`.
    pub fn advance(&mut self, stage: ScenarioStage) {
        tracing::info!(stage = %stage, "stage reached");
        self.stage = stage;
    }

    /// Registers the action that undoes a resource just provisioned.
    pub fn register(&mut self, action: CleanupAction) {
        if let Some(stack) = self.cleanup.as_mut() {
            stack.register(action);
        }
    }

    /// Runs every registered cleanup action and ends the run.
    pub fn finish(mut self) -> TeardownOutcome {
        self.stage = ScenarioStage::Teardown;
        let outcome = self.teardown();
        self.stage = ScenarioStage::Terminal;
        outcome
    }

    fn teardown(&mut self) -> TeardownOutcome {
        match self.cleanup.take() {
            Some(stack) => {
                tracing::info!(actions = stack.len(), "tearing down");
                stack.run_all(self.platform)
            }
            None => TeardownOutcome::default(),
        }
    }
}

impl Drop for ScenarioContext<'_> {
    fn drop(&mut self) {
        if self.cleanup.as_ref().is_some_and(|stack| !stack.is_empty()) {
            tracing::warn!(
                scenario = %self.id,
                stage = %self.stage,
                "scenario abandoned, running pending cleanup"
            );
            let outcome = self.teardown();
            for failure in &outcome.failures {
                tracing::warn!(
                    action = %failure.action,
                    error = %failure.message,
                    "cleanup failed during unwind"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use dropcheck_platform::backend::AppManifest;

    use super::*;

    #[derive(Default)]
    struct DeleteCounter {
        deleted: Mutex<Vec<String>>,
    }

    impl PlatformBackend for DeleteCounter {
        fn create_credential_record(&self, _: &ResourceName, _: &serde_json::Value) -> Result<()> {
            Ok(())
        }
        fn delete_credential_record(&self, name: &ResourceName) -> Result<()> {
            self.deleted.lock().unwrap().push(name.to_string());
            Ok(())
        }
        fn push_app(&self, _: &AppManifest) -> Result<()> {
            Ok(())
        }
        fn bind(&self, _: &ResourceName, _: &ResourceName) -> Result<()> {
            Ok(())
        }
        fn unbind(&self, _: &ResourceName, _: &ResourceName) -> Result<()> {
            Ok(())
        }
        fn restart(&self, _: &ResourceName) -> Result<()> {
            Ok(())
        }
        fn delete_app(&self, app: &ResourceName) -> Result<()> {
            self.deleted.lock().unwrap().push(app.to_string());
            Ok(())
        }
        fn fetch_artifact(&self, _: &ResourceName, _: &Path) -> Result<()> {
            Ok(())
        }
        fn is_available(&self) -> bool {
            true
        }
    }

    fn context(platform: &DeleteCounter) -> ScenarioContext<'_> {
        ScenarioContext::new(
            platform,
            &ScenarioConfig::default(),
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn generated_names_follow_configured_prefixes() {
        let platform = DeleteCounter::default();
        let ctx = context(&platform);
        assert!(ctx.app_name().as_str().starts_with("nodejs-sealights-"));
        assert_eq!(ctx.app_name().as_str().len(), "nodejs-sealights-".len() + APP_SUFFIX_LEN);
        assert!(ctx.credential_name().as_str().starts_with("sealights-"));
        let file = ctx.artifact_path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(file.starts_with("droplet-") && file.ends_with(".tgz"));
        assert_eq!(ctx.stage(), ScenarioStage::Init);
    }

    #[test]
    fn finish_runs_registered_actions_once() {
        let platform = DeleteCounter::default();
        let mut ctx = context(&platform);
        let record = ctx.credential_name().clone();
        ctx.register(CleanupAction::DeleteCredential { record: record.clone() });
        assert_eq!(ctx.pending_cleanup(), 1);

        let outcome = ctx.finish();

        assert_eq!(outcome.executed.len(), 1);
        assert_eq!(*platform.deleted.lock().unwrap(), vec![record.to_string()]);
    }

    #[test]
    fn drop_runs_pending_actions() {
        let platform = DeleteCounter::default();
        let app = {
            let mut ctx = context(&platform);
            let app = ctx.app_name().clone();
            ctx.register(CleanupAction::DeleteApp { app: app.clone() });
            app
        };
        assert_eq!(*platform.deleted.lock().unwrap(), vec![app.to_string()]);
    }

    #[test]
    fn checkpoint_honours_cancel_flag() {
        let platform = DeleteCounter::default();
        let cancel = Arc::new(AtomicBool::new(false));
        let ctx = ScenarioContext::new(&platform, &ScenarioConfig::default(), Arc::clone(&cancel));
        ctx.checkpoint(ScenarioStage::AppPushed).expect("not cancelled");
        cancel.store(true, Ordering::SeqCst);
        let err = ctx.checkpoint(ScenarioStage::AppPushed).expect_err("cancelled");
        assert!(matches!(err, DropcheckError::Interrupted { stage: ScenarioStage::AppPushed }));
    }
}
