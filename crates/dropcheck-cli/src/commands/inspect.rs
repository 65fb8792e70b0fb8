//! `dropcheck inspect`: Check an artifact that is already on disk.

use std::path::PathBuf;

use clap::Args;
use dropcheck_artifact::hash;
use dropcheck_artifact::manifest::{Comparison, FieldPath};
use dropcheck_common::config::ScenarioConfig;
use dropcheck_runtime::verify;

use crate::output;

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the gzip-compressed tar artifact.
    pub artifact: PathBuf,

    /// Scenario configuration supplying the expected command and defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Exact entry path of the manifest inside the artifact.
    #[arg(long)]
    pub entry: Option<String>,

    /// Dotted path of the field to compare.
    #[arg(long)]
    pub field: Option<String>,

    /// Expected value; the configured launch command when omitted.
    #[arg(long)]
    pub expected: Option<String>,
}

/// Executes the `inspect` command.
///
/// # Errors
///
/// Returns an error if the artifact cannot be read, the field cannot be
/// found, or the value does not match.
pub fn execute(args: InspectArgs) -> anyhow::Result<()> {
    output::print_header();

    let config = match &args.config {
        Some(path) => ScenarioConfig::load(path)?,
        None => ScenarioConfig::default(),
    };
    let entry = args.entry.unwrap_or_else(|| config.entry_path.clone());
    let field = FieldPath::parse(args.field.as_deref().unwrap_or(&config.field_path))?;
    let expected = args
        .expected
        .unwrap_or_else(|| config.expected_launch_command());

    let digest = hash::digest_file(&args.artifact)?;
    output::print_artifact(&args.artifact, &digest);

    let comparison = verify::verify_artifact(&args.artifact, &entry, &field, &expected)?;
    output::print_comparison(&entry, &field, &comparison);
    ensure_matched(&field, &comparison)
}

fn ensure_matched(field: &FieldPath, comparison: &Comparison) -> anyhow::Result<()> {
    if comparison.matched() {
        Ok(())
    } else {
        Err(anyhow::anyhow!("{field} does not match the expected value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_becomes_an_error() {
        let field = FieldPath::parse("scripts.start").expect("field");
        assert!(ensure_matched(&field, &Comparison::new("a b", "ab")).is_ok());
        let err = ensure_matched(&field, &Comparison::new("a", "b")).expect_err("mismatch");
        assert!(err.to_string().contains("scripts.start"));
    }

    #[test]
    fn missing_artifact_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = InspectArgs {
            artifact: dir.path().join("absent.tgz"),
            config: None,
            entry: None,
            field: None,
            expected: None,
        };
        assert!(execute(args).is_err());
    }
}
