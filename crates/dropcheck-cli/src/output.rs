//! Formatted output helpers for CLI commands.
//!
//! Progress and verdicts go to stderr with ANSI colors; machine-readable
//! reports are written to files.

use std::path::Path;

use dropcheck_artifact::hash::FileDigest;
use dropcheck_artifact::manifest::{Comparison, FieldPath};
use dropcheck_runtime::report::{ScenarioReport, StepFailure};

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Formats a byte count into a human-readable string (e.g., "128.0 MiB").
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = KIB * 1024;
    const GIB: u64 = MIB * 1024;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Formats a wall-clock duration given in milliseconds.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn format_elapsed(millis: i64) -> String {
    let millis = millis.max(0);
    if millis < 1000 {
        format!("{millis} ms")
    } else if millis < 60_000 {
        format!("{:.1} s", millis as f64 / 1000.0)
    } else {
        let secs = millis / 1000;
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// Plain-text description of a forward-path failure.
#[must_use]
pub fn failure_lines(failure: &StepFailure) -> Vec<String> {
    let mut lines = vec![
        format!("step:     {}", failure.step),
        format!("kind:     {}", failure.kind),
        format!("message:  {}", failure.message),
    ];
    if let Some(expected) = &failure.expected {
        lines.push(format!("expected: {expected}"));
    }
    if let Some(actual) = &failure.actual {
        lines.push(format!("actual:   {actual}"));
    }
    lines
}

pub fn print_header() {
    eprintln!();
    eprintln!("  {BOLD}dropcheck{RESET} {DIM}v{}{RESET}", env!("CARGO_PKG_VERSION"));
    eprintln!();
}

pub fn print_expected(expected: &str) {
    eprintln!("  {DIM}Expected launch command:{RESET} {expected}");
    eprintln!();
}

/// Prints the verdict, failure details, logs, and teardown problems.
pub fn print_report(report: &ScenarioReport) {
    let elapsed = (report.finished_at - report.started_at).num_milliseconds();

    eprintln!();
    eprintln!("  {DIM}scenario {}{RESET}", report.scenario_id);
    eprintln!("    app:     {BOLD}{}{RESET}", report.app_name);
    eprintln!("    record:  {BOLD}{}{RESET}", report.credential_name);
    eprintln!("    reached: {}", report.reached);
    if let Some(artifact) = &report.artifact {
        eprintln!(
            "    droplet: {} {DIM}sha256:{}{RESET}",
            format_bytes(artifact.size_bytes),
            artifact.sha256
        );
    }
    eprintln!();

    match report.failure() {
        None => eprintln!(
            "  {GREEN}{BOLD}PASSED{RESET} in {}",
            format_elapsed(elapsed)
        ),
        Some(failure) => {
            eprintln!("  {RED}{BOLD}FAILED{RESET} in {}", format_elapsed(elapsed));
            for line in failure_lines(failure) {
                eprintln!("    {line}");
            }
        }
    }

    if let Some(logs) = &report.recent_logs {
        eprintln!();
        eprintln!("  {CYAN}Recent logs:{RESET}");
        for line in logs.lines() {
            eprintln!("    {DIM}{line}{RESET}");
        }
    }

    eprintln!();
    if report.teardown_failures.is_empty() {
        eprintln!(
            "  {DIM}Teardown: {} action(s), all succeeded{RESET}",
            report.cleanup_actions_run
        );
    } else {
        eprintln!(
            "  {YELLOW}Teardown: {} of {} action(s) failed; resources may be left behind:{RESET}",
            report.teardown_failures.len(),
            report.cleanup_actions_run
        );
        for failure in &report.teardown_failures {
            eprintln!("    {YELLOW}●{RESET} {}: {}", failure.action, failure.message);
        }
    }
}

pub fn print_saved(path: &Path) {
    eprintln!("  {DIM}Report written to {}{RESET}", path.display());
}

pub fn print_artifact(path: &Path, digest: &FileDigest) {
    eprintln!(
        "  {BOLD}{}{RESET} {DIM}{} sha256:{}{RESET}",
        path.display(),
        format_bytes(digest.size_bytes),
        digest.sha256
    );
}

pub fn print_comparison(entry: &str, field: &FieldPath, comparison: &Comparison) {
    eprintln!("    {entry} {DIM}→{RESET} {field}");
    eprintln!("    expected: {}", comparison.expected);
    eprintln!("    actual:   {}", comparison.actual);
    eprintln!();
    if comparison.matched() {
        eprintln!("  {GREEN}{BOLD}MATCH{RESET}");
    } else {
        eprintln!("  {RED}{BOLD}MISMATCH{RESET}");
    }
}
