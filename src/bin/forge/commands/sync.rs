//! `forge sync` command

use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use super::load_workspace;
use crate::cli::SyncArgs;
use crate::GlobalOptions;
use forge::core::Workspace;
use forge::ops::{DriftKind, SyncOptions, Synchronizer};
use forge::templates::BuiltinTemplates;
use forge::util::process::display_invocation;
use forge::util::shell::{format_duration, Shell, Status};
use forge::util::{CommandOutput, CommandRunner, SystemRunner};
use forge::SyncReport;

/// `forge sync --check` found generated files that differ from disk.
#[derive(Debug, Error)]
#[error("{count} generated file(s) are out of date")]
pub struct OutOfDate {
    pub count: usize,
}

/// Runs external tools as subprocesses behind a shell spinner.
struct SpinnerRunner<'a> {
    shell: &'a Shell,
}

impl CommandRunner for SpinnerRunner<'_> {
    fn run(&self, program: &str, args: &[String], dir: &Path) -> Result<CommandOutput> {
        let invocation = display_invocation(program, args);
        let spinner = self.shell.spinner(Status::Running, &invocation);
        let output = SystemRunner.run(program, args, dir);
        let elapsed = spinner.finish();
        self.shell.verbose(
            Status::Finished,
            format!("`{}` in {}", invocation, format_duration(elapsed)),
        );
        output
    }
}

pub fn execute(args: SyncArgs, opts: &GlobalOptions) -> Result<()> {
    let ws = load_workspace(opts)?;

    if args.check {
        return check(&ws, opts);
    }

    let sync_opts = SyncOptions {
        dry_run: args.dry_run,
        run_tools: !args.no_tools,
    };
    run_sync(&ws, &sync_opts, opts)
}

/// Sync `ws` and print the outcome. In JSON mode the report is the only
/// output.
pub fn run_sync(ws: &Workspace, sync_opts: &SyncOptions, opts: &GlobalOptions) -> Result<()> {
    let shell = &opts.shell;
    let runner = SpinnerRunner { shell };
    let synchronizer = Synchronizer::new(ws, &runner, &BuiltinTemplates);

    shell.status(Status::Syncing, format!("workspace `{}`", ws.name()));
    let report = synchronizer.sync(sync_opts)?;

    if shell.is_json() {
        let value = serde_json::to_value(&report).context("failed to serialize sync report")?;
        shell.json_event(&value);
    }

    print_report(shell, &report);
    Ok(())
}

fn check(ws: &Workspace, opts: &GlobalOptions) -> Result<()> {
    let shell = &opts.shell;
    shell.status(Status::Checking, format!("workspace `{}`", ws.name()));

    let drift = Synchronizer::new(ws, &SystemRunner, &BuiltinTemplates).check()?;

    if shell.is_json() {
        let value = serde_json::to_value(&drift).context("failed to serialize drift")?;
        shell.json_event(&value);
    }

    for d in &drift {
        shell.status(
            Status::Drift,
            format!("{} ({})", d.path.display(), drift_label(d.kind)),
        );
    }

    if drift.is_empty() {
        shell.status(Status::Finished, "generated files are up to date");
        Ok(())
    } else {
        Err(OutOfDate { count: drift.len() }.into())
    }
}

fn drift_label(kind: DriftKind) -> &'static str {
    match kind {
        DriftKind::Missing => "missing",
        DriftKind::Changed => "changed",
        DriftKind::Stale => "stale",
    }
}

fn print_report(shell: &Shell, report: &SyncReport) {
    for path in &report.modified_files {
        shell.status(Status::Updated, path.display());
    }
    for path in report.removed_files() {
        shell.status(Status::Removed, path.display());
    }
    for path in &report.created_files {
        if !report.modified_files.contains(path) {
            shell.verbose(Status::Skipped, format!("{} (unchanged)", path.display()));
        }
    }

    shell.status(Status::Finished, summary(report));
}

/// One-line summary of a sync report.
fn summary(report: &SyncReport) -> String {
    let mut line = if report.has_changes() {
        format!(
            "{} file(s) written, {} changed, {} removed",
            report.created_files.len(),
            report.modified_files.len(),
            report.removed_files().len()
        )
    } else {
        "generated files already up to date".to_string()
    };

    if !report.errors.is_empty() {
        line.push_str(&format!(", {} warning(s)", report.errors.len()));
    }
    if report.dry_run {
        line.push_str(" (dry run)");
    }
    line
}
