//! Test utilities and mocks for forge unit tests.
//!
//! Provides a scripted [`CommandRunner`] so that sync can be exercised
//! without `go` or `gazelle` installed, a [`Templates`] wrapper that records
//! every render request, and on-disk workspace builders in [`fixtures`].
//!
//! # Example
//!
//! ```rust,ignore
//! use forge::test_support::{MockRunner, WorkspaceFixture};
//!
//! let fixture = WorkspaceFixture::orders_and_web();
//! let runner = MockRunner::new();
//! runner.expect("gazelle", failed_output(1, "boom"));
//! ```

pub mod fixtures;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::templates::{BuiltinTemplates, Templates};
use crate::util::process::{display_invocation, CommandOutput, CommandRunner};

pub use fixtures::*;

/// A successful process result with the given stdout.
pub fn ok_output(stdout: impl Into<String>) -> CommandOutput {
    CommandOutput {
        status: Some(0),
        stdout: stdout.into(),
        stderr: String::new(),
    }
}

/// A failed process result with the given exit code and stderr.
pub fn failed_output(status: i32, stderr: impl Into<String>) -> CommandOutput {
    CommandOutput {
        status: Some(status),
        stdout: String::new(),
        stderr: stderr.into(),
    }
}

/// One invocation seen by [`MockRunner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
}

#[derive(Debug, Default)]
struct RunnerState {
    expectations: Vec<(String, CommandOutput)>,
    unstartable: Vec<String>,
    calls: Vec<RecordedCall>,
}

/// Scripted command runner.
///
/// Commands are matched against expectations by the prefix of their
/// rendered command line; the first match wins. Unmatched commands succeed
/// with empty output.
#[derive(Debug, Default)]
pub struct MockRunner {
    state: Mutex<RunnerState>,
}

impl MockRunner {
    pub fn new() -> Self {
        MockRunner::default()
    }

    /// Return `output` for any command line starting with `prefix`.
    pub fn expect(&self, prefix: &str, output: CommandOutput) -> &Self {
        if let Ok(mut state) = self.state.lock() {
            state.expectations.push((prefix.to_string(), output));
        }
        self
    }

    /// Make `program` fail to start, as if it were not installed.
    pub fn fail_to_start(&self, program: &str) -> &Self {
        if let Ok(mut state) = self.state.lock() {
            state.unstartable.push(program.to_string());
        }
        self
    }

    /// Every call seen so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state
            .lock()
            .map(|s| s.calls.clone())
            .unwrap_or_default()
    }

    /// Calls rendered as command lines.
    pub fn command_lines(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| display_invocation(&c.program, &c.args))
            .collect()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, program: &str, args: &[String], dir: &Path) -> Result<CommandOutput> {
        let Ok(mut state) = self.state.lock() else {
            bail!("mock runner state poisoned");
        };
        state.calls.push(RecordedCall {
            program: program.to_string(),
            args: args.to_vec(),
            dir: dir.to_path_buf(),
        });

        if state.unstartable.iter().any(|p| p == program) {
            bail!("failed to spawn `{}`", program);
        }

        let line = display_invocation(program, args);
        let output = state
            .expectations
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_else(|| ok_output(""));
        Ok(output)
    }
}

/// Renders through [`BuiltinTemplates`] and remembers every request.
#[derive(Debug, Default)]
pub struct RecordingTemplates {
    calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingTemplates {
    pub fn new() -> Self {
        RecordingTemplates::default()
    }

    /// `(template id, data)` pairs in request order.
    pub fn calls(&self) -> Vec<(String, serde_json::Value)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Ids of every requested template.
    pub fn ids(&self) -> Vec<String> {
        self.calls().into_iter().map(|(id, _)| id).collect()
    }
}

impl Templates for RecordingTemplates {
    fn render(&self, template: &str, data: &serde_json::Value) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((template.to_string(), data.clone()));
        }
        BuiltinTemplates.render(template, data)
    }
}

/// Shared sink for log lines written by [`capture_logs`].
#[derive(Clone, Default)]
struct LogSink(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Ok(mut bytes) = self.0.lock() {
            bytes.extend_from_slice(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a plain-text tracing subscriber installed on this thread.
/// Returns `f`'s result and everything it logged.
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let sink = LogSink::default();
    let writer = sink.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .finish();

    let value = tracing::subscriber::with_default(subscriber, f);
    let bytes = sink.0.lock().map(|b| b.clone()).unwrap_or_default();
    (value, String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::ids;

    #[test]
    fn test_mock_runner_matches_prefix() {
        let runner = MockRunner::new();
        runner.expect("go work", failed_output(1, "no go"));

        let dir = Path::new("/ws");
        let out = runner
            .run("go", &["work".into(), "sync".into()], dir)
            .unwrap();
        assert!(!out.success());
        assert_eq!(out.stderr, "no go");

        let out = runner.run("gazelle", &[], dir).unwrap();
        assert!(out.success());

        assert_eq!(runner.command_lines(), vec!["go work sync", "gazelle"]);
        assert_eq!(runner.calls()[0].dir, PathBuf::from("/ws"));
    }

    #[test]
    fn test_mock_runner_fail_to_start() {
        let runner = MockRunner::new();
        runner.fail_to_start("gazelle");
        assert!(runner.run("gazelle", &[], Path::new(".")).is_err());
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_recording_templates() {
        let templates = RecordingTemplates::new();
        let text = templates
            .render(ids::FIXTURES, &serde_json::json!({ "name": "migrations" }))
            .unwrap();
        assert!(text.contains("migrations"));
        assert_eq!(templates.ids(), vec![ids::FIXTURES.to_string()]);
    }

    #[test]
    fn test_capture_logs() {
        let (value, logs) = capture_logs(|| {
            tracing::warn!("first");
            tracing::debug!("hidden");
            7
        });
        assert_eq!(value, 7);
        assert!(logs.contains("WARN first"));
        assert!(!logs.contains("hidden"));
    }
}
