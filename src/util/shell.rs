//! Human and JSON output for the CLI.
//!
//! Progress goes to stderr as right-aligned status lines; `--json` silences
//! it and prints one JSON document per event on stdout instead. A spinner
//! covers external tools in normal mode.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// `--json`: only [`Shell::json_event`] prints.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Nothing but fatal errors
    Quiet,
    #[default]
    Normal,
    /// Every written file is listed
    Verbose,
}

/// `--color` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Color when stderr is a terminal
    #[default]
    Auto,
    Always,
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Verb printed in the status column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Created,
    Finished,
    Updated,
    Removed,
    Registered,
    Syncing,
    Running,
    Checking,
    Info,
    Skipped,
    Drift,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Created => "Created",
            Status::Finished => "Finished",
            Status::Updated => "Updated",
            Status::Removed => "Removed",
            Status::Registered => "Registered",
            Status::Syncing => "Syncing",
            Status::Running => "Running",
            Status::Checking => "Checking",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Drift => "Drift",
        }
    }

    fn color_code(&self) -> &'static str {
        match self {
            Status::Created
            | Status::Finished
            | Status::Updated
            | Status::Removed
            | Status::Registered => "\x1b[1;32m",
            Status::Syncing | Status::Running | Status::Checking => "\x1b[1;36m",
            Status::Info => "\x1b[1;34m",
            Status::Skipped | Status::Drift => "\x1b[1;33m",
        }
    }
}

const STATUS_WIDTH: usize = 12;

#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
}

impl Shell {
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell { mode, use_color }
    }

    /// `json` wins over `quiet` and `verbose`.
    pub fn from_flags(quiet: bool, verbose: bool, color: ColorChoice, json: bool) -> Self {
        let mode = if json {
            ShellMode::Json
        } else {
            let verbosity = if quiet {
                Verbosity::Quiet
            } else if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            };
            ShellMode::Human { verbosity, color }
        };

        Shell::new(mode)
    }

    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    /// Whether stderr output is colored.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// `{status:>12} {message}` on stderr, unless quiet or JSON.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() || self.is_quiet() {
            return;
        }
        eprintln!("{} {}", self.format_status(status), msg);
    }

    pub fn verbose(&self, status: Status, msg: impl Display) {
        if self.is_verbose() {
            self.status(status, msg);
        }
    }

    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// One line of JSON on stdout, in JSON mode only.
    pub fn json_event(&self, event: &serde_json::Value) {
        if !self.is_json() {
            return;
        }

        let json_str = serde_json::to_string(event).unwrap_or_default();
        println!("{}", json_str);
        let _ = io::stdout().flush();
    }

    fn format_status(&self, status: Status) -> String {
        let text = status.as_str();
        if self.use_color {
            format!("{}{:>w$}\x1b[0m", status.color_code(), text, w = STATUS_WIDTH)
        } else {
            format!("{:>w$}", text, w = STATUS_WIDTH)
        }
    }

    /// Spin while an external tool runs. Only normal mode on a terminal
    /// animates; verbose mode prints a status line instead.
    pub fn spinner(&self, status: Status, msg: impl Display) -> Spinner {
        let message = msg.to_string();
        let bar = if self.is_quiet() || self.is_json() || !io::stderr().is_terminal() {
            None
        } else if self.is_verbose() {
            self.status(status, &message);
            None
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
                pb.set_style(style);
            }
            pb.set_message(message.clone());
            pb.enable_steady_tick(Duration::from_millis(100));
            Some(pb)
        };

        Spinner {
            bar,
            start: Instant::now(),
        }
    }
}

/// Cleared when finished or dropped.
pub struct Spinner {
    bar: Option<ProgressBar>,
    start: Instant,
}

impl Spinner {
    /// Returns the time since the spinner started.
    pub fn finish(self) -> Duration {
        if let Some(pb) = &self.bar {
            pb.finish_and_clear();
        }
        self.start.elapsed()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(pb) = &self.bar {
            pb.finish_and_clear();
        }
    }
}

/// `0.50s` under a minute, `1.5m` above.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs < 60.0 {
        format!("{:.2}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}
