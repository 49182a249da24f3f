//! User-friendly diagnostic messages.
//!
//! Every error printed by the CLI names the root cause, any context lines
//! that help locate it, and the command that fixes it.

use std::fmt;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when generated files are out of date.
    pub const STALE_BUILD_FILES: &str = "Run `forge sync` and commit the result";
}

/// A fatal error with its cause chain and suggested fixes.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let label = if color { "\x1b[1;31merror\x1b[0m" } else { "error" };
        output.push_str(&format!("{}: {}\n", label, self.message));

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        match self.suggestions.len() {
            0 => {}
            1 => output.push_str(&format!("  help: {}\n", self.suggestions[0])),
            _ => {
                output.push_str("  help: consider:\n");
                for (i, suggestion) in self.suggestions.iter().enumerate() {
                    output.push_str(&format!("    {}. {}\n", i + 1, suggestion));
                }
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("generated files are out of date")
            .with_context("3 files differ from what `forge sync` would write")
            .with_suggestion(suggestions::STALE_BUILD_FILES);

        let output = diag.format(false);
        assert_eq!(
            output,
            "error: generated files are out of date\n  = 3 files differ from what `forge sync` would write\n  help: Run `forge sync` and commit the result\n"
        );
        assert!(diag.format(true).starts_with("\x1b[1;31merror\x1b[0m: generated"));
    }

    #[test]
    fn test_multiple_suggestions_are_numbered() {
        let diag = Diagnostic::error("`go.work` not found")
            .with_suggestion("first")
            .with_suggestion("second");

        let output = diag.to_string();
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. first"));
        assert!(output.contains("2. second"));
    }
}
