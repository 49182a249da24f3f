//! Result of one sync pass.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// A non-fatal problem encountered during a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncIssue {
    /// File or directory the issue concerns, workspace-relative when possible
    pub path: PathBuf,
    pub message: String,
}

impl SyncIssue {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SyncIssue {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SyncIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.as_os_str().is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path.display(), self.message)
        }
    }
}

/// Files touched by a sync, plus everything that went wrong along the way.
///
/// Paths are workspace-relative. Every generated file found before the
/// sync is `deleted` and every file the sync writes is `created`, so a file
/// regenerated in place appears in both. `modified` narrows that down to
/// files whose content actually changed (new files included) plus any
/// `go.mod` edited by the dependency fix-up.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub created_files: Vec<PathBuf>,
    pub deleted_files: Vec<PathBuf>,
    pub modified_files: Vec<PathBuf>,
    pub errors: Vec<SyncIssue>,
    pub dry_run: bool,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        SyncReport {
            dry_run,
            ..Default::default()
        }
    }

    /// Record a non-fatal issue and log it.
    pub fn warn(&mut self, issue: SyncIssue) {
        tracing::warn!("{}", issue);
        self.errors.push(issue);
    }

    /// Record issues that were already logged where they were found.
    pub fn extend_issues(&mut self, issues: impl IntoIterator<Item = SyncIssue>) {
        self.errors.extend(issues);
    }

    pub fn has_issues(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Files deleted and not written back.
    pub fn removed_files(&self) -> Vec<&PathBuf> {
        self.deleted_files
            .iter()
            .filter(|p| !self.created_files.contains(p))
            .collect()
    }

    /// Whether the pass changed anything on disk (or would have, in dry-run).
    pub fn has_changes(&self) -> bool {
        !self.modified_files.is_empty() || !self.removed_files().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_display() {
        let issue = SyncIssue::new("backend/libs/bad/go.mod", "missing module directive");
        assert_eq!(issue.to_string(), "backend/libs/bad/go.mod: missing module directive");

        let issue = SyncIssue::new("", "gazelle failed");
        assert_eq!(issue.to_string(), "gazelle failed");
    }

    #[test]
    fn test_report_changes() {
        let mut report = SyncReport::new(true);
        assert!(!report.has_changes());
        assert!(report.dry_run);

        report.created_files.push(PathBuf::from("MODULE.bazel"));
        report.deleted_files.push(PathBuf::from("MODULE.bazel"));
        assert!(!report.has_changes());

        report.deleted_files.push(PathBuf::from("old/BUILD.bazel"));
        assert!(report.has_changes());
        assert_eq!(report.removed_files(), vec![&PathBuf::from("old/BUILD.bazel")]);

        report.warn(SyncIssue::new("x.go", "no package clause"));
        assert!(report.has_issues());
    }

    #[test]
    fn test_warn_logs_but_extend_does_not() {
        let (report, logs) = crate::test_support::capture_logs(|| {
            let mut report = SyncReport::new(false);
            report.warn(SyncIssue::new("", "gazelle failed"));
            report.extend_issues([SyncIssue::new("a/go.mod", "missing module directive")]);
            report
        });
        assert_eq!(report.errors.len(), 2);
        assert!(logs.contains("gazelle failed"));
        assert!(!logs.contains("missing module directive"));
    }
}
