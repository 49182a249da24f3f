//! Configuration file support for forge.
//!
//! forge reads two configuration file locations:
//! - Global: `~/.forge/config.toml` - user-wide defaults
//! - Project: `.forge/config.toml` - workspace-specific overrides
//!
//! Project config takes precedence over global config. Every key is
//! optional; [`Config::sync_config`] fills in the defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default name of generated per-package build files.
pub const DEFAULT_BUILD_FILE: &str = "BUILD.bazel";

/// Default name of a colocated fixtures directory.
pub const DEFAULT_FIXTURES_DIR: &str = "migrations";

/// Default subpath, relative to an ancestor directory, that provides
/// fixtures to every package below it.
pub const DEFAULT_FIXTURE_PROVIDER: &str = "db/migrations";

/// Default recursion cap for transitive fixture resolution.
pub const DEFAULT_MAX_FIXTURE_DEPTH: usize = 32;

/// forge configuration as written on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sync settings
    pub sync: SyncSettings,
}

/// Raw `[sync]` section. `None` means "not set at this layer".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// File name of generated build files
    pub build_file_name: Option<String>,

    /// Name of a package's colocated fixtures directory
    pub fixtures_dir: Option<String>,

    /// Ancestor-relative fixture provider location (e.g. `db/migrations`)
    pub fixture_provider_subpath: Option<String>,

    /// Substrings that mark an import as fixture-relevant
    pub relevance_keywords: Option<Vec<String>>,

    /// Recursion cap for transitive fixture resolution
    pub max_fixture_depth: Option<usize>,

    /// Extra directory names skipped while walking the tree
    pub skip_dirs: Option<Vec<String>>,

    /// Whether to run the external tidy and graph tools after a sync
    pub run_tools: Option<bool>,

    /// Dependency tidy command (program followed by arguments)
    pub tidy_command: Option<Vec<String>>,

    /// Graph resolution command (program followed by arguments)
    pub graph_command: Option<Vec<String>>,

    /// Modules that are only reached through blank imports
    pub indirect_deps: Option<Vec<IndirectDep>>,
}

/// A module that the tidy tool tends to drop because it is only
/// imported for side effects (SQL drivers and the like).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndirectDep {
    /// Module path, e.g. `github.com/lib/pq`
    pub module: String,

    /// Version to pin when re-inserting the requirement
    pub version: String,
}

impl IndirectDep {
    pub fn new(module: impl Into<String>, version: impl Into<String>) -> Self {
        IndirectDep {
            module: module.into(),
            version: version.into(),
        }
    }
}

/// Fully-resolved sync configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub build_file_name: String,
    pub fixtures_dir: String,
    pub fixture_provider_subpath: String,
    pub relevance_keywords: Vec<String>,
    pub max_fixture_depth: usize,
    pub skip_dirs: Vec<String>,
    pub run_tools: bool,
    pub tidy_command: Vec<String>,
    pub graph_command: Vec<String>,
    pub indirect_deps: Vec<IndirectDep>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            build_file_name: DEFAULT_BUILD_FILE.to_string(),
            fixtures_dir: DEFAULT_FIXTURES_DIR.to_string(),
            fixture_provider_subpath: DEFAULT_FIXTURE_PROVIDER.to_string(),
            relevance_keywords: vec!["test".to_string(), "migrat".to_string()],
            max_fixture_depth: DEFAULT_MAX_FIXTURE_DEPTH,
            skip_dirs: vec!["dist".to_string(), "target".to_string()],
            run_tools: true,
            tidy_command: vec!["go".to_string(), "work".to_string(), "sync".to_string()],
            graph_command: vec![
                "gazelle".to_string(),
                "update-repos".to_string(),
                "-from_file=go.work".to_string(),
            ],
            indirect_deps: vec![
                IndirectDep::new("github.com/lib/pq", "v1.10.9"),
                IndirectDep::new("github.com/jackc/pgx/v5", "v5.6.0"),
                IndirectDep::new("github.com/go-sql-driver/mysql", "v1.8.1"),
                IndirectDep::new("modernc.org/sqlite", "v1.33.1"),
            ],
        }
    }
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist
    /// or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let ours = &mut self.sync;
        let theirs = other.sync;

        if theirs.build_file_name.is_some() {
            ours.build_file_name = theirs.build_file_name;
        }
        if theirs.fixtures_dir.is_some() {
            ours.fixtures_dir = theirs.fixtures_dir;
        }
        if theirs.fixture_provider_subpath.is_some() {
            ours.fixture_provider_subpath = theirs.fixture_provider_subpath;
        }
        if theirs.relevance_keywords.is_some() {
            ours.relevance_keywords = theirs.relevance_keywords;
        }
        if theirs.max_fixture_depth.is_some() {
            ours.max_fixture_depth = theirs.max_fixture_depth;
        }
        if theirs.skip_dirs.is_some() {
            ours.skip_dirs = theirs.skip_dirs;
        }
        if theirs.run_tools.is_some() {
            ours.run_tools = theirs.run_tools;
        }
        if theirs.tidy_command.is_some() {
            ours.tidy_command = theirs.tidy_command;
        }
        if theirs.graph_command.is_some() {
            ours.graph_command = theirs.graph_command;
        }
        if theirs.indirect_deps.is_some() {
            ours.indirect_deps = theirs.indirect_deps;
        }
    }

    /// Resolve the `[sync]` section against the defaults.
    pub fn sync_config(&self) -> SyncConfig {
        let defaults = SyncConfig::default();
        let s = self.sync.clone();

        SyncConfig {
            build_file_name: s.build_file_name.unwrap_or(defaults.build_file_name),
            fixtures_dir: s.fixtures_dir.unwrap_or(defaults.fixtures_dir),
            fixture_provider_subpath: s
                .fixture_provider_subpath
                .unwrap_or(defaults.fixture_provider_subpath),
            relevance_keywords: s.relevance_keywords.unwrap_or(defaults.relevance_keywords),
            max_fixture_depth: s.max_fixture_depth.unwrap_or(defaults.max_fixture_depth),
            skip_dirs: s.skip_dirs.unwrap_or(defaults.skip_dirs),
            run_tools: s.run_tools.unwrap_or(defaults.run_tools),
            tidy_command: s.tidy_command.unwrap_or(defaults.tidy_command),
            graph_command: s.graph_command.unwrap_or(defaults.graph_command),
            indirect_deps: s.indirect_deps.unwrap_or(defaults.indirect_deps),
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.forge/config.toml)
/// 2. Global config (~/.forge/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global forge config directory (~/.forge).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".forge"))
}

/// Get the project config path (.forge/config.toml).
pub fn project_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".forge").join("config.toml")
}

/// Starter project config written by `forge new`.
pub fn starter_config() -> String {
    let defaults = SyncConfig::default();
    format!(
        r#"# forge workspace configuration.
# Every key is optional; the values below are the defaults.

[sync]
build_file_name = "{build}"
fixtures_dir = "{fixtures}"
fixture_provider_subpath = "{provider}"
run_tools = true
"#,
        build = defaults.build_file_name,
        fixtures = defaults.fixtures_dir,
        provider = defaults.fixture_provider_subpath,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default().sync_config();
        assert_eq!(config.build_file_name, "BUILD.bazel");
        assert_eq!(config.fixtures_dir, "migrations");
        assert_eq!(config.relevance_keywords, vec!["test", "migrat"]);
        assert!(config.run_tools);
    }

    #[test]
    fn test_project_overrides_global() {
        let tmp = TempDir::new().unwrap();
        let global = tmp.path().join("global.toml");
        let project = tmp.path().join("project.toml");

        std::fs::write(
            &global,
            "[sync]\nfixtures_dir = \"fixtures\"\nrun_tools = false\n",
        )
        .unwrap();
        std::fs::write(&project, "[sync]\nfixtures_dir = \"sql\"\n").unwrap();

        let config = load_config(&global, &project).sync_config();
        assert_eq!(config.fixtures_dir, "sql");
        assert!(!config.run_tools);
        assert_eq!(config.build_file_name, "BUILD.bazel");
    }

    #[test]
    fn test_indirect_deps_override() {
        let tmp = TempDir::new().unwrap();
        let project = tmp.path().join("config.toml");
        std::fs::write(
            &project,
            r#"
[[sync.indirect_deps]]
module = "github.com/mattn/go-sqlite3"
version = "v1.14.22"
"#,
        )
        .unwrap();

        let config = load_config(&tmp.path().join("missing.toml"), &project).sync_config();
        assert_eq!(
            config.indirect_deps,
            vec![IndirectDep::new("github.com/mattn/go-sqlite3", "v1.14.22")]
        );
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[sync\nbroken").unwrap();

        let config = Config::load_or_default(&path).sync_config();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_starter_config_parses() {
        let config: Config = toml::from_str(&starter_config()).unwrap();
        assert_eq!(config.sync_config(), SyncConfig::default());
    }
}
