//! Global context for forge operations.
//!
//! Provides centralized access to the working directory, the user's forge
//! home (global config), and output preferences.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::manifest::{find_manifest, ManifestError};

/// Environment variable overriding the forge home directory.
pub const HOME_ENV: &str = "FORGE_HOME";

/// Global context containing configuration paths and preferences.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for global forge data (~/.forge/)
    home: PathBuf,

    /// Whether to use verbose output
    verbose: bool,
}

impl GlobalContext {
    /// Create a context for the current directory. `FORGE_HOME` overrides
    /// the forge home directory.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let ctx = Self::with_cwd(cwd)?;
        Ok(match std::env::var_os(HOME_ENV) {
            Some(home) if !home.is_empty() => ctx.with_home(PathBuf::from(home)),
            _ => ctx,
        })
    }

    /// Create a context rooted at a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        let home = crate::util::config::global_config_dir()
            .unwrap_or_else(|| PathBuf::from(".forge"));

        Ok(GlobalContext {
            cwd,
            home,
            verbose: false,
        })
    }

    /// Override the forge home directory.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global config file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Find the workspace root (directory containing `forge.json`) starting
    /// from cwd and searching upward.
    pub fn find_workspace_root(&self) -> Result<PathBuf, ManifestError> {
        let mut current = self.cwd.clone();
        loop {
            if let Ok(manifest) = find_manifest(&current) {
                if let Some(parent) = manifest.parent() {
                    return Ok(parent.to_path_buf());
                }
            }
            if !current.pop() {
                return Err(ManifestError::NotFound {
                    dir: self.cwd.clone(),
                });
            }
        }
    }
}
