//! Workspace - central configuration hub.
//!
//! A Workspace bundles the root directory, the loaded manifest, and the
//! resolved sync configuration. It is built once per command and passed
//! explicitly to every component that needs it.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::manifest::{WorkspaceManifest, MANIFEST_NAME};
use crate::util::config::{load_config, project_config_path, SyncConfig};
use crate::util::GlobalContext;

/// Top-level module descriptor written at the workspace root.
pub const MODULE_FILE: &str = "MODULE.bazel";

/// Multi-module registry file.
pub const GO_WORK: &str = "go.work";

/// Module-boundary file.
pub const GO_MOD: &str = "go.mod";

/// A loaded workspace.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    manifest: WorkspaceManifest,
    config: SyncConfig,
}

impl Workspace {
    /// Load the workspace rooted at `root`, merging global and project config.
    pub fn load(root: &Path, ctx: &GlobalContext) -> Result<Self> {
        let manifest = WorkspaceManifest::load(&root.join(MANIFEST_NAME))?;
        let config = load_config(&ctx.config_path(), &project_config_path(root)).sync_config();

        Ok(Workspace {
            root: root.to_path_buf(),
            manifest,
            config,
        })
    }

    /// Assemble a workspace from already-loaded parts.
    pub fn from_parts(root: PathBuf, manifest: WorkspaceManifest, config: SyncConfig) -> Self {
        Workspace {
            root,
            manifest,
            config,
        }
    }

    /// Get the workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &WorkspaceManifest {
        &self.manifest
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Get the workspace name.
    pub fn name(&self) -> &str {
        self.manifest.name()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    pub fn module_file_path(&self) -> PathBuf {
        self.root.join(MODULE_FILE)
    }

    pub fn go_work_path(&self) -> PathBuf {
        self.root.join(GO_WORK)
    }

    /// Absolute path of a workspace-relative path.
    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }
}
