//! `forge.json` workspace manifest parsing and schema.
//!
//! The manifest is the registry of every project in the workspace. It is
//! owned by the generators (which add projects) and read by the sync
//! engine, which never mutates it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::project::{Language, Project};
use crate::util::fs::from_slash;

/// Canonical manifest file name.
pub const MANIFEST_NAME: &str = "forge.json";

/// Schema reference written into new manifests.
pub const SCHEMA_URL: &str = "https://forge.dev/schemas/workspace.schema.json";

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// Errors raised while loading or editing the manifest.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("could not find `forge.json` in `{}` or any parent directory", dir.display())]
    #[diagnostic(
        code(forge::manifest::not_found),
        help("Run `forge new <name>` to create a workspace")
    )]
    NotFound { dir: PathBuf },

    #[error("failed to read `{}`", path.display())]
    #[diagnostic(code(forge::manifest::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse `{}`", path.display())]
    #[diagnostic(code(forge::manifest::parse))]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid manifest `{}`: {message}", path.display())]
    #[diagnostic(code(forge::manifest::invalid))]
    Invalid { path: PathBuf, message: String },

    #[error("project `{name}` is already registered")]
    #[diagnostic(
        code(forge::manifest::duplicate),
        help("Choose a different name or remove the existing entry from forge.json")
    )]
    DuplicateProject { name: String },

    #[error("root `{root}` is already used by project `{owner}`")]
    #[diagnostic(code(forge::manifest::root_taken))]
    RootTaken { root: String, owner: String },
}

/// Pinned tool versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolVersions {
    pub go: String,
    pub node: String,
    pub bazel: String,
}

impl Default for ToolVersions {
    fn default() -> Self {
        ToolVersions {
            go: "1.22.5".to_string(),
            node: "20.11.0".to_string(),
            bazel: "7.3.1".to_string(),
        }
    }
}

/// Where generators place new projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspacePaths {
    pub services: String,
    pub libs: String,
    pub apps: String,
}

impl Default for WorkspacePaths {
    fn default() -> Self {
        WorkspacePaths {
            services: "backend/services".to_string(),
            libs: "backend/libs".to_string(),
            apps: "frontend/apps".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerConfig {
    pub registry: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpConfig {
    pub project: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesConfig {
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

/// Workspace-wide metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceMetadata {
    pub name: String,

    /// Import path prefix for new Go modules, e.g. `github.com/acme/shop`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_prefix: Option<String>,

    #[serde(default)]
    pub tools: ToolVersions,

    #[serde(default)]
    pub paths: WorkspacePaths,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<DockerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gcp: Option<GcpConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes: Option<KubernetesConfig>,
}

/// The parsed `forge.json` manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceManifest {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    pub version: u32,

    pub workspace: WorkspaceMetadata,

    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
}

impl WorkspaceManifest {
    /// Create an empty manifest for a new workspace.
    pub fn new(name: impl Into<String>, module_prefix: Option<String>) -> Self {
        WorkspaceManifest {
            schema: Some(SCHEMA_URL.to_string()),
            version: MANIFEST_VERSION,
            workspace: WorkspaceMetadata {
                name: name.into(),
                module_prefix,
                tools: ToolVersions::default(),
                paths: WorkspacePaths::default(),
                github: None,
                docker: None,
                gcp: None,
                kubernetes: None,
            },
            projects: BTreeMap::new(),
        }
    }

    /// Load and validate a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Parse and validate manifest content.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ManifestError> {
        let manifest: WorkspaceManifest =
            serde_json::from_str(content).map_err(|source| ManifestError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        manifest
            .validate()
            .map_err(|message| ManifestError::Invalid {
                path: path.to_path_buf(),
                message,
            })?;

        Ok(manifest)
    }

    /// Check structural invariants that serde cannot express.
    fn validate(&self) -> Result<(), String> {
        if self.version == 0 || self.version > MANIFEST_VERSION {
            return Err(format!(
                "unsupported manifest version {} (expected {})",
                self.version, MANIFEST_VERSION
            ));
        }

        if self.workspace.name.trim().is_empty() {
            return Err("workspace name must not be empty".to_string());
        }

        let mut roots: BTreeMap<PathBuf, &str> = BTreeMap::new();
        for (name, project) in &self.projects {
            let root = Path::new(&project.root);
            if project.root.trim().is_empty() {
                return Err(format!("project `{}` has an empty root", name));
            }
            if root.is_absolute()
                || root
                    .components()
                    .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
            {
                return Err(format!(
                    "project `{}` root `{}` must be relative to the workspace",
                    name, project.root
                ));
            }
            if let Some(owner) = roots.insert(project.root_path(), name) {
                return Err(format!(
                    "projects `{}` and `{}` share the root `{}`",
                    owner, name, project.root
                ));
            }
        }

        Ok(())
    }

    /// Save the manifest as pretty JSON with a trailing newline.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        crate::util::fs::write_string(path, &json)
    }

    /// Register a new project.
    pub fn add_project(&mut self, name: &str, project: Project) -> Result<(), ManifestError> {
        if self.projects.contains_key(name) {
            return Err(ManifestError::DuplicateProject {
                name: name.to_string(),
            });
        }

        let new_root = from_slash(&project.root);
        if let Some((owner, _)) = self
            .projects
            .iter()
            .find(|(_, p)| p.root_path() == new_root)
        {
            return Err(ManifestError::RootTaken {
                root: project.root.clone(),
                owner: owner.clone(),
            });
        }

        self.projects.insert(name.to_string(), project);
        Ok(())
    }

    /// The distinct set of languages declared by registered projects.
    pub fn languages(&self) -> BTreeSet<Language> {
        self.projects.values().map(|p| p.language).collect()
    }

    /// Projects written in the given language, in name order.
    pub fn projects_in(&self, language: Language) -> impl Iterator<Item = (&String, &Project)> {
        self.projects
            .iter()
            .filter(move |(_, p)| p.language == language)
    }

    /// Name of the workspace.
    pub fn name(&self) -> &str {
        &self.workspace.name
    }

    /// Go module prefix, defaulting to `example.com/<workspace>`.
    pub fn module_prefix(&self) -> String {
        self.workspace
            .module_prefix
            .clone()
            .unwrap_or_else(|| format!("example.com/{}", self.workspace.name))
    }
}

/// Look for the manifest in `dir` (no upward search).
pub fn find_manifest(dir: &Path) -> Result<PathBuf, ManifestError> {
    let candidate = dir.join(MANIFEST_NAME);
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(ManifestError::NotFound {
            dir: dir.to_path_buf(),
        })
    }
}
