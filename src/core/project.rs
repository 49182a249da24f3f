//! Projects registered in the workspace manifest.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::fs::from_slash;

/// Implementation language of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Go,
    #[serde(alias = "nest")]
    NestJs,
    Angular,
    React,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Go => "go",
            Language::NestJs => "nestjs",
            Language::Angular => "angular",
            Language::React => "react",
        }
    }

    /// Whether the project's build files are produced by source discovery
    /// rather than from its manifest registration alone.
    pub fn uses_discovery(&self) -> bool {
        matches!(self, Language::Go)
    }

    /// Whether the language builds through the npm/TypeScript toolchain.
    pub fn is_javascript(&self) -> bool {
        matches!(self, Language::NestJs | Language::Angular | Language::React)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "go" | "golang" => Ok(Language::Go),
            "nestjs" | "nest" => Ok(Language::NestJs),
            "angular" => Ok(Language::Angular),
            "react" => Ok(Language::React),
            _ => Err(format!(
                "unknown language '{}'; expected 'go', 'nestjs', 'angular', or 'react'",
                s
            )),
        }
    }
}

/// Role of a project in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    Service,
    Application,
    Library,
}

impl ProjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Service => "service",
            ProjectType::Application => "application",
            ProjectType::Library => "library",
        }
    }

    /// Services and applications are deployable roots; their modules
    /// inherit dependencies transitively and are never pinned.
    pub fn is_deployable(&self) -> bool {
        !matches!(self, ProjectType::Library)
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build/serve/deploy/test target descriptor in a project's `architect` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builder: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployer: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configurations: BTreeMap<String, BTreeMap<String, serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_configuration: Option<String>,
}

impl ArchitectTarget {
    /// A target driven by the given builder with a single `target` option.
    pub fn builder(builder: impl Into<String>, label: impl Into<String>) -> Self {
        let mut options = BTreeMap::new();
        options.insert(
            "target".to_string(),
            serde_json::Value::String(label.into()),
        );
        ArchitectTarget {
            builder: Some(builder.into()),
            options,
            ..Default::default()
        }
    }
}

/// A logical unit in the workspace manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub project_type: ProjectType,

    pub language: Language,

    /// Workspace-relative directory, `/`-separated
    pub root: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub architect: BTreeMap<String, ArchitectTarget>,
}

impl Project {
    pub fn new(project_type: ProjectType, language: Language, root: impl Into<String>) -> Self {
        Project {
            project_type,
            language,
            root: root.into(),
            tags: Vec::new(),
            architect: BTreeMap::new(),
        }
    }

    /// The project root as a relative path.
    pub fn root_path(&self) -> PathBuf {
        from_slash(&self.root)
    }

    /// Whether `path` is this project's root or lives under it.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(self.root_path())
    }
}
