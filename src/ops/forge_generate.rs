//! Implementation of `forge generate`.
//!
//! A generator writes a project skeleton under the workspace's configured
//! paths, registers the project in `forge.json` and, for Go projects, lists
//! the new module in `go.work`. Build files are left to the next sync.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::manifest::WorkspacePaths;
use crate::core::project::{ArchitectTarget, Language, Project, ProjectType};
use crate::core::workspace::{Workspace, GO_WORK};
use crate::ops::forge_new::validate_name;
use crate::sync::registry::add_use_directive;
use crate::templates::scaffold::substitute;
use crate::templates::{render_record, Blueprint, ScaffoldRecord, Templates};
use crate::util::fs::{from_slash, write_string};

/// Kinds of project a generator can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    GoService,
    GoLibrary,
    NestService,
    AngularApp,
    ReactApp,
}

impl ProjectKind {
    pub fn language(&self) -> Language {
        match self {
            ProjectKind::GoService | ProjectKind::GoLibrary => Language::Go,
            ProjectKind::NestService => Language::NestJs,
            ProjectKind::AngularApp => Language::Angular,
            ProjectKind::ReactApp => Language::React,
        }
    }

    pub fn project_type(&self) -> ProjectType {
        match self {
            ProjectKind::GoService | ProjectKind::NestService => ProjectType::Service,
            ProjectKind::GoLibrary => ProjectType::Library,
            ProjectKind::AngularApp | ProjectKind::ReactApp => ProjectType::Application,
        }
    }

    pub fn blueprint(&self) -> Blueprint {
        match self {
            ProjectKind::GoService => Blueprint::GoService,
            ProjectKind::GoLibrary => Blueprint::GoLibrary,
            ProjectKind::NestService => Blueprint::NestService,
            ProjectKind::AngularApp => Blueprint::AngularApp,
            ProjectKind::ReactApp => Blueprint::ReactApp,
        }
    }

    fn base_dir<'p>(&self, paths: &'p WorkspacePaths) -> &'p str {
        match self.project_type() {
            ProjectType::Service => &paths.services,
            ProjectType::Library => &paths.libs,
            ProjectType::Application => &paths.apps,
        }
    }

    /// Default `architect` targets, keyed by target name.
    fn architect(&self, root: &str, name: &str) -> BTreeMap<String, ArchitectTarget> {
        let mut targets = BTreeMap::new();
        let mut add = |target: &str, builder: &str, label: String| {
            targets.insert(target.to_string(), ArchitectTarget::builder(builder, label));
        };

        match self {
            ProjectKind::GoService => {
                let server = format!("//{}/cmd/server", root);
                add("build", "forge:bazel-build", format!("{}:server", server));
                add("serve", "forge:bazel-run", format!("{}:server", server));
                add("image", "forge:bazel-run", format!("{}:server_image_load", server));
                add("test", "forge:bazel-test", format!("//{}/...", root));
            }
            ProjectKind::GoLibrary => {
                add("build", "forge:bazel-build", format!("//{}/...", root));
                add("test", "forge:bazel-test", format!("//{}/...", root));
            }
            ProjectKind::NestService => {
                add("build", "forge:bazel-build", format!("//{}:build", root));
                add("serve", "forge:bazel-run", format!("//{}:{}", root, name));
            }
            ProjectKind::AngularApp | ProjectKind::ReactApp => {
                add("build", "forge:bazel-build", format!("//{}:build", root));
            }
        }
        targets
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProjectKind::GoService => "go-service",
            ProjectKind::GoLibrary => "go-library",
            ProjectKind::NestService => "nest-service",
            ProjectKind::AngularApp => "angular-app",
            ProjectKind::ReactApp => "react-app",
        };
        f.write_str(s)
    }
}

/// What a generator wrote.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    pub name: String,
    /// Workspace-relative project root, `/`-separated
    pub root: String,
    /// Files written, relative to the workspace root
    pub files: Vec<PathBuf>,
    /// Whether `go.work` gained an entry
    pub registered_module: bool,
}

/// Go package identifier for a project name.
pub fn go_package_name(name: &str) -> String {
    name.to_lowercase().replace('-', "_")
}

/// Render every file of `blueprint` into `dir`. Returns the written paths
/// relative to `dir`.
pub fn write_blueprint(
    dir: &Path,
    blueprint: Blueprint,
    record: &ScaffoldRecord,
    templates: &dyn Templates,
) -> Result<Vec<PathBuf>> {
    let data = serde_json::to_value(record).context("failed to serialize scaffold data")?;
    let mut written = Vec::new();

    for (template, output) in blueprint.files() {
        let text = render_record(templates, template, record)?;
        let rel = from_slash(&substitute(output, &data));
        write_string(&dir.join(&rel), &text)?;
        tracing::debug!("wrote {}", rel.display());
        written.push(rel);
    }
    Ok(written)
}

/// Generate a project of `kind` named `name` in the workspace.
pub fn generate(
    ws: &Workspace,
    templates: &dyn Templates,
    kind: ProjectKind,
    name: &str,
) -> Result<GenerateResult> {
    if let Err(reason) = validate_name(name) {
        bail!("invalid project name `{}`: {}", name, reason);
    }

    let mut manifest = ws.manifest().clone();
    let root = format!(
        "{}/{}",
        kind.base_dir(&manifest.workspace.paths).trim_end_matches('/'),
        name
    );
    let mut project = Project::new(kind.project_type(), kind.language(), root.clone());
    project.architect = kind.architect(&root, name);
    project.tags.push(kind.language().to_string());
    manifest.add_project(name, project)?;

    let root_rel = from_slash(&root);
    let dir = ws.join(&root_rel);
    if dir.is_dir() && dir.read_dir().map(|mut d| d.next().is_some()).unwrap_or(false) {
        bail!("destination `{}` already exists and is not empty", root);
    }

    let tools = &manifest.workspace.tools;
    let record = ScaffoldRecord {
        name: name.to_string(),
        package: go_package_name(name),
        module: format!("{}/{}", manifest.module_prefix(), name),
        workspace: manifest.name().to_string(),
        go_version: tools.go.clone(),
        node_version: tools.node.clone(),
        bazel_version: tools.bazel.clone(),
    };

    tracing::info!("generating {} `{}` in {}", kind, name, root);
    let files = write_blueprint(&dir, kind.blueprint(), &record, templates)?
        .into_iter()
        .map(|f| root_rel.join(f))
        .collect();

    let registered_module = if kind.language() == Language::Go {
        register_module(ws, &root, &record.go_version)?
    } else {
        false
    };

    manifest.save(&ws.manifest_path())?;

    Ok(GenerateResult {
        name: name.to_string(),
        root,
        files,
        registered_module,
    })
}

/// List `dir` in `go.work`, creating the file if needed.
fn register_module(ws: &Workspace, dir: &str, go_version: &str) -> Result<bool> {
    let path = ws.join(GO_WORK);
    let current = if path.is_file() {
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?
    } else {
        format!("go {}\n", go_version)
    };

    match add_use_directive(&current, dir) {
        Some(updated) => {
            write_string(&path, &updated)?;
            tracing::info!("added ./{} to {}", dir, GO_WORK);
            Ok(true)
        }
        None => Ok(false),
    }
}
