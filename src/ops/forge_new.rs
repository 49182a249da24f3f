//! Implementation of `forge new`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::core::manifest::{WorkspaceManifest, MANIFEST_NAME};
use crate::ops::forge_generate::{go_package_name, write_blueprint};
use crate::templates::{Blueprint, ScaffoldRecord, Templates};
use crate::util::config::{project_config_path, starter_config};
use crate::util::fs::write_string;

/// Options for creating a new workspace.
#[derive(Debug, Clone)]
pub struct NewOptions {
    /// Workspace name
    pub name: String,

    /// Go module prefix; defaults to `example.com/<name>`
    pub module_prefix: Option<String>,
}

/// Check that a workspace or project name is usable as a directory name,
/// a Bazel package segment and (after `-` → `_`) a Go package name.
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name cannot be empty");
    }

    if name.starts_with('-') || name.starts_with('_') {
        return Err("name cannot start with a hyphen or underscore");
    }

    if name.starts_with('.') {
        return Err("name cannot start with a dot");
    }

    for c in name.chars() {
        if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
            return Err("name contains invalid characters");
        }
    }

    Ok(())
}

/// Create a new workspace at `path`. Returns the files written, relative
/// to `path`.
pub fn new_workspace(
    path: &Path,
    opts: &NewOptions,
    templates: &dyn Templates,
) -> Result<Vec<PathBuf>> {
    if let Err(reason) = validate_name(&opts.name) {
        bail!("invalid workspace name `{}`: {}", opts.name, reason);
    }

    if path.is_file() {
        bail!("destination `{}` is a file", path.display());
    }
    if path.is_dir() {
        let occupied = fs::read_dir(path)
            .with_context(|| format!("failed to read directory: {}", path.display()))?
            .next()
            .is_some();
        if occupied {
            bail!(
                "destination `{}` already exists and is not empty",
                path.display()
            );
        }
    }

    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))?;

    let manifest = WorkspaceManifest::new(opts.name.clone(), opts.module_prefix.clone());
    let tools = &manifest.workspace.tools;
    let record = ScaffoldRecord {
        name: opts.name.clone(),
        package: go_package_name(&opts.name),
        module: manifest.module_prefix(),
        workspace: opts.name.clone(),
        go_version: tools.go.clone(),
        node_version: tools.node.clone(),
        bazel_version: tools.bazel.clone(),
    };

    let mut written = write_blueprint(path, Blueprint::Workspace, &record, templates)?;

    manifest.save(&path.join(MANIFEST_NAME))?;
    written.push(PathBuf::from(MANIFEST_NAME));

    let config_path = project_config_path(path);
    write_string(&config_path, &starter_config())?;
    written.push(PathBuf::from(".forge").join("config.toml"));

    tracing::info!("created workspace `{}` at {}", opts.name, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::BuiltinTemplates;
    use crate::util::config::Config;
    use tempfile::TempDir;

    fn opts(name: &str) -> NewOptions {
        NewOptions {
            name: name.to_string(),
            module_prefix: None,
        }
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("shop").is_ok());
        assert!(validate_name("my-shop_2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("-shop").is_err());
        assert!(validate_name("_shop").is_err());
        assert!(validate_name(".shop").is_err());
        assert!(validate_name("shop/orders").is_err());
        assert!(validate_name("shöp").is_err());
    }

    #[test]
    fn test_new_workspace() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("shop");

        let written = new_workspace(&dir, &opts("shop"), &BuiltinTemplates).unwrap();
        assert!(written.contains(&PathBuf::from("forge.json")));

        let manifest = WorkspaceManifest::load(&dir.join("forge.json")).unwrap();
        assert_eq!(manifest.name(), "shop");
        assert!(manifest.projects.is_empty());

        assert_eq!(
            fs::read_to_string(dir.join("go.work")).unwrap(),
            format!("go {}\n", manifest.workspace.tools.go)
        );
        assert_eq!(
            fs::read_to_string(dir.join(".bazelversion")).unwrap().trim(),
            manifest.workspace.tools.bazel
        );
        assert!(dir.join(".gitignore").is_file());

        let config = Config::load(&dir.join(".forge/config.toml")).unwrap();
        assert!(config.sync_config().run_tools);
    }

    #[test]
    fn test_new_workspace_with_module_prefix() {
        let tmp = TempDir::new().unwrap();
        let options = NewOptions {
            name: "shop".to_string(),
            module_prefix: Some("github.com/acme/shop".to_string()),
        };
        new_workspace(tmp.path(), &options, &BuiltinTemplates).unwrap();

        let manifest = WorkspaceManifest::load(&tmp.path().join("forge.json")).unwrap();
        assert_eq!(manifest.module_prefix(), "github.com/acme/shop");
    }

    #[test]
    fn test_new_workspace_refuses_non_empty_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("README.md"), "hi\n").unwrap();

        let err = new_workspace(tmp.path(), &opts("shop"), &BuiltinTemplates).unwrap_err();
        assert!(err.to_string().contains("not empty"));
        assert!(!tmp.path().join("forge.json").exists());
    }

    #[test]
    fn test_new_workspace_rejects_bad_name() {
        let tmp = TempDir::new().unwrap();
        let err = new_workspace(&tmp.path().join("x"), &opts("-x"), &BuiltinTemplates).unwrap_err();
        assert!(err.to_string().contains("invalid workspace name"));
    }
}
