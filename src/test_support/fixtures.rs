//! On-disk workspace fixtures.
//!
//! [`WorkspaceFixture`] builds a real workspace inside a temporary
//! directory: a `forge.json`, a `go.work`, Go modules and source files.
//! Everything is written eagerly so tests can mix builder calls with
//! direct filesystem assertions.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::manifest::{WorkspaceManifest, MANIFEST_NAME};
use crate::core::project::{Language, Project, ProjectType};
use crate::core::workspace::{Workspace, GO_WORK};
use crate::sync::registry::add_use_directive;
use crate::util::config::SyncConfig;

/// A throwaway workspace on disk.
pub struct WorkspaceFixture {
    dir: TempDir,
    manifest: WorkspaceManifest,
    config: SyncConfig,
}

impl WorkspaceFixture {
    /// An empty workspace named `name` with module prefix
    /// `example.com/<name>`.
    pub fn new(name: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let manifest = WorkspaceManifest::new(name, Some(format!("example.com/{}", name)));
        let fixture = WorkspaceFixture {
            dir,
            manifest,
            config: SyncConfig::default(),
        };
        fixture.save_manifest();
        fixture
    }

    /// The `orders` Go service plus the `web` Angular app.
    pub fn orders_and_web() -> Self {
        let mut fixture = WorkspaceFixture::new("shop");
        fixture
            .project("orders", ProjectType::Service, Language::Go, "backend/services/orders")
            .go_module("backend/services/orders", "example.com/shop/orders")
            .file(
                "backend/services/orders/cmd/server/main.go",
                "package main\n\nimport \"fmt\"\n\nfunc main() { fmt.Println(\"orders\") }\n",
            )
            .project("web", ProjectType::Application, Language::Angular, "frontend/apps/web")
            .file("frontend/apps/web/package.json", "{ \"name\": \"web\" }\n");
        fixture
    }

    /// Register a project in `forge.json` and create its root.
    pub fn project(
        &mut self,
        name: &str,
        project_type: ProjectType,
        language: Language,
        root: &str,
    ) -> &mut Self {
        self.manifest
            .add_project(name, Project::new(project_type, language, root))
            .expect("register project");
        self.save_manifest();
        self.dir(root)
    }

    /// Write a file, creating parent directories.
    pub fn file(&mut self, rel: &str, contents: &str) -> &mut Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(&path, contents).expect("write fixture file");
        self
    }

    /// Create an empty directory.
    pub fn dir(&mut self, rel: &str) -> &mut Self {
        fs::create_dir_all(self.path(rel)).expect("create fixture dir");
        self
    }

    /// Write `<dir>/go.mod` declaring `module` and list it in `go.work`.
    pub fn go_module(&mut self, dir: &str, module: &str) -> &mut Self {
        self.go_module_with(dir, module, "")
    }

    /// Like [`go_module`](Self::go_module) with extra `go.mod` content
    /// appended (usually `require` lines).
    pub fn go_module_with(&mut self, dir: &str, module: &str, extra: &str) -> &mut Self {
        let go_mod = format!("module {}\n\ngo 1.22\n{}", module, extra);
        self.file(&format!("{}/go.mod", dir), &go_mod);

        let work_path = self.path(GO_WORK);
        let current = fs::read_to_string(&work_path).unwrap_or_else(|_| "go 1.22\n".to_string());
        let updated = add_use_directive(&current, dir).unwrap_or(current);
        fs::write(work_path, updated).expect("write go.work");
        self
    }

    /// Replace the sync configuration handed out by [`workspace`](Self::workspace).
    pub fn config(&mut self, f: impl FnOnce(&mut SyncConfig)) -> &mut Self {
        f(&mut self.config);
        self
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a workspace-relative path.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel))
            .unwrap_or_else(|e| panic!("failed to read {}: {}", rel, e))
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn manifest(&self) -> &WorkspaceManifest {
        &self.manifest
    }

    /// A loaded workspace over the fixture, without consulting any global
    /// configuration.
    pub fn workspace(&self) -> Workspace {
        Workspace::from_parts(
            self.dir.path().to_path_buf(),
            self.manifest.clone(),
            self.config.clone(),
        )
    }

    fn save_manifest(&self) {
        self.manifest
            .save(&self.dir.path().join(MANIFEST_NAME))
            .expect("save manifest");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::registry::parse_go_work;

    #[test]
    fn test_go_module_updates_go_work() {
        let mut fixture = WorkspaceFixture::new("w");
        fixture
            .go_module("libs/a", "example.com/w/a")
            .go_module("libs/b", "example.com/w/b");

        assert_eq!(
            parse_go_work(&fixture.read("go.work")),
            vec!["./libs/a".to_string(), "./libs/b".to_string()]
        );
        assert!(fixture.read("libs/a/go.mod").starts_with("module example.com/w/a\n"));
    }

    #[test]
    fn test_orders_and_web_preset() {
        let fixture = WorkspaceFixture::orders_and_web();
        let manifest = WorkspaceManifest::load(&fixture.path("forge.json")).unwrap();
        assert_eq!(manifest.projects.len(), 2);
        assert!(fixture.exists("backend/services/orders/cmd/server/main.go"));
        assert!(fixture.exists("frontend/apps/web"));
    }
}
