//! Transitive fixture dependency resolution.
//!
//! A package's tests need a fixtures target (database migrations, usually)
//! when any of these hold:
//!
//! 1. the package has its own fixtures directory,
//! 2. the nearest ancestor with a fixture provider (`<ancestor>/db/migrations`
//!    by default) supplies one,
//! 3. the package imports a workspace package, whose import path looks
//!    test- or migration-related, that needs fixtures itself.
//!
//! Step 3 is a substring heuristic on import paths. It over-approximates on
//! purpose and is not a precise dependency cut.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::sync::imports::ImportExtractor;
use crate::sync::registry::ModuleRegistry;
use crate::sync::target_label;
use crate::util::config::SyncConfig;
use crate::util::fs::from_slash;

/// Computes the fixture targets a package's tests depend on.
pub struct FixtureResolver<'a> {
    root: PathBuf,
    registry: &'a ModuleRegistry,
    extractor: &'a dyn ImportExtractor,
    fixtures_dir: String,
    provider: PathBuf,
    keywords: Vec<String>,
    max_depth: usize,
}

impl<'a> FixtureResolver<'a> {
    pub fn new(
        root: &Path,
        registry: &'a ModuleRegistry,
        config: &SyncConfig,
        extractor: &'a dyn ImportExtractor,
    ) -> Self {
        FixtureResolver {
            root: root.to_path_buf(),
            registry,
            extractor,
            fixtures_dir: config.fixtures_dir.clone(),
            provider: from_slash(&config.fixture_provider_subpath),
            keywords: config
                .relevance_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
            max_depth: config.max_fixture_depth,
        }
    }

    /// Fixture labels needed by the package at the workspace-relative
    /// `package` path. Never fails; unreadable files contribute nothing.
    pub fn find_fixture_deps(&self, package: &Path) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut deps = BTreeSet::new();
        self.collect(package, 0, &mut seen, &mut deps);
        deps
    }

    fn collect(
        &self,
        package: &Path,
        depth: usize,
        seen: &mut BTreeSet<PathBuf>,
        deps: &mut BTreeSet<String>,
    ) {
        if depth > self.max_depth {
            tracing::debug!(
                "fixture resolution depth limit reached at {}",
                package.display()
            );
            return;
        }
        if !seen.insert(package.to_path_buf()) {
            return;
        }

        if self.root.join(package).join(&self.fixtures_dir).is_dir() {
            deps.insert(target_label(package, &self.fixtures_dir));
        }

        if let Some(label) = self.nearest_provider(package) {
            deps.insert(label);
        }

        for import in self.relevant_imports(package) {
            if let Some(dep) = self.registry.resolve_import_to_path(&import) {
                self.collect(&dep, depth + 1, seen, deps);
            }
        }
    }

    /// Label of the closest ancestor's fixture provider, the root included.
    fn nearest_provider(&self, package: &Path) -> Option<String> {
        let name = self.provider.file_name()?.to_string_lossy().into_owned();
        let parent = self.provider.parent().unwrap_or(Path::new(""));

        package
            .ancestors()
            .skip(1)
            .find(|dir| self.root.join(dir).join(&self.provider).is_dir())
            .map(|dir| target_label(&dir.join(parent), &name))
    }

    /// Imports of the package's non-test sources that mention a relevance
    /// keyword.
    fn relevant_imports(&self, package: &Path) -> BTreeSet<String> {
        let dir = self.root.join(package);
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return BTreeSet::new();
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .map(|n| {
                            let n = n.to_string_lossy();
                            n.ends_with(".go") && !n.ends_with("_test.go")
                        })
                        .unwrap_or(false)
            })
            .collect();
        files.sort();

        files
            .iter()
            .filter_map(|f| std::fs::read_to_string(f).ok())
            .flat_map(|contents| self.extractor.extract_imports(&contents))
            .filter(|import| self.is_relevant(import))
            .collect()
    }

    fn is_relevant(&self, import: &str) -> bool {
        let lower = import.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::imports::GoImportExtractor;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn mkdir(root: &Path, rel: &str) {
        fs::create_dir_all(root.join(rel)).unwrap();
    }

    fn resolve(root: &Path, package: &str) -> BTreeSet<String> {
        let registry = if root.join("go.work").exists() {
            ModuleRegistry::load(root).unwrap()
        } else {
            ModuleRegistry::empty(root)
        };
        let config = SyncConfig::default();
        FixtureResolver::new(root, &registry, &config, &GoImportExtractor)
            .find_fixture_deps(Path::new(package))
    }

    fn set(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_direct_fixtures() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "svc/store/store.go", "package store\n");
        mkdir(tmp.path(), "svc/store/migrations");

        assert_eq!(resolve(tmp.path(), "svc/store"), set(&["//svc/store:migrations"]));
    }

    #[test]
    fn test_no_fixtures_is_empty() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "svc/api/api.go", "package api\n");
        assert!(resolve(tmp.path(), "svc/api").is_empty());
    }

    #[test]
    fn test_ancestor_convention_stops_at_nearest_match() {
        let tmp = TempDir::new().unwrap();
        // Both the grandparent and the root provide fixtures; only the
        // grandparent counts.
        mkdir(tmp.path(), "db/migrations");
        mkdir(tmp.path(), "services/orders/db/migrations");
        write(tmp.path(), "services/orders/internal/repo/repo.go", "package repo\n");

        assert_eq!(
            resolve(tmp.path(), "services/orders/internal/repo"),
            set(&["//services/orders/db:migrations"])
        );
    }

    #[test]
    fn test_ancestor_convention_reaches_root() {
        let tmp = TempDir::new().unwrap();
        mkdir(tmp.path(), "db/migrations");
        write(tmp.path(), "pkg/a/a.go", "package a\n");

        assert_eq!(resolve(tmp.path(), "pkg/a"), set(&["//db:migrations"]));
    }

    #[test]
    fn test_transitive_through_relevant_imports() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "go.work", "use ./libs\n");
        write(tmp.path(), "libs/go.mod", "module example.com/libs\n");
        write(tmp.path(), "libs/testdb/testdb.go", "package testdb\n");
        mkdir(tmp.path(), "libs/testdb/migrations");
        write(tmp.path(), "libs/util/util.go", "package util\n");
        mkdir(tmp.path(), "libs/util/migrations");
        write(
            tmp.path(),
            "app/app.go",
            "package app\n\nimport (\n\t\"example.com/libs/testdb\"\n\t\"example.com/libs/util\"\n)\n",
        );

        // `util` has fixtures but its path is not test-related.
        assert_eq!(resolve(tmp.path(), "app"), set(&["//libs/testdb:migrations"]));
    }

    #[test]
    fn test_keyword_match_is_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "go.work", "use ./libs\n");
        write(tmp.path(), "libs/go.mod", "module example.com/libs\n");
        write(tmp.path(), "libs/Migrator/m.go", "package migrator\n");
        mkdir(tmp.path(), "libs/Migrator/migrations");
        write(tmp.path(), "app/app.go", "package app\nimport \"example.com/libs/Migrator\"\n");

        assert_eq!(resolve(tmp.path(), "app"), set(&["//libs/Migrator:migrations"]));
    }

    #[test]
    fn test_import_cycle_terminates() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "go.work", "use ./w\n");
        write(tmp.path(), "w/go.mod", "module example.com/w\n");
        write(tmp.path(), "w/testa/a.go", "package testa\nimport \"example.com/w/testb\"\n");
        write(tmp.path(), "w/testb/b.go", "package testb\nimport \"example.com/w/testa\"\n");
        mkdir(tmp.path(), "w/testa/migrations");
        mkdir(tmp.path(), "w/testb/migrations");

        let deps = resolve(tmp.path(), "w/testa");
        assert_eq!(deps, set(&["//w/testa:migrations", "//w/testb:migrations"]));
    }

    #[test]
    fn test_self_import_terminates() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "go.work", "use ./w\n");
        write(tmp.path(), "w/go.mod", "module example.com/w\n");
        write(tmp.path(), "w/testself/s.go", "package testself\nimport \"example.com/w/testself\"\n");
        mkdir(tmp.path(), "w/testself/migrations");

        assert_eq!(resolve(tmp.path(), "w/testself"), set(&["//w/testself:migrations"]));
    }

    #[test]
    fn test_depth_cap() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "go.work", "use ./w\n");
        write(tmp.path(), "w/go.mod", "module example.com/w\n");
        write(tmp.path(), "w/test0/x.go", "package test0\nimport \"example.com/w/test1\"\n");
        write(tmp.path(), "w/test1/x.go", "package test1\nimport \"example.com/w/test2\"\n");
        write(tmp.path(), "w/test2/x.go", "package test2\n");
        mkdir(tmp.path(), "w/test2/migrations");

        let registry = ModuleRegistry::load(tmp.path()).unwrap();
        let mut config = SyncConfig::default();
        config.max_fixture_depth = 1;
        let resolver = FixtureResolver::new(tmp.path(), &registry, &config, &GoImportExtractor);
        assert!(resolver.find_fixture_deps(Path::new("w/test0")).is_empty());

        config.max_fixture_depth = 2;
        let resolver = FixtureResolver::new(tmp.path(), &registry, &config, &GoImportExtractor);
        assert_eq!(
            resolver.find_fixture_deps(Path::new("w/test0")),
            set(&["//w/test2:migrations"])
        );
    }
}
