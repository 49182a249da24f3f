//! Package discovery.
//!
//! Walks the workspace and classifies every directory that holds Go code.
//! Discovery is read-only and deterministic: directory entries are visited
//! in file-name order and the result is sorted before it is returned.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use walkdir::WalkDir;

use crate::core::workspace::GO_MOD;
use crate::sync::imports::{parse_package_clause, ImportExtractor};
use crate::sync::registry::GoModParser;
use crate::sync::report::SyncIssue;
use crate::util::config::SyncConfig;
use crate::util::fs::{is_skipped_dir, relative_path, to_slash};

/// Role of a discovered directory in the build graph.
///
/// The ordering puts a module root ahead of the code package that may share
/// its directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    /// Directory with a `go.mod`; carries no files of its own
    ModuleRoot,
    /// Package declaring `package main`
    Binary,
    Library,
}

/// A directory identified as holding Go code or a module boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredPackage {
    /// Workspace-relative directory
    pub path: PathBuf,
    pub import_path: String,
    pub kind: PackageKind,
    pub source_files: BTreeSet<String>,
    pub test_files: BTreeSet<String>,
    /// Imports of the non-test sources, sorted and deduplicated
    pub imports: Vec<String>,
    /// Imports of the test files that the sources do not already import
    pub test_imports: Vec<String>,
    /// Whether a fixtures directory sits next to the sources
    pub has_fixtures: bool,
}

impl DiscoveredPackage {
    pub fn is_module_root(&self) -> bool {
        self.kind == PackageKind::ModuleRoot
    }

    pub fn is_binary(&self) -> bool {
        self.kind == PackageKind::Binary
    }

    pub fn has_tests(&self) -> bool {
        !self.test_files.is_empty()
    }
}

/// Outcome of a discovery walk.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Sorted by `(path, kind)`
    pub packages: Vec<DiscoveredPackage>,
    /// Files and directories that were skipped
    pub issues: Vec<SyncIssue>,
}

/// Walks a workspace tree looking for Go packages.
pub struct PackageDiscovery<'a> {
    root: PathBuf,
    skip_dirs: Vec<String>,
    fixtures_dir: String,
    extractor: &'a dyn ImportExtractor,
}

impl<'a> PackageDiscovery<'a> {
    pub fn new(root: &Path, config: &SyncConfig, extractor: &'a dyn ImportExtractor) -> Self {
        PackageDiscovery {
            root: root.to_path_buf(),
            skip_dirs: config.skip_dirs.clone(),
            fixtures_dir: config.fixtures_dir.clone(),
            extractor,
        }
    }

    /// Discover every package under the root.
    ///
    /// Only a failure to read the root itself is an error; anything below
    /// it that cannot be read is recorded in [`Discovery::issues`].
    pub fn discover(&self) -> Result<Discovery> {
        std::fs::read_dir(&self.root)
            .with_context(|| format!("failed to read workspace root: {}", self.root.display()))?;

        let parser = GoModParser::new()?;
        let mut discovery = Discovery::default();
        // Enclosing modules of the directory being visited, innermost last.
        let mut modules: Vec<(PathBuf, String)> = Vec::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !is_skipped_dir(&e.file_name().to_string_lossy(), &self.skip_dirs)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(anyhow::Error::new(e).context(format!(
                        "failed to walk workspace root: {}",
                        self.root.display()
                    )));
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| relative_path(&self.root, p))
                        .unwrap_or_default();
                    discovery.warn(SyncIssue::new(path, format!("skipping: {}", e)));
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            let rel = relative_path(&self.root, entry.path());
            while modules.last().is_some_and(|(dir, _)| !rel.starts_with(dir)) {
                modules.pop();
            }

            let mod_file = entry.path().join(GO_MOD);
            if mod_file.is_file() {
                match std::fs::read_to_string(&mod_file) {
                    Ok(text) => match parser.parse(&text).module {
                        Some(import_path) => {
                            tracing::debug!("module root {} ({})", rel.display(), import_path);
                            discovery.packages.push(self.package(
                                &rel,
                                import_path.clone(),
                                PackageKind::ModuleRoot,
                            ));
                            modules.push((rel.clone(), import_path));
                        }
                        None => discovery.warn(SyncIssue::new(
                            rel.join(GO_MOD),
                            "no `module` directive; not treated as a module root",
                        )),
                    },
                    Err(e) => discovery.warn(SyncIssue::new(
                        rel.join(GO_MOD),
                        format!("failed to read: {}", e),
                    )),
                }
            }

            let import_path = match modules.last() {
                Some((dir, module)) => join_import_path(module, &relative_path(dir, &rel)),
                None => to_slash(&rel),
            };
            if let Some(package) = self.scan_code_dir(entry.path(), &rel, import_path, &mut discovery)
            {
                discovery.packages.push(package);
            }
        }

        discovery
            .packages
            .sort_by(|a, b| (&a.path, a.kind).cmp(&(&b.path, b.kind)));
        Ok(discovery)
    }

    fn package(&self, rel: &Path, import_path: String, kind: PackageKind) -> DiscoveredPackage {
        DiscoveredPackage {
            path: rel.to_path_buf(),
            import_path,
            kind,
            source_files: BTreeSet::new(),
            test_files: BTreeSet::new(),
            imports: Vec::new(),
            test_imports: Vec::new(),
            has_fixtures: false,
        }
    }

    /// Classify the `.go` files directly inside `dir`.
    fn scan_code_dir(
        &self,
        dir: &Path,
        rel: &Path,
        import_path: String,
        discovery: &mut Discovery,
    ) -> Option<DiscoveredPackage> {
        let mut names: Vec<String> = match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .filter(|name| name.ends_with(".go"))
                .collect(),
            Err(e) => {
                discovery.warn(SyncIssue::new(rel, format!("failed to list: {}", e)));
                return None;
            }
        };
        if names.is_empty() {
            return None;
        }
        names.sort();

        let mut package = self.package(rel, import_path, PackageKind::Library);
        let mut imports = BTreeSet::new();
        let mut test_imports = BTreeSet::new();
        let mut is_binary = false;

        for name in names {
            let file_rel = rel.join(&name);
            let contents = match std::fs::read_to_string(dir.join(&name)) {
                Ok(contents) => contents,
                Err(e) => {
                    discovery.warn(SyncIssue::new(file_rel, format!("skipping file: {}", e)));
                    continue;
                }
            };
            let Some(clause) = parse_package_clause(&contents) else {
                discovery.warn(SyncIssue::new(file_rel, "skipping file: no package clause"));
                continue;
            };

            let found = self.extractor.extract_imports(&contents);
            if name.ends_with("_test.go") {
                test_imports.extend(found);
                package.test_files.insert(name);
            } else {
                is_binary |= clause == "main";
                imports.extend(found);
                package.source_files.insert(name);
            }
        }

        if package.source_files.is_empty() && package.test_files.is_empty() {
            return None;
        }

        package.kind = if is_binary {
            PackageKind::Binary
        } else {
            PackageKind::Library
        };
        package.test_imports = test_imports.difference(&imports).cloned().collect();
        package.imports = imports.into_iter().collect();
        package.has_fixtures = dir.join(&self.fixtures_dir).is_dir();

        tracing::debug!(
            "{:?} package //{} ({} sources, {} tests)",
            package.kind,
            to_slash(rel),
            package.source_files.len(),
            package.test_files.len()
        );
        Some(package)
    }
}

impl Discovery {
    fn warn(&mut self, issue: SyncIssue) {
        tracing::warn!("{}", issue);
        self.issues.push(issue);
    }

    /// The code package (binary or library) at `path`, if any.
    pub fn code_package(&self, path: &Path) -> Option<&DiscoveredPackage> {
        self.packages
            .iter()
            .find(|p| p.path == path && !p.is_module_root())
    }
}

fn join_import_path(module: &str, rest: &Path) -> String {
    let rest = to_slash(rest);
    if rest.is_empty() {
        module.to_string()
    } else {
        format!("{}/{}", module, rest)
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

    fn discover(root: &Path) -> Discovery {
        let config = SyncConfig::default();
        PackageDiscovery::new(root, &config, &GoImportExtractor)
            .discover()
            .unwrap()
    }

    fn summary(discovery: &Discovery) -> Vec<(String, PackageKind)> {
        discovery
            .packages
            .iter()
            .map(|p| (to_slash(&p.path), p.kind))
            .collect()
    }

    #[test]
    fn test_classification_boundary() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "bin/main.go", "package main\n\nfunc main() {}\n");
        write(tmp.path(), "lib/lib.go", "package lib\n");
        write(tmp.path(), "empty/README.md", "nothing here\n");

        let discovery = discover(tmp.path());
        assert_eq!(
            summary(&discovery),
            vec![
                ("bin".to_string(), PackageKind::Binary),
                ("lib".to_string(), PackageKind::Library),
            ]
        );
    }

    #[test]
    fn test_module_root_and_nested_packages() {
        let tmp = TempDir::new().unwrap();
        let svc = "backend/services/orders";
        write(tmp.path(), &format!("{svc}/go.mod"), "module example.com/shop/orders\n");
        write(
            tmp.path(),
            &format!("{svc}/cmd/server/main.go"),
            "package main\n\nimport (\n\t\"fmt\"\n\t\"example.com/shop/orders/internal/store\"\n)\n\nfunc main() { fmt.Println() }\n",
        );
        write(tmp.path(), &format!("{svc}/internal/store/store.go"), "package store\n");
        write(
            tmp.path(),
            &format!("{svc}/internal/store/store_test.go"),
            "package store\n\nimport \"testing\"\n",
        );
        fs::create_dir_all(tmp.path().join(format!("{svc}/internal/store/migrations"))).unwrap();

        let discovery = discover(tmp.path());
        assert_eq!(
            summary(&discovery),
            vec![
                (svc.to_string(), PackageKind::ModuleRoot),
                (format!("{svc}/cmd/server"), PackageKind::Binary),
                (format!("{svc}/internal/store"), PackageKind::Library),
            ]
        );

        let root = &discovery.packages[0];
        assert_eq!(root.import_path, "example.com/shop/orders");
        assert!(root.source_files.is_empty());

        let server = &discovery.packages[1];
        assert_eq!(server.import_path, "example.com/shop/orders/cmd/server");
        assert_eq!(server.imports, vec!["example.com/shop/orders/internal/store", "fmt"]);

        let store = discovery
            .code_package(Path::new("backend/services/orders/internal/store"))
            .unwrap();
        assert!(store.has_fixtures);
        assert!(store.has_tests());
        assert_eq!(store.test_imports, vec!["testing"]);
    }

    #[test]
    fn test_module_root_with_sources_emits_two_entries() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "tool/go.mod", "module example.com/tool\n");
        write(tmp.path(), "tool/main.go", "package main\n");

        let discovery = discover(tmp.path());
        assert_eq!(
            summary(&discovery),
            vec![
                ("tool".to_string(), PackageKind::ModuleRoot),
                ("tool".to_string(), PackageKind::Binary),
            ]
        );
        assert_eq!(discovery.packages[1].import_path, "example.com/tool");
    }

    #[test]
    fn test_test_only_directory_is_a_library() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "e2e/flow_test.go", "package e2e\n");

        let discovery = discover(tmp.path());
        assert_eq!(discovery.packages.len(), 1);
        let pkg = &discovery.packages[0];
        assert_eq!(pkg.kind, PackageKind::Library);
        assert!(pkg.source_files.is_empty());
        assert_eq!(pkg.test_files.iter().collect::<Vec<_>>(), vec!["flow_test.go"]);
    }

    #[test]
    fn test_bad_file_is_skipped_not_fatal() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "pkg/good.go", "package pkg\n");
        write(tmp.path(), "pkg/bad.go", "// only a comment\n");
        write(tmp.path(), "broken/bad.go", "not go at all");

        let discovery = discover(tmp.path());
        assert_eq!(summary(&discovery), vec![("pkg".to_string(), PackageKind::Library)]);
        assert_eq!(
            discovery.packages[0].source_files.iter().collect::<Vec<_>>(),
            vec!["good.go"]
        );
        assert_eq!(discovery.issues.len(), 2);
    }

    #[test]
    fn test_skipped_directories() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ".git/hooks/x.go", "package hooks\n");
        write(tmp.path(), "bazel-out/gen/x.go", "package gen\n");
        write(tmp.path(), "node_modules/m/x.go", "package m\n");
        write(tmp.path(), "vendor/v/x.go", "package v\n");
        write(tmp.path(), "dist/d/x.go", "package d\n");
        write(tmp.path(), "real/x.go", "package real\n");

        assert_eq!(
            summary(&discover(tmp.path())),
            vec![("real".to_string(), PackageKind::Library)]
        );
    }

    #[test]
    fn test_discovery_is_deterministic() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        let files = [
            ("z/z.go", "package z\n"),
            ("a/main.go", "package main\n"),
            ("m/go.mod", "module example.com/m\n"),
            ("m/sub/s.go", "package sub\n"),
            ("a/b/c/c.go", "package c\n"),
        ];
        for (rel, contents) in files.iter() {
            write(a.path(), rel, contents);
        }
        for (rel, contents) in files.iter().rev() {
            write(b.path(), rel, contents);
        }

        let first = discover(a.path());
        let second = discover(b.path());
        assert_eq!(first.packages, second.packages);
        assert_eq!(first.packages, discover(a.path()).packages);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let config = SyncConfig::default();
        let discovery = PackageDiscovery::new(&tmp.path().join("nope"), &config, &GoImportExtractor);
        assert!(discovery.discover().is_err());
    }
}
