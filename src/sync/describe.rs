//! Build description generation.
//!
//! The describer turns a discovered package plus its computed facts into
//! the record for one of the build-file templates. It formats no text
//! itself; rendering is the [`Templates`] implementation's job.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;

use crate::core::project::Project;
use crate::sync::discovery::{DiscoveredPackage, PackageKind};
use crate::sync::registry::ModuleRegistry;
use crate::sync::package_label;
use crate::templates::{
    ids, render_record, BinaryRecord, FixturesRecord, FrontendRecord, LibraryRecord,
    ModuleRootRecord, NestRecord, PackageFilesRecord, Templates,
};
use crate::util::config::SyncConfig;
use crate::util::fs::to_slash;

/// Facts computed for a package outside of discovery.
#[derive(Debug, Clone, Default)]
pub struct PackageFacts {
    /// Fixture labels the package's tests need
    pub fixture_deps: BTreeSet<String>,
    /// Files target of the package's fixtures directory when discovery
    /// made that directory a package too
    pub fixtures_files: Option<String>,
}

/// Name of the filegroup a package exports for a parent that uses it as its
/// fixtures directory.
pub fn package_files_target(dir_name: &str) -> String {
    format!("{}_files", dir_name)
}

/// Assembles build-file records and renders them.
pub struct BuildDescriber<'a> {
    workspace_name: String,
    fixtures_dir: String,
    registry: &'a ModuleRegistry,
    templates: &'a dyn Templates,
}

impl<'a> BuildDescriber<'a> {
    pub fn new(
        workspace_name: &str,
        config: &SyncConfig,
        registry: &'a ModuleRegistry,
        templates: &'a dyn Templates,
    ) -> Self {
        BuildDescriber {
            workspace_name: workspace_name.to_string(),
            fixtures_dir: config.fixtures_dir.clone(),
            registry,
            templates,
        }
    }

    /// Render the build-file section for a discovered package.
    pub fn describe(&self, package: &DiscoveredPackage, facts: &PackageFacts) -> Result<String> {
        match package.kind {
            PackageKind::ModuleRoot => render_record(
                self.templates,
                ids::MODULE_ROOT,
                &self.module_root_record(package),
            ),
            PackageKind::Binary => {
                render_record(self.templates, ids::GO_BINARY, &self.binary_record(package, facts))
            }
            PackageKind::Library => render_record(
                self.templates,
                ids::GO_LIBRARY,
                &self.library_record(package, facts),
            ),
        }
    }

    /// Render a fixtures-only section.
    pub fn describe_fixtures(&self, target: &str, files: Option<String>) -> Result<String> {
        let record = FixturesRecord {
            name: target.to_string(),
            files,
        };
        render_record(self.templates, ids::FIXTURES, &record)
    }

    /// Render the filegroup a fixtures directory that is also a package
    /// exports to its parent.
    pub fn describe_package_files(&self, dir: &Path, build_file_name: &str) -> Result<String> {
        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.workspace_name.clone());
        let record = PackageFilesRecord {
            name: package_files_target(&dir_name),
            exclude: vec![build_file_name.to_string()],
        };
        render_record(self.templates, ids::PACKAGE_FILES, &record)
    }

    /// Render the build file of an Angular or React project.
    pub fn describe_frontend(&self, name: &str, project: &Project) -> Result<String> {
        let record = FrontendRecord {
            name: name.to_string(),
            package: to_slash(&project.root_path()),
            framework: project.language.as_str().to_string(),
        };
        render_record(self.templates, ids::FRONTEND, &record)
    }

    /// Render the build file of a NestJS project.
    pub fn describe_nest(&self, name: &str, project: &Project) -> Result<String> {
        let record = NestRecord {
            name: name.to_string(),
            package: to_slash(&project.root_path()),
        };
        render_record(self.templates, ids::NEST, &record)
    }

    pub fn module_root_record(&self, package: &DiscoveredPackage) -> ModuleRootRecord {
        let mut local_modules: Vec<(String, String)> = self
            .registry
            .modules()
            .iter()
            .filter(|m| m.import_path != package.import_path)
            .map(|m| (m.import_path.clone(), package_label(&m.path)))
            .collect();
        local_modules.sort();

        ModuleRootRecord {
            import_path: package.import_path.clone(),
            local_modules,
        }
    }

    pub fn binary_record(&self, package: &DiscoveredPackage, facts: &PackageFacts) -> BinaryRecord {
        let name = self.target_name(&package.path);
        let (deps, test_deps) = self.dependency_labels(package);

        BinaryRecord {
            image_tag: format!("{}/{}:latest", self.workspace_name, name),
            name,
            import_path: package.import_path.clone(),
            sources: package.source_files.iter().cloned().collect(),
            tests: package.test_files.iter().cloned().collect(),
            deps,
            test_deps,
            has_tests: package.has_tests(),
            has_fixtures: package.has_fixtures,
            fixtures_dir: self.fixtures_dir.clone(),
            fixtures_files: facts.fixtures_files.clone(),
        }
    }

    pub fn library_record(&self, package: &DiscoveredPackage, facts: &PackageFacts) -> LibraryRecord {
        let (deps, test_deps) = self.dependency_labels(package);

        LibraryRecord {
            name: self.target_name(&package.path),
            import_path: package.import_path.clone(),
            sources: package.source_files.iter().cloned().collect(),
            tests: package.test_files.iter().cloned().collect(),
            deps,
            test_deps,
            has_tests: package.has_tests(),
            has_fixtures: package.has_fixtures,
            fixtures_dir: self.fixtures_dir.clone(),
            fixtures_files: facts.fixtures_files.clone(),
            fixture_deps: facts.fixture_deps.iter().cloned().collect(),
        }
    }

    /// Target name of a package: its directory name, or the workspace name
    /// at the root.
    fn target_name(&self, path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.workspace_name.clone())
    }

    /// Labels for the package's source and test imports, sorted. Test deps
    /// exclude anything already in the source deps.
    fn dependency_labels(&self, package: &DiscoveredPackage) -> (Vec<String>, Vec<String>) {
        let own = package_label(&package.path);
        let deps = self.labels(&package.imports, &own);
        let test_deps = self
            .labels(&package.test_imports, &own)
            .difference(&deps)
            .cloned()
            .collect();
        (deps.into_iter().collect(), test_deps)
    }

    fn labels(&self, imports: &[String], own: &str) -> BTreeSet<String> {
        imports
            .iter()
            .filter_map(|import| {
                if self.registry.module_for_import(import).is_some() {
                    let label = self.registry.resolve_import_to_path(import).map(|p| package_label(&p));
                    if label.is_none() {
                        tracing::debug!("workspace import {} has no directory", import);
                    }
                    label
                } else {
                    self.registry.external_label(import)
                }
            })
            .filter(|label| label != own)
            .collect()
    }
}
