//! Implementation of `forge sync` and `forge validate`.
//!
//! A sync regenerates every build file forge owns. It runs in three
//! phases:
//!
//! 1. plan: discover packages and render every output in memory (reads only),
//! 2. apply: delete all existing generated files, then write the plan,
//! 3. reconcile: run the external dependency tools.
//!
//! Planning before deleting means a fatal error (missing `go.work`,
//! unreadable root) leaves the tree untouched. An interruption during the
//! apply phase can still leave deleted-but-not-rewritten files behind.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use walkdir::WalkDir;

use crate::core::manifest::WorkspaceManifest;
use crate::core::project::{Language, Project};
use crate::core::workspace::{Workspace, GO_MOD, MODULE_FILE};
use crate::sync::discovery::{DiscoveredPackage, PackageDiscovery, PackageKind};
use crate::sync::registry::{repository_name, ModuleRegistry};
use crate::sync::{
    package_files_target, split_label, target_label, BuildDescriber, FixtureResolver,
    GoImportExtractor, ImportExtractor, PackageFacts, SyncIssue, SyncReport,
};
use crate::templates::{
    compose_generated_file, ids, render_record, ModuleFileRecord, ModulePin, Templates,
    WorkspaceRootRecord,
};
use crate::util::fs::{is_skipped_dir, relative_path, remove_file_if_exists, to_slash, write_string};
use crate::util::process::{display_invocation, CommandRunner};

/// Version pinned for in-workspace library modules.
const LOCAL_MODULE_VERSION: &str = "v0.0.0";

static GO_EXTRACTOR: GoImportExtractor = GoImportExtractor;

/// Options for the sync command.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Compute the report without touching disk
    pub dry_run: bool,

    /// Run the dependency tidy and graph tools after writing
    pub run_tools: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        SyncOptions {
            dry_run: false,
            run_tools: true,
        }
    }
}

/// Everything a sync would write, computed without touching disk.
#[derive(Debug, Clone, Default)]
pub struct SyncPlan {
    /// Workspace-relative path to full file contents
    pub files: BTreeMap<PathBuf, String>,

    /// Go packages found by discovery
    pub packages: Vec<DiscoveredPackage>,

    pub issues: Vec<SyncIssue>,
}

/// How a generated file on disk differs from what a sync would write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriftKind {
    /// Would be written but does not exist
    Missing,
    /// Exists with different content
    Changed,
    /// Exists but would be deleted
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drift {
    pub path: PathBuf,
    pub kind: DriftKind,
}

/// Drives one synchronization of a workspace.
pub struct Synchronizer<'a> {
    ws: &'a Workspace,
    runner: &'a dyn CommandRunner,
    templates: &'a dyn Templates,
    extractor: &'a dyn ImportExtractor,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        ws: &'a Workspace,
        runner: &'a dyn CommandRunner,
        templates: &'a dyn Templates,
    ) -> Self {
        Synchronizer {
            ws,
            runner,
            templates,
            extractor: &GO_EXTRACTOR,
        }
    }

    /// Use a different import extractor for discovery and fixture
    /// resolution.
    pub fn with_extractor(mut self, extractor: &'a dyn ImportExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Languages declared by the manifest's projects.
    pub fn detect_languages(&self) -> BTreeSet<Language> {
        self.ws.manifest().languages()
    }

    /// Run a full sync.
    pub fn sync(&self, opts: &SyncOptions) -> Result<SyncReport> {
        let mut report = SyncReport::new(opts.dry_run);
        tracing::info!(
            "syncing workspace `{}`{}",
            self.ws.name(),
            if opts.dry_run { " (dry run)" } else { "" }
        );

        let plan = self.plan()?;
        report.extend_issues(plan.issues.iter().cloned());

        let existing = self.find_generated_files()?;
        let previous: BTreeMap<PathBuf, String> = existing
            .iter()
            .filter_map(|p| {
                std::fs::read_to_string(self.ws.join(p))
                    .ok()
                    .map(|c| (p.clone(), c))
            })
            .collect();

        self.delete_files(&existing, opts.dry_run, &mut report)?;

        for (path, contents) in &plan.files {
            if !opts.dry_run {
                write_string(&self.ws.join(path), contents)?;
            }
            tracing::debug!("wrote {}", path.display());
            report.created_files.push(path.clone());
            if previous.get(path) != Some(contents) {
                report.modified_files.push(path.clone());
            }
        }

        let go_active = self.detect_languages().contains(&Language::Go);
        if opts.dry_run {
            tracing::info!("dry run, skipping external tools");
        } else if !(opts.run_tools && self.ws.config().run_tools) {
            tracing::info!("external tools disabled");
        } else if go_active {
            self.reconcile_external_tools(&plan.packages, &mut report);
        }

        tracing::info!(
            "sync finished: {} written, {} deleted, {} changed, {} issue(s)",
            report.created_files.len(),
            report.deleted_files.len(),
            report.modified_files.len(),
            report.errors.len()
        );
        Ok(report)
    }

    /// Compute every file a sync would write.
    pub fn plan(&self) -> Result<SyncPlan> {
        let languages = self.detect_languages();
        tracing::debug!(
            "active languages: {}",
            languages.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(", ")
        );

        let registry = self.load_registry(&languages)?;
        let mut plan = SyncPlan {
            issues: registry.issues().to_vec(),
            ..Default::default()
        };

        let module_file = self.regenerate_module_descriptor(&languages, &registry)?;
        plan.files.insert(PathBuf::from(MODULE_FILE), module_file);

        self.regenerate_all_build_descriptions(&languages, &registry, &mut plan)?;
        Ok(plan)
    }

    /// Compare disk against the plan.
    pub fn check(&self) -> Result<Vec<Drift>> {
        let plan = self.plan()?;
        let mut drift = Vec::new();

        for (path, contents) in &plan.files {
            match std::fs::read_to_string(self.ws.join(path)) {
                Ok(existing) if &existing == contents => {}
                Ok(_) => drift.push(Drift {
                    path: path.clone(),
                    kind: DriftKind::Changed,
                }),
                Err(_) => drift.push(Drift {
                    path: path.clone(),
                    kind: DriftKind::Missing,
                }),
            }
        }

        for path in self.find_generated_files()? {
            if !plan.files.contains_key(&path) {
                drift.push(Drift {
                    path,
                    kind: DriftKind::Stale,
                });
            }
        }

        drift.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(drift)
    }

    /// Shallow validation: the manifest loads and `MODULE.bazel` exists.
    pub fn validate(&self) -> Result<()> {
        let manifest_path = self.ws.manifest_path();
        WorkspaceManifest::load(&manifest_path)?;

        if !self.ws.module_file_path().is_file() {
            bail!(
                "`{}` not found in `{}`; run `forge sync` to generate it",
                MODULE_FILE,
                self.ws.root().display()
            );
        }

        tracing::warn!("deep validation of generated build files is not implemented");
        Ok(())
    }

    fn load_registry(&self, languages: &BTreeSet<Language>) -> Result<ModuleRegistry> {
        if languages.contains(&Language::Go) {
            Ok(ModuleRegistry::load(self.ws.root())?)
        } else {
            Ok(ModuleRegistry::empty(self.ws.root()))
        }
    }

    /// Every generated file currently on disk, workspace-relative and sorted.
    pub fn find_generated_files(&self) -> Result<Vec<PathBuf>> {
        let root = self.ws.root();
        let config = self.ws.config();
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !is_skipped_dir(&e.file_name().to_string_lossy(), &config.skip_dirs)
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(anyhow::Error::new(e)
                        .context(format!("failed to walk workspace root: {}", root.display())));
                }
                Err(e) => {
                    tracing::warn!("skipping while looking for build files: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_file() && entry.file_name() == config.build_file_name.as_str()
            {
                files.push(relative_path(root, entry.path()));
            }
        }

        if self.ws.module_file_path().is_file() {
            files.push(PathBuf::from(MODULE_FILE));
        }

        files.sort();
        Ok(files)
    }

    /// Remove every generated file. In dry-run mode the files are only
    /// listed.
    pub fn delete_generated_files(&self, dry_run: bool, report: &mut SyncReport) -> Result<()> {
        let files = self.find_generated_files()?;
        self.delete_files(&files, dry_run, report)
    }

    fn delete_files(&self, files: &[PathBuf], dry_run: bool, report: &mut SyncReport) -> Result<()> {
        for path in files {
            if !dry_run {
                remove_file_if_exists(&self.ws.join(path))?;
            }
            tracing::debug!("deleted {}", path.display());
            report.deleted_files.push(path.clone());
        }
        Ok(())
    }

    /// Render `MODULE.bazel` for the active languages.
    pub fn regenerate_module_descriptor(
        &self,
        languages: &BTreeSet<Language>,
        registry: &ModuleRegistry,
    ) -> Result<String> {
        let manifest = self.ws.manifest();
        let deployable: Vec<&Project> = manifest
            .projects
            .values()
            .filter(|p| p.project_type.is_deployable())
            .collect();

        let mut pins: Vec<ModulePin> = registry
            .modules()
            .iter()
            .filter(|m| !deployable.iter().any(|p| p.contains(&m.path)))
            .map(|m| ModulePin {
                path: m.import_path.clone(),
                version: LOCAL_MODULE_VERSION.to_string(),
            })
            .collect();
        pins.sort_by(|a, b| a.path.cmp(&b.path));

        let go_repositories: BTreeSet<String> = registry
            .modules()
            .iter()
            .flat_map(|m| m.requires.iter())
            .filter(|r| registry.module_for_import(&r.module).is_none())
            .map(|r| repository_name(&r.module))
            .collect();

        let mut language_names: Vec<String> =
            languages.iter().map(|l| l.as_str().to_string()).collect();
        language_names.sort();

        let record = ModuleFileRecord {
            name: module_name(self.ws.name()),
            languages: language_names,
            go: languages.contains(&Language::Go),
            javascript: languages.iter().any(|l| l.is_javascript()),
            go_version: manifest.workspace.tools.go.clone(),
            node_version: manifest.workspace.tools.node.clone(),
            pins,
            go_repositories: go_repositories.into_iter().collect(),
        };

        let body = render_record(self.templates, ids::MODULE_FILE, &record)?;
        Ok(compose_generated_file(&[body]))
    }

    /// Render every per-directory build file into `plan`.
    pub fn regenerate_all_build_descriptions(
        &self,
        languages: &BTreeSet<Language>,
        registry: &ModuleRegistry,
        plan: &mut SyncPlan,
    ) -> Result<()> {
        let config = self.ws.config();
        let go = languages.contains(&Language::Go);
        let javascript = languages.iter().any(|l| l.is_javascript());
        let mut sections: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();

        if go || javascript {
            let root = render_record(
                self.templates,
                ids::WORKSPACE_ROOT,
                &WorkspaceRootRecord { go, javascript },
            )?;
            sections.entry(PathBuf::new()).or_default().push(root);
        }

        let describer = BuildDescriber::new(self.ws.name(), config, registry, self.templates);

        if go {
            let discovery =
                PackageDiscovery::new(self.ws.root(), config, self.extractor).discover()?;
            plan.issues.extend(discovery.issues.iter().cloned());
            let resolver = FixtureResolver::new(self.ws.root(), registry, config, self.extractor);

            let package_dirs: BTreeSet<&Path> =
                discovery.packages.iter().map(|p| p.path.as_path()).collect();
            let mut exported_dirs: BTreeSet<PathBuf> = BTreeSet::new();
            let mut files_label = |dir: PathBuf| -> Option<String> {
                if !package_dirs.contains(dir.as_path()) {
                    return None;
                }
                let name = dir.file_name()?.to_string_lossy().into_owned();
                let label = target_label(&dir, &package_files_target(&name));
                exported_dirs.insert(dir);
                Some(label)
            };

            let mut fixture_labels = BTreeSet::new();
            for package in &discovery.packages {
                let mut facts = match package.kind {
                    PackageKind::Library => PackageFacts {
                        fixture_deps: resolver.find_fixture_deps(&package.path),
                        ..Default::default()
                    },
                    _ => PackageFacts::default(),
                };
                if package.has_fixtures && !package.is_module_root() {
                    facts.fixtures_files = files_label(package.path.join(&config.fixtures_dir));
                }
                fixture_labels.extend(facts.fixture_deps.iter().cloned());

                let text = describer.describe(package, &facts).with_context(|| {
                    format!("failed to describe package `{}`", to_slash(&package.path))
                })?;
                sections.entry(package.path.clone()).or_default().push(text);
            }

            // Fixture targets referenced by a label but not declared by the
            // package living in that directory.
            for label in &fixture_labels {
                let Some((dir, target)) = split_label(label) else {
                    continue;
                };
                let declared = discovery
                    .code_package(&dir)
                    .map(|p| p.has_fixtures && target == config.fixtures_dir)
                    .unwrap_or(false);
                if !declared {
                    tracing::debug!("adding fixtures target {}", label);
                    let files = files_label(dir.join(target));
                    let text = describer.describe_fixtures(target, files)?;
                    sections.entry(dir).or_default().push(text);
                }
            }

            for dir in exported_dirs {
                tracing::debug!("exporting files of fixtures package {}", to_slash(&dir));
                let text = describer.describe_package_files(&dir, &config.build_file_name)?;
                sections.entry(dir).or_default().push(text);
            }

            plan.packages = discovery.packages;
        }

        for (name, project) in &self.ws.manifest().projects {
            if project.language.uses_discovery() {
                continue;
            }

            let root = project.root_path();
            if !self.ws.join(&root).is_dir() {
                let issue = SyncIssue::new(
                    &root,
                    format!("project `{}` root does not exist, no build file generated", name),
                );
                tracing::warn!("{}", issue);
                plan.issues.push(issue);
                continue;
            }

            let text = match project.language {
                Language::NestJs => describer.describe_nest(name, project)?,
                _ => describer.describe_frontend(name, project)?,
            };
            sections.entry(root).or_default().push(text);
        }

        for (dir, parts) in sections {
            plan.files
                .insert(dir.join(&config.build_file_name), compose_generated_file(&parts));
        }
        Ok(())
    }

    /// Run the dependency tidy tool, restore blank-imported driver modules,
    /// then run the graph tool. Every failure is a warning.
    pub fn reconcile_external_tools(&self, packages: &[DiscoveredPackage], report: &mut SyncReport) {
        let config = self.ws.config();

        self.run_tool(&config.tidy_command, &[], report);

        // Tidy rewrote the go.mod files; read them again.
        let registry = match ModuleRegistry::load(self.ws.root()) {
            Ok(registry) => registry,
            Err(e) => {
                report.warn(SyncIssue::new(
                    "",
                    format!("skipping dependency fix-up: {}", e),
                ));
                return;
            }
        };

        for module in registry.modules() {
            let imports: BTreeSet<&str> = packages
                .iter()
                .filter(|p| {
                    registry
                        .module_for_import(&p.import_path)
                        .map(|owner| owner.path == module.path)
                        .unwrap_or(false)
                })
                .flat_map(|p| p.imports.iter().chain(p.test_imports.iter()))
                .map(String::as_str)
                .collect();

            let missing: Vec<_> = config
                .indirect_deps
                .iter()
                .filter(|dep| !module.requires_module(&dep.module))
                .filter(|dep| {
                    imports.iter().any(|i| {
                        *i == dep.module
                            || i.strip_prefix(dep.module.as_str())
                                .map(|rest| rest.starts_with('/'))
                                .unwrap_or(false)
                    })
                })
                .collect();
            if missing.is_empty() {
                continue;
            }

            let rel = module.path.join(GO_MOD);
            if let Err(e) = append_requirements(&self.ws.join(&rel), &missing) {
                report.warn(SyncIssue::new(&rel, format!("{:#}", e)));
                continue;
            }
            for dep in &missing {
                tracing::info!("restored `require {} {}` in {}", dep.module, dep.version, rel.display());
            }
            report.modified_files.push(rel);
        }

        let known: Vec<String> = registry
            .known_imports()
            .into_iter()
            .map(|m| format!("-known_import={}", m))
            .collect();
        self.run_tool(&config.graph_command, &known, report);
    }

    fn run_tool(&self, command: &[String], extra: &[String], report: &mut SyncReport) -> bool {
        let Some((program, args)) = command.split_first() else {
            report.warn(SyncIssue::new("", "external tool command is empty"));
            return false;
        };
        let args: Vec<String> = args.iter().chain(extra.iter()).cloned().collect();
        let invocation = display_invocation(program, &args);
        tracing::info!("running `{}`", invocation);

        match self.runner.run(program, &args, self.ws.root()) {
            Ok(output) if output.success() => true,
            Ok(output) => {
                let status = output
                    .status
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string());
                let mut message = format!("`{}` failed (exit status {})", invocation, status);
                let stderr = output.stderr.trim();
                if !stderr.is_empty() {
                    message.push_str(": ");
                    message.push_str(stderr);
                }
                report.warn(SyncIssue::new("", message));
                false
            }
            Err(e) => {
                report.warn(SyncIssue::new(
                    "",
                    format!("failed to run `{}`: {:#}", invocation, e),
                ));
                false
            }
        }
    }
}

/// Append `require` lines to a `go.mod`.
fn append_requirements(path: &Path, deps: &[&crate::util::config::IndirectDep]) -> Result<()> {
    let mut contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    for dep in deps {
        contents.push_str(&format!("require {} {}\n", dep.module, dep.version));
    }
    write_string(path, &contents)
}

/// Bazel module name for a workspace: lowercase, `[a-z0-9._-]` only,
/// starting with a letter.
fn module_name(workspace: &str) -> String {
    let name: String = workspace
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.starts_with(|c: char| c.is_ascii_lowercase()) {
        name
    } else {
        format!("ws_{}", name)
    }
}
