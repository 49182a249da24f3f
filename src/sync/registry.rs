//! Module registry built from `go.work` and each module's `go.mod`.
//!
//! The registry maps module import-path prefixes to workspace directories
//! and answers two questions for the rest of the engine: which workspace
//! directory an import lives in, and which external repository provides it.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use regex::Regex;
use thiserror::Error;

use crate::core::workspace::{GO_MOD, GO_WORK};
use crate::sync::report::SyncIssue;
use crate::util::fs::{from_slash, to_slash};

/// Fatal registry errors. Problems with individual entries are issues, not
/// errors.
#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error("`go.work` not found at `{}`", path.display())]
    #[diagnostic(
        code(forge::registry::missing),
        help("Run `go work init` or `forge generate go-service <name>`")
    )]
    Missing { path: PathBuf },

    #[error("failed to read `{}`", path.display())]
    #[diagnostic(code(forge::registry::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid go.mod pattern")]
    #[diagnostic(code(forge::registry::pattern))]
    Pattern(#[from] regex::Error),
}

/// A `require` line in a `go.mod`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub module: String,
    pub version: String,
}

/// A module listed in `go.work`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceModule {
    /// Declared module path, e.g. `example.com/shop/backend/services/orders`
    pub import_path: String,

    /// Workspace-relative directory holding the module's `go.mod`
    pub path: PathBuf,

    /// Modules this module requires
    pub requires: Vec<Requirement>,
}

impl WorkspaceModule {
    /// Whether `import` is this module or a package inside it.
    pub fn owns(&self, import: &str) -> bool {
        is_path_prefix(&self.import_path, import)
    }

    pub fn requires_module(&self, module: &str) -> bool {
        self.requires.iter().any(|r| r.module == module)
    }
}

/// Parsed contents of a `go.mod` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoMod {
    pub module: Option<String>,
    pub requires: Vec<Requirement>,
}

/// Read-only lookup table over the workspace's Go modules.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    root: PathBuf,
    modules: Vec<WorkspaceModule>,
    issues: Vec<SyncIssue>,
}

impl ModuleRegistry {
    /// Load the registry from `<root>/go.work`.
    ///
    /// Entries whose `go.mod` is missing, unreadable or has no `module`
    /// directive are skipped and recorded in [`ModuleRegistry::issues`].
    pub fn load(root: &Path) -> Result<Self, RegistryError> {
        let work_path = root.join(GO_WORK);
        if !work_path.is_file() {
            return Err(RegistryError::Missing { path: work_path });
        }
        let contents = std::fs::read_to_string(&work_path).map_err(|source| RegistryError::Io {
            path: work_path.clone(),
            source,
        })?;

        let parser = GoModParser::new()?;
        let mut modules: Vec<WorkspaceModule> = Vec::new();
        let mut issues = Vec::new();

        for dir in parse_go_work(&contents) {
            let rel = from_slash(&dir);
            let mod_rel = rel.join(GO_MOD);
            let mod_path = root.join(&mod_rel);

            let text = match std::fs::read_to_string(&mod_path) {
                Ok(text) => text,
                Err(e) => {
                    let issue = SyncIssue::new(&mod_rel, format!("skipping module: {}", e));
                    tracing::warn!("{}", issue);
                    issues.push(issue);
                    continue;
                }
            };

            let parsed = parser.parse(&text);
            let Some(import_path) = parsed.module else {
                let issue = SyncIssue::new(&mod_rel, "skipping module: no `module` directive");
                tracing::warn!("{}", issue);
                issues.push(issue);
                continue;
            };

            if let Some(existing) = modules.iter().find(|m| m.import_path == import_path) {
                let issue = SyncIssue::new(
                    &mod_rel,
                    format!(
                        "module `{}` is already declared by `{}`",
                        import_path,
                        to_slash(&existing.path)
                    ),
                );
                tracing::warn!("{}", issue);
                issues.push(issue);
                continue;
            }

            tracing::debug!("registered module {} at {}", import_path, mod_rel.display());
            modules.push(WorkspaceModule {
                import_path,
                path: rel,
                requires: parsed.requires,
            });
        }

        Ok(ModuleRegistry {
            root: root.to_path_buf(),
            modules,
            issues,
        })
    }

    /// A registry with no modules, for workspaces without Go projects.
    pub fn empty(root: &Path) -> Self {
        ModuleRegistry {
            root: root.to_path_buf(),
            modules: Vec::new(),
            issues: Vec::new(),
        }
    }

    pub fn modules(&self) -> &[WorkspaceModule] {
        &self.modules
    }

    /// Problems found while loading.
    pub fn issues(&self) -> &[SyncIssue] {
        &self.issues
    }

    /// The module owning `import`, preferring the longest matching prefix.
    pub fn module_for_import(&self, import: &str) -> Option<&WorkspaceModule> {
        self.modules
            .iter()
            .filter(|m| m.owns(import))
            .max_by_key(|m| m.import_path.len())
    }

    /// Map an import path to the workspace-relative directory holding it.
    ///
    /// Returns `None` for imports outside the workspace and for packages
    /// whose directory does not exist.
    pub fn resolve_import_to_path(&self, import: &str) -> Option<PathBuf> {
        let module = self.module_for_import(import)?;
        let rest = import[module.import_path.len()..].trim_start_matches('/');
        let rel = module.path.join(from_slash(rest));

        if self.root.join(&rel).is_dir() {
            Some(rel)
        } else {
            None
        }
    }

    /// Label of an external package, if some workspace module requires the
    /// module that provides it.
    ///
    /// `github.com/jackc/pgx/v5/pgxpool` becomes
    /// `@com_github_jackc_pgx_v5//pgxpool:pgxpool`. Standard library and
    /// workspace imports map to `None`.
    pub fn external_label(&self, import: &str) -> Option<String> {
        if is_standard_library(import) || self.module_for_import(import).is_some() {
            return None;
        }

        let provider = self
            .modules
            .iter()
            .flat_map(|m| m.requires.iter())
            .map(|r| r.module.as_str())
            .filter(|module| is_path_prefix(module, import))
            .max_by_key(|module| module.len())?;

        let subpath = import[provider.len()..].trim_start_matches('/');
        Some(format!(
            "@{}//{}:{}",
            repository_name(provider),
            subpath,
            target_name(import)
        ))
    }

    /// Import paths of every workspace module, sorted.
    pub fn known_imports(&self) -> Vec<String> {
        let mut imports: Vec<String> = self.modules.iter().map(|m| m.import_path.clone()).collect();
        imports.sort();
        imports
    }
}

/// Whether `prefix` equals `path` or is a `/`-boundary prefix of it.
fn is_path_prefix(prefix: &str, path: &str) -> bool {
    path == prefix
        || (path.starts_with(prefix) && path.as_bytes().get(prefix.len()) == Some(&b'/'))
}

/// Standard library packages have no dot in their first path element.
pub fn is_standard_library(import: &str) -> bool {
    import
        .split('/')
        .next()
        .map(|first| !first.contains('.'))
        .unwrap_or(true)
}

/// External repository name for a module path, following gazelle's
/// reversed-host convention.
pub fn repository_name(module: &str) -> String {
    let mut parts = module.split('/');
    let host = parts.next().unwrap_or_default();

    let mut name: Vec<String> = host.split('.').rev().map(str::to_string).collect();
    name.extend(parts.map(str::to_string));

    name.join("_")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// Default target name of a Go package: its last path element, skipping
/// a major-version suffix such as `v5`.
fn target_name(import: &str) -> String {
    let segments: Vec<&str> = import.split('/').collect();
    let last = segments.last().copied().unwrap_or_default();
    let is_major_suffix = last.len() > 1
        && last.starts_with('v')
        && last[1..].chars().all(|c| c.is_ascii_digit());

    if is_major_suffix && segments.len() > 1 {
        segments[segments.len() - 2].to_string()
    } else {
        last.to_string()
    }
}

/// Strip a trailing `//` comment from a line.
fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"').trim_matches('`')
}

/// Directories listed by `use` directives in a `go.work` file, in order.
///
/// Both `use ./dir` and `use ( ... )` forms are recognised; other
/// directives, including blocks such as `replace ( ... )`, are ignored.
pub fn parse_go_work(contents: &str) -> Vec<String> {
    let mut dirs = Vec::new();
    let mut block: Option<&str> = None;

    for raw in contents.lines() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(directive) = block {
            if line == ")" {
                block = None;
            } else if directive == "use" {
                dirs.push(unquote(line).to_string());
            }
            continue;
        }

        let (directive, rest) = match line.split_once(char::is_whitespace) {
            Some((d, r)) => (d, r.trim()),
            None => (line, ""),
        };

        if rest == "(" {
            block = Some(directive);
        } else if directive == "use" && !rest.is_empty() {
            dirs.push(unquote(rest).to_string());
        }
    }

    dirs
}

/// Add `./<dir>` to a `go.work` file's `use` directives.
///
/// Returns `None` when the directory is already listed. A `use ( ... )`
/// block gets the new entry before its closing parenthesis; otherwise a
/// single-line directive is appended.
pub fn add_use_directive(contents: &str, dir: &str) -> Option<String> {
    let entry = format!("./{}", dir.trim_start_matches("./"));
    let listed = parse_go_work(contents)
        .iter()
        .any(|d| from_slash(d) == from_slash(&entry));
    if listed {
        return None;
    }

    let lines: Vec<&str> = contents.lines().collect();
    let block_start = lines
        .iter()
        .position(|l| strip_comment(l).split_whitespace().collect::<Vec<_>>() == ["use", "("]);

    let mut out: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    match block_start.and_then(|start| {
        lines[start..]
            .iter()
            .position(|l| strip_comment(l).trim() == ")")
            .map(|offset| start + offset)
    }) {
        Some(close) => out.insert(close, format!("\t{}", entry)),
        None => {
            if out.last().map(|l| !l.trim().is_empty()).unwrap_or(false) {
                out.push(String::new());
            }
            out.push(format!("use {}", entry));
        }
    }

    let mut updated = out.join("\n");
    updated.push('\n');
    Some(updated)
}

/// Line-oriented `go.mod` reader.
pub struct GoModParser {
    module_re: Regex,
    require_re: Regex,
}

impl GoModParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(GoModParser {
            module_re: Regex::new(r#"^module\s+"?([^\s"]+)"?$"#)?,
            require_re: Regex::new(r#"^"?([^\s"()]+)"?\s+(v[^\s]+)$"#)?,
        })
    }

    pub fn parse(&self, contents: &str) -> GoMod {
        let mut parsed = GoMod::default();
        let mut block: Option<String> = None;

        for raw in contents.lines() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }

            if let Some(ref directive) = block {
                if line == ")" {
                    block = None;
                } else if directive == "require" {
                    self.push_requirement(line, &mut parsed);
                }
                continue;
            }

            if let Some(caps) = self.module_re.captures(line) {
                parsed.module = Some(caps[1].to_string());
            } else if let Some(rest) = line.strip_prefix("require") {
                let rest = rest.trim();
                if rest == "(" {
                    block = Some("require".to_string());
                } else {
                    self.push_requirement(rest, &mut parsed);
                }
            } else if let Some((directive, "(")) = line
                .split_once(char::is_whitespace)
                .map(|(d, r)| (d, r.trim()))
            {
                block = Some(directive.to_string());
            }
        }

        parsed
    }

    fn push_requirement(&self, line: &str, parsed: &mut GoMod) {
        if let Some(caps) = self.require_re.captures(line.trim()) {
            parsed.requires.push(Requirement {
                module: caps[1].to_string(),
                version: caps[2].to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn svc_workspace() -> TempDir {
        let tmp = TempDir::new().unwrap();
        write(
            tmp.path(),
            "go.work",
            "go 1.22\n\nuse (\n\t./backend/services/svc\n\t./backend/libs/common // shared\n)\n",
        );
        write(
            tmp.path(),
            "backend/services/svc/go.mod",
            "module example.com/w/svc\n\ngo 1.22\n\nrequire (\n\tgithub.com/lib/pq v1.10.9\n\tgithub.com/jackc/pgx/v5 v5.6.0 // indirect\n)\n",
        );
        write(
            tmp.path(),
            "backend/libs/common/go.mod",
            "module example.com/w/common\n\nrequire github.com/google/uuid v1.6.0\n",
        );
        fs::create_dir_all(tmp.path().join("backend/services/svc/internal/util")).unwrap();
        tmp
    }

    #[test]
    fn test_parse_go_work_forms() {
        let work = r#"go 1.22

use ./backend/services/orders
use "./backend/libs/common"

use (
	./backend/libs/db // database helpers
	// ./commented/out
)

replace (
	example.com/x => ./not/a/module
)
"#;
        assert_eq!(
            parse_go_work(work),
            vec![
                "./backend/services/orders",
                "./backend/libs/common",
                "./backend/libs/db",
            ]
        );
    }

    #[test]
    fn test_parse_go_mod() {
        let parser = GoModParser::new().unwrap();
        let parsed = parser.parse(
            "// header\nmodule example.com/w/svc // trailing\n\ngo 1.22\n\nrequire github.com/lib/pq v1.10.9\n\nrequire (\n\tgithub.com/jackc/pgx/v5 v5.6.0 // indirect\n)\n\nexclude (\n\tgithub.com/bad/mod v0.1.0\n)\n",
        );
        assert_eq!(parsed.module.as_deref(), Some("example.com/w/svc"));
        assert_eq!(
            parsed.requires,
            vec![
                Requirement {
                    module: "github.com/lib/pq".into(),
                    version: "v1.10.9".into()
                },
                Requirement {
                    module: "github.com/jackc/pgx/v5".into(),
                    version: "v5.6.0".into()
                },
            ]
        );

        assert_eq!(parser.parse("go 1.22\n").module, None);
    }

    #[test]
    fn test_resolve_import_to_path() {
        let tmp = svc_workspace();
        let registry = ModuleRegistry::load(tmp.path()).unwrap();

        assert_eq!(
            registry.resolve_import_to_path("example.com/w/svc/internal/util"),
            Some(PathBuf::from("backend/services/svc/internal/util"))
        );
        assert_eq!(
            registry.resolve_import_to_path("example.com/w/svc"),
            Some(PathBuf::from("backend/services/svc"))
        );
        assert_eq!(registry.resolve_import_to_path("example.com/w/svc/internal/missing"), None);
        assert_eq!(registry.resolve_import_to_path("github.com/lib/pq"), None);
        // Prefix must end at a path boundary.
        assert_eq!(registry.resolve_import_to_path("example.com/w/svcextra"), None);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "go.work", "use ./outer\nuse ./outer/inner\n");
        write(tmp.path(), "outer/go.mod", "module example.com/outer\n");
        write(tmp.path(), "outer/inner/go.mod", "module example.com/outer/inner\n");
        fs::create_dir_all(tmp.path().join("outer/inner/pkg")).unwrap();

        let registry = ModuleRegistry::load(tmp.path()).unwrap();
        let module = registry.module_for_import("example.com/outer/inner/pkg").unwrap();
        assert_eq!(module.path, PathBuf::from("outer/inner"));
        assert_eq!(
            registry.resolve_import_to_path("example.com/outer/inner/pkg"),
            Some(PathBuf::from("outer/inner/pkg"))
        );
    }

    #[test]
    fn test_bad_entries_are_skipped() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "go.work", "use (\n\t./good\n\t./missing\n\t./nomodule\n\t./dup\n)\n");
        write(tmp.path(), "good/go.mod", "module example.com/good\n");
        write(tmp.path(), "nomodule/go.mod", "go 1.22\n");
        write(tmp.path(), "dup/go.mod", "module example.com/good\n");

        let registry = ModuleRegistry::load(tmp.path()).unwrap();
        assert_eq!(registry.modules().len(), 1);
        assert_eq!(registry.issues().len(), 3);
        assert_eq!(registry.known_imports(), vec!["example.com/good"]);
    }

    #[test]
    fn test_missing_go_work() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            ModuleRegistry::load(tmp.path()),
            Err(RegistryError::Missing { .. })
        ));
    }

    #[test]
    fn test_external_labels() {
        let tmp = svc_workspace();
        let registry = ModuleRegistry::load(tmp.path()).unwrap();

        assert_eq!(
            registry.external_label("github.com/lib/pq").as_deref(),
            Some("@com_github_lib_pq//:pq")
        );
        assert_eq!(
            registry.external_label("github.com/jackc/pgx/v5").as_deref(),
            Some("@com_github_jackc_pgx_v5//:pgx")
        );
        assert_eq!(
            registry.external_label("github.com/jackc/pgx/v5/pgxpool").as_deref(),
            Some("@com_github_jackc_pgx_v5//pgxpool:pgxpool")
        );
        assert_eq!(
            registry.external_label("github.com/google/uuid").as_deref(),
            Some("@com_github_google_uuid//:uuid")
        );
        assert_eq!(registry.external_label("net/http"), None);
        assert_eq!(registry.external_label("example.com/w/common"), None);
        assert_eq!(registry.external_label("github.com/not/required"), None);
    }

    #[test]
    fn test_repository_name() {
        assert_eq!(repository_name("github.com/lib/pq"), "com_github_lib_pq");
        assert_eq!(repository_name("modernc.org/sqlite"), "org_modernc_sqlite");
        assert_eq!(repository_name("gopkg.in/yaml.v3"), "in_gopkg_yaml_v3");
    }

    #[test]
    fn test_add_use_directive() {
        let block = "go 1.22\n\nuse (\n\t./backend/libs/common\n)\n";
        assert_eq!(
            add_use_directive(block, "backend/services/orders").unwrap(),
            "go 1.22\n\nuse (\n\t./backend/libs/common\n\t./backend/services/orders\n)\n"
        );
        assert_eq!(add_use_directive(block, "./backend/libs/common"), None);

        let bare = "go 1.22\n";
        assert_eq!(
            add_use_directive(bare, "backend/libs/db").unwrap(),
            "go 1.22\n\nuse ./backend/libs/db\n"
        );
    }
}
