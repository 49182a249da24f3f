//! Bazel build-file text.
//!
//! Each record is the complete input of one generated section. Rendering is
//! deterministic: lists are emitted in the order given (callers sort them)
//! and attributes always appear in the same order.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// First line of every generated file.
pub const GENERATED_HEADER: &str = "# Generated by forge. DO NOT EDIT.";

pub const RULES_GO_VERSION: &str = "0.50.1";
pub const GAZELLE_VERSION: &str = "0.39.1";
pub const RULES_OCI_VERSION: &str = "2.0.0";
pub const RULES_PKG_VERSION: &str = "1.0.1";
pub const RULES_JS_VERSION: &str = "2.1.0";
pub const RULES_TS_VERSION: &str = "3.2.1";
pub const RULES_NODEJS_VERSION: &str = "6.3.0";

/// Base image for Go service containers.
pub const BASE_IMAGE: &str = "gcr.io/distroless/base";

/// Input of a module root's build file: gazelle directives only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRootRecord {
    pub import_path: String,
    /// Other workspace modules as `(import path, label)` pairs
    pub local_modules: Vec<(String, String)>,
}

/// Input of an entry-point package's build file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryRecord {
    pub name: String,
    pub import_path: String,
    /// `<workspace>/<name>:latest`
    pub image_tag: String,
    pub sources: Vec<String>,
    pub tests: Vec<String>,
    pub deps: Vec<String>,
    pub test_deps: Vec<String>,
    pub has_tests: bool,
    pub has_fixtures: bool,
    pub fixtures_dir: String,
    /// Files target of the fixtures directory when it is a package itself
    #[serde(default)]
    pub fixtures_files: Option<String>,
}

/// Input of a library package's build file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRecord {
    pub name: String,
    pub import_path: String,
    pub sources: Vec<String>,
    pub tests: Vec<String>,
    pub deps: Vec<String>,
    pub test_deps: Vec<String>,
    pub has_tests: bool,
    pub has_fixtures: bool,
    pub fixtures_dir: String,
    /// Files target of the fixtures directory when it is a package itself
    #[serde(default)]
    pub fixtures_files: Option<String>,
    /// Fixture labels the tests need, sorted
    pub fixture_deps: Vec<String>,
}

/// A fixtures-only section for directories that provide fixtures to the
/// packages below them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixturesRecord {
    /// Target name, also the fixtures directory name
    pub name: String,
    /// Files target of the fixtures directory when it is a package itself
    #[serde(default)]
    pub files: Option<String>,
}

/// A filegroup exporting every file of a package that a parent uses as its
/// fixtures directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFilesRecord {
    pub name: String,
    /// File names left out of the glob
    pub exclude: Vec<String>,
}

/// Input of an Angular or React application's build file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendRecord {
    pub name: String,
    /// Workspace-relative project root, `/`-separated
    pub package: String,
    /// `angular` or `react`
    pub framework: String,
}

/// Input of a NestJS service's build file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestRecord {
    pub name: String,
    pub package: String,
}

/// Input of the workspace root's build file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRootRecord {
    pub go: bool,
    pub javascript: bool,
}

/// A `go_deps.module` pin in `MODULE.bazel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePin {
    pub path: String,
    pub version: String,
}

/// Input of the top-level `MODULE.bazel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFileRecord {
    pub name: String,
    /// Active languages, sorted
    pub languages: Vec<String>,
    pub go: bool,
    pub javascript: bool,
    pub go_version: String,
    pub node_version: String,
    /// In-workspace library modules pinned through `go_deps`
    pub pins: Vec<ModulePin>,
    /// External repositories made visible through `use_repo`, sorted
    pub go_repositories: Vec<String>,
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s)
}

fn load(out: &mut String, file: &str, symbols: &[&str]) {
    let symbols: Vec<String> = symbols.iter().map(|s| quote(s)).collect();
    let _ = writeln!(out, "load({}, {})", quote(file), symbols.join(", "));
}

fn attr(out: &mut String, key: &str, value: &str) {
    let _ = writeln!(out, "    {} = {},", key, value);
}

fn attr_str(out: &mut String, key: &str, value: &str) {
    attr(out, key, &quote(value));
}

/// A list attribute, omitted when empty.
fn attr_list(out: &mut String, key: &str, items: &[String]) {
    match items {
        [] => {}
        [single] => {
            let _ = writeln!(out, "    {} = [{}],", key, quote(single));
        }
        _ => {
            let _ = writeln!(out, "    {} = [", key);
            for item in items {
                let _ = writeln!(out, "        {},", quote(item));
            }
            out.push_str("    ],\n");
        }
    }
}

/// A call with one attribute per line.
fn call(out: &mut String, kind: &str, body: impl FnOnce(&mut String)) {
    let _ = writeln!(out, "{}(", kind);
    body(out);
    out.push_str(")\n");
}

/// A top-level rule, separated from the previous one by a blank line.
fn rule(out: &mut String, kind: &str, body: impl FnOnce(&mut String)) {
    if !out.is_empty() && !out.ends_with("\n\n") {
        out.push('\n');
    }
    call(out, kind, body);
}

/// A glob stops at package boundaries, so a fixtures directory that is a
/// package itself is pulled in through its files target.
fn fixtures_filegroup(out: &mut String, dir: &str, files: Option<&str>) {
    rule(out, "filegroup", |out| {
        attr_str(out, "name", dir);
        match files {
            Some(label) => attr_list(out, "srcs", &[label.to_string()]),
            None => attr(out, "srcs", &format!("glob([{}])", quote(&format!("{}/**", dir)))),
        }
        attr_list(out, "visibility", &["//visibility:public".to_string()]);
    });
}

pub fn module_root(record: &ModuleRootRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# gazelle:prefix {}", record.import_path);
    for (import_path, label) in &record.local_modules {
        let _ = writeln!(out, "# gazelle:resolve go {} {}", import_path, label);
    }
    out
}

pub fn binary(record: &BinaryRecord) -> String {
    let lib = format!("{}_lib", record.name);
    let image = format!("{}_image", record.name);
    let mut out = String::new();

    let mut go_symbols = vec!["go_binary", "go_library"];
    if record.has_tests {
        go_symbols.push("go_test");
    }
    load(&mut out, "@rules_go//go:def.bzl", &go_symbols);
    load(&mut out, "@rules_oci//oci:defs.bzl", &["oci_image", "oci_load"]);
    load(&mut out, "@rules_pkg//pkg:tar.bzl", &["pkg_tar"]);
    out.push('\n');

    rule(&mut out, "go_library", |out| {
        attr_str(out, "name", &lib);
        attr_list(out, "srcs", &record.sources);
        attr_str(out, "importpath", &record.import_path);
        attr_list(out, "visibility", &["//visibility:private".to_string()]);
        attr_list(out, "deps", &record.deps);
    });

    rule(&mut out, "go_binary", |out| {
        attr_str(out, "name", &record.name);
        attr_list(out, "embed", &[format!(":{}", lib)]);
        attr_list(out, "visibility", &["//visibility:public".to_string()]);
    });

    if record.has_tests {
        rule(&mut out, "go_test", |out| {
            attr_str(out, "name", &format!("{}_test", record.name));
            attr_list(out, "srcs", &record.tests);
            if record.has_fixtures {
                attr_list(out, "data", &[format!(":{}", record.fixtures_dir)]);
            }
            attr_list(out, "embed", &[format!(":{}", lib)]);
            attr_list(out, "deps", &record.test_deps);
        });
    }

    if record.has_fixtures {
        fixtures_filegroup(&mut out, &record.fixtures_dir, record.fixtures_files.as_deref());
    }

    rule(&mut out, "pkg_tar", |out| {
        attr_str(out, "name", &format!("{}_layer", record.name));
        attr_list(out, "srcs", &[format!(":{}", record.name)]);
    });

    rule(&mut out, "oci_image", |out| {
        attr_str(out, "name", &image);
        attr_str(out, "base", "@distroless_base");
        attr_list(out, "entrypoint", &[format!("/{}", record.name)]);
        attr_list(out, "tars", &[format!(":{}_layer", record.name)]);
    });

    rule(&mut out, "oci_load", |out| {
        attr_str(out, "name", &format!("{}_load", image));
        attr_str(out, "image", &format!(":{}", image));
        attr_list(out, "repo_tags", &[record.image_tag.clone()]);
    });

    out
}

pub fn library(record: &LibraryRecord) -> String {
    let has_sources = !record.sources.is_empty();
    let mut out = String::new();

    let mut go_symbols = Vec::new();
    if has_sources {
        go_symbols.push("go_library");
    }
    if record.has_tests {
        go_symbols.push("go_test");
    }
    if !go_symbols.is_empty() {
        load(&mut out, "@rules_go//go:def.bzl", &go_symbols);
        out.push('\n');
    }

    if has_sources {
        rule(&mut out, "go_library", |out| {
            attr_str(out, "name", &record.name);
            attr_list(out, "srcs", &record.sources);
            attr_str(out, "importpath", &record.import_path);
            attr_list(out, "visibility", &["//visibility:public".to_string()]);
            attr_list(out, "deps", &record.deps);
        });
    }

    if record.has_tests {
        rule(&mut out, "go_test", |out| {
            attr_str(out, "name", &format!("{}_test", record.name));
            attr_list(out, "srcs", &record.tests);
            attr_list(out, "data", &record.fixture_deps);
            if has_sources {
                attr_list(out, "embed", &[format!(":{}", record.name)]);
            }
            attr_list(out, "deps", &record.test_deps);
        });
    }

    if record.has_fixtures {
        fixtures_filegroup(&mut out, &record.fixtures_dir, record.fixtures_files.as_deref());
    }

    out
}

pub fn fixtures(record: &FixturesRecord) -> String {
    let mut out = String::new();
    fixtures_filegroup(&mut out, &record.name, record.files.as_deref());
    out
}

pub fn package_files(record: &PackageFilesRecord) -> String {
    let exclude: Vec<String> = record.exclude.iter().map(|f| quote(f)).collect();
    let mut out = String::new();
    rule(&mut out, "filegroup", |out| {
        attr_str(out, "name", &record.name);
        attr(
            out,
            "srcs",
            &format!("glob([\"**\"], exclude = [{}])", exclude.join(", ")),
        );
        attr_list(out, "visibility", &["//visibility:public".to_string()]);
    });
    out
}

/// npm package and binary that drive a framework's build.
fn framework_cli(framework: &str) -> (&'static str, &'static str, &'static str) {
    match framework {
        "angular" => ("@angular/cli", "angular_cli", "ng"),
        "nestjs" => ("@nestjs/cli", "nest_cli", "nest"),
        _ => ("vite", "vite", "vite"),
    }
}

/// Shared npm build section for the JavaScript frameworks.
fn npm_build(out: &mut String, package: &str, framework: &str, js_symbols: &[&str]) {
    let (cli_package, alias, bin) = framework_cli(framework);

    load(out, "@aspect_rules_js//js:defs.bzl", js_symbols);
    let _ = writeln!(
        out,
        "load({}, {} = \"bin\")",
        quote(&format!("@npm//{}:{}/package_json.bzl", package, cli_package)),
        alias
    );
    load(out, "@npm//:defs.bzl", &["npm_link_all_packages"]);
    out.push('\n');

    out.push_str("npm_link_all_packages(name = \"node_modules\")\n");

    rule(out, "js_library", |out| {
        attr_str(out, "name", "srcs");
        attr(
            out,
            "srcs",
            "glob([\"src/**/*\"]) + glob([\"*.json\"], allow_empty = True)",
        );
        attr_list(out, "visibility", &["//visibility:public".to_string()]);
    });

    rule(out, &format!("{}.{}", alias, bin), |out| {
        attr_str(out, "name", "build");
        attr_list(out, "srcs", &[":node_modules".to_string(), ":srcs".to_string()]);
        attr_list(out, "args", &["build".to_string()]);
        attr(out, "chdir", "package_name()");
        attr_list(out, "out_dirs", &["dist".to_string()]);
    });
}

pub fn frontend(record: &FrontendRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {} application `{}`", record.framework, record.name);
    npm_build(&mut out, &record.package, &record.framework, &["js_library"]);
    out
}

pub fn nest(record: &NestRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# nestjs service `{}`", record.name);
    npm_build(&mut out, &record.package, "nestjs", &["js_binary", "js_library"]);

    rule(&mut out, "js_binary", |out| {
        attr_str(out, "name", &record.name);
        attr_list(out, "data", &[":build".to_string(), ":node_modules".to_string()]);
        attr_str(out, "entry_point", "dist/main.js");
    });
    out
}

pub fn workspace_root(record: &WorkspaceRootRecord) -> String {
    let mut out = String::new();
    if record.go {
        load(&mut out, "@gazelle//:def.bzl", &["gazelle"]);
    }
    if record.javascript {
        load(&mut out, "@npm//:defs.bzl", &["npm_link_all_packages"]);
    }

    if record.go {
        out.push('\n');
        out.push_str("exports_files([\"go.work\"])\n");
        rule(&mut out, "gazelle", |out| {
            attr_str(out, "name", "gazelle");
        });
    }
    if record.javascript {
        out.push('\n');
        out.push_str("npm_link_all_packages(name = \"node_modules\")\n");
    }
    out
}

pub fn module_file(record: &ModuleFileRecord) -> String {
    let mut out = String::new();

    rule(&mut out, "module", |out| {
        attr_str(out, "name", &record.name);
        attr_str(out, "version", "0.0.0");
    });
    out.push('\n');
    let _ = writeln!(out, "# Active toolchains: {}", record.languages.join(", "));
    out.push('\n');

    let mut dep = |name: &str, version: &str| {
        let _ = writeln!(out, "bazel_dep(name = {}, version = {})", quote(name), quote(version));
    };
    dep("rules_pkg", RULES_PKG_VERSION);
    if record.go {
        dep("rules_go", RULES_GO_VERSION);
        dep("gazelle", GAZELLE_VERSION);
        dep("rules_oci", RULES_OCI_VERSION);
    }
    if record.javascript {
        dep("aspect_rules_js", RULES_JS_VERSION);
        dep("aspect_rules_ts", RULES_TS_VERSION);
        dep("rules_nodejs", RULES_NODEJS_VERSION);
    }

    if record.go {
        out.push('\n');
        out.push_str(
            "go_sdk = use_extension(\"@rules_go//go:extensions.bzl\", \"go_sdk\")\n",
        );
        let _ = writeln!(out, "go_sdk.download(version = {})", quote(&record.go_version));
        out.push('\n');
        out.push_str("go_deps = use_extension(\"@gazelle//:extensions.bzl\", \"go_deps\")\n");
        out.push_str("go_deps.from_file(go_work = \"//:go.work\")\n");
        for pin in &record.pins {
            let _ = writeln!(
                out,
                "go_deps.module(path = {}, version = {})",
                quote(&pin.path),
                quote(&pin.version)
            );
        }
        if !record.go_repositories.is_empty() {
            let repos: Vec<String> = record.go_repositories.iter().map(|r| quote(r)).collect();
            let _ = writeln!(out, "use_repo(go_deps, {})", repos.join(", "));
        }

        out.push('\n');
        out.push_str("oci = use_extension(\"@rules_oci//oci:extensions.bzl\", \"oci\")\n");
        call(&mut out, "oci.pull", |out| {
            attr_str(out, "name", "distroless_base");
            attr_str(out, "image", BASE_IMAGE);
            attr_str(out, "tag", "latest");
            attr_list(
                out,
                "platforms",
                &["linux/amd64".to_string(), "linux/arm64/v8".to_string()],
            );
        });
        out.push_str(
            "use_repo(oci, \"distroless_base\", \"distroless_base_linux_amd64\", \"distroless_base_linux_arm64_v8\")\n",
        );
    }

    if record.javascript {
        out.push('\n');
        out.push_str("node = use_extension(\"@rules_nodejs//nodejs:extensions.bzl\", \"node\")\n");
        let _ = writeln!(out, "node.toolchain(node_version = {})", quote(&record.node_version));
        out.push('\n');
        out.push_str("npm = use_extension(\"@aspect_rules_js//npm:extensions.bzl\", \"npm\")\n");
        call(&mut out, "npm.npm_translate_lock", |out| {
            attr_str(out, "name", "npm");
            attr_str(out, "pnpm_lock", "//:pnpm-lock.yaml");
        });
        out.push_str("use_repo(npm, \"npm\")\n");
        out.push('\n');
        out.push_str(
            "rules_ts_ext = use_extension(\"@aspect_rules_ts//ts:extensions.bzl\", \"ext\")\n",
        );
        out.push_str("rules_ts_ext.deps()\n");
        out.push_str("use_repo(rules_ts_ext, \"npm_typescript\")\n");
    }

    out
}
