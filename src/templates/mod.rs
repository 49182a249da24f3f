//! Text generation.
//!
//! Everything forge writes goes through the [`Templates`] trait: callers
//! assemble a typed record, serialize it, and ask for a template by id.
//! [`BuiltinTemplates`] is the implementation shipped with the binary.

pub mod bazel;
pub mod scaffold;

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub use bazel::{
    BinaryRecord, FixturesRecord, FrontendRecord, LibraryRecord, ModuleFileRecord, ModulePin,
    ModuleRootRecord, NestRecord, PackageFilesRecord, WorkspaceRootRecord, GENERATED_HEADER,
};
pub use scaffold::{Blueprint, ScaffoldRecord};

/// Template ids for generated build files.
pub mod ids {
    pub const MODULE_ROOT: &str = "bazel/module_root";
    pub const GO_BINARY: &str = "bazel/go_binary";
    pub const GO_LIBRARY: &str = "bazel/go_library";
    pub const FIXTURES: &str = "bazel/fixtures";
    pub const PACKAGE_FILES: &str = "bazel/package_files";
    pub const FRONTEND: &str = "bazel/frontend";
    pub const NEST: &str = "bazel/nest";
    pub const MODULE_FILE: &str = "bazel/module_file";
    pub const WORKSPACE_ROOT: &str = "bazel/workspace_root";
}

/// Renders a template by id from a JSON data record.
pub trait Templates {
    fn render(&self, template: &str, data: &serde_json::Value) -> Result<String>;
}

/// Serialize `record` and render it with `template`.
pub fn render_record<T: Serialize>(
    templates: &dyn Templates,
    template: &str,
    record: &T,
) -> Result<String> {
    let data = serde_json::to_value(record)
        .with_context(|| format!("failed to serialize data for template `{}`", template))?;
    templates.render(template, &data)
}

/// Join rendered sections into one generated file.
pub fn compose_generated_file(sections: &[String]) -> String {
    let mut out = String::from(GENERATED_HEADER);
    out.push('\n');
    for section in sections {
        out.push('\n');
        out.push_str(section.trim_end());
        out.push('\n');
    }
    out
}

/// Templates compiled into forge.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTemplates;

fn record<T: DeserializeOwned>(template: &str, data: &serde_json::Value) -> Result<T> {
    serde_json::from_value(data.clone())
        .with_context(|| format!("invalid data for template `{}`", template))
}

impl Templates for BuiltinTemplates {
    fn render(&self, template: &str, data: &serde_json::Value) -> Result<String> {
        let text = match template {
            ids::MODULE_ROOT => bazel::module_root(&record(template, data)?),
            ids::GO_BINARY => bazel::binary(&record(template, data)?),
            ids::GO_LIBRARY => bazel::library(&record(template, data)?),
            ids::FIXTURES => bazel::fixtures(&record(template, data)?),
            ids::PACKAGE_FILES => bazel::package_files(&record(template, data)?),
            ids::FRONTEND => bazel::frontend(&record(template, data)?),
            ids::NEST => bazel::nest(&record(template, data)?),
            ids::MODULE_FILE => bazel::module_file(&record(template, data)?),
            ids::WORKSPACE_ROOT => bazel::workspace_root(&record(template, data)?),
            other => {
                let source = scaffold::source(other)
                    .ok_or_else(|| anyhow!("unknown template `{}`", other))?;
                scaffold::substitute(source, data)
            }
        };
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_template() {
        let err = BuiltinTemplates.render("nope", &json!({})).unwrap_err();
        assert!(err.to_string().contains("unknown template `nope`"));
    }

    #[test]
    fn test_invalid_record_data() {
        let err = BuiltinTemplates
            .render(ids::GO_BINARY, &json!({ "name": "x" }))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("invalid data for template `bazel/go_binary`"));
    }

    #[test]
    fn test_render_record_round_trips_through_json() {
        let record = FixturesRecord {
            name: "migrations".into(),
            files: None,
        };
        let text = render_record(&BuiltinTemplates, ids::FIXTURES, &record).unwrap();
        assert!(text.contains("name = \"migrations\""));
    }

    #[test]
    fn test_compose_generated_file() {
        let text = compose_generated_file(&[
            "# gazelle:prefix example.com/tool\n".to_string(),
            "go_library(\n)\n\n".to_string(),
        ]);
        assert_eq!(
            text,
            "# Generated by forge. DO NOT EDIT.\n\n# gazelle:prefix example.com/tool\n\ngo_library(\n)\n"
        );
    }
}
