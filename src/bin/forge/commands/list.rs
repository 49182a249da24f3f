//! `forge list` command

use anyhow::{Context, Result};

use super::load_workspace;
use crate::GlobalOptions;

pub fn execute(opts: &GlobalOptions) -> Result<()> {
    let ws = load_workspace(opts)?;
    let projects = &ws.manifest().projects;

    if opts.shell.is_json() {
        let value = serde_json::to_value(projects).context("failed to serialize projects")?;
        opts.shell.json_event(&value);
        return Ok(());
    }

    if projects.is_empty() {
        opts.shell.note("no projects registered; try `forge generate`");
        return Ok(());
    }

    let width = projects.keys().map(|n| n.len()).max().unwrap_or(0);
    for (name, project) in projects {
        println!(
            "{:<width$}  {:<11}  {:<7}  {}",
            name,
            project.project_type.as_str(),
            project.language.as_str(),
            project.root,
            width = width
        );
    }
    Ok(())
}
