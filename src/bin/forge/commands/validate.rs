//! `forge validate` command

use anyhow::Result;

use super::load_workspace;
use crate::GlobalOptions;
use forge::ops::Synchronizer;
use forge::templates::BuiltinTemplates;
use forge::util::shell::Status;
use forge::util::SystemRunner;

pub fn execute(opts: &GlobalOptions) -> Result<()> {
    let ws = load_workspace(opts)?;
    Synchronizer::new(&ws, &SystemRunner, &BuiltinTemplates).validate()?;

    opts.shell.status(
        Status::Finished,
        format!("workspace `{}` is valid", ws.name()),
    );
    Ok(())
}
