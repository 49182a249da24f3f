//! Command implementations

pub mod completions;
pub mod generate;
pub mod list;
pub mod new;
pub mod sync;
pub mod validate;

use anyhow::Result;

use crate::GlobalOptions;
use forge::core::Workspace;

/// Load the workspace enclosing the current directory.
pub fn load_workspace(opts: &GlobalOptions) -> Result<Workspace> {
    let root = opts.ctx.find_workspace_root()?;
    tracing::debug!("workspace root: {}", root.display());
    Workspace::load(&root, &opts.ctx)
}
