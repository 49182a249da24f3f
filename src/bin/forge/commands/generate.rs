//! `forge generate` command

use anyhow::Result;

use super::load_workspace;
use super::sync::run_sync;
use crate::cli::GenerateArgs;
use crate::GlobalOptions;
use forge::ops::{generate, SyncOptions};
use forge::templates::BuiltinTemplates;
use forge::util::shell::Status;

pub fn execute(args: GenerateArgs, opts: &GlobalOptions) -> Result<()> {
    let shell = &opts.shell;
    let ws = load_workspace(opts)?;
    let (kind, name) = args.kind.split();

    let result = generate(&ws, &BuiltinTemplates, kind, name)?;

    for file in &result.files {
        shell.verbose(Status::Created, file.display());
    }
    shell.status(
        Status::Created,
        format!("{} `{}` at {}", kind, result.name, result.root),
    );
    if result.registered_module {
        shell.status(Status::Registered, format!("./{} in go.work", result.root));
    }

    if args.no_sync {
        shell.note("run `forge sync` to generate build files");
        return Ok(());
    }

    // The manifest on disk now lists the new project.
    let ws = load_workspace(opts)?;
    run_sync(&ws, &SyncOptions::default(), opts)
}
