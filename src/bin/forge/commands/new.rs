//! `forge new` command

use anyhow::Result;

use crate::cli::NewArgs;
use crate::GlobalOptions;
use forge::ops::{new_workspace, NewOptions};
use forge::templates::BuiltinTemplates;
use forge::util::shell::Status;

pub fn execute(args: NewArgs, opts: &GlobalOptions) -> Result<()> {
    let shell = &opts.shell;
    let path = match args.path {
        Some(p) if p.is_absolute() => p,
        Some(p) => opts.ctx.cwd().join(p),
        None => opts.ctx.cwd().join(&args.name),
    };

    let new_opts = NewOptions {
        name: args.name.clone(),
        module_prefix: args.module_prefix,
    };
    let files = new_workspace(&path, &new_opts, &BuiltinTemplates)?;

    for file in &files {
        shell.verbose(Status::Created, file.display());
    }
    shell.status(
        Status::Created,
        format!("workspace `{}` at {}", args.name, path.display()),
    );
    shell.note(format!(
        "next: cd {} && forge generate go-service <name>",
        path.display()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: NewArgs,
    }

    #[test]
    fn test_new_args_defaults() {
        let cli = TestCli::parse_from(["test", "shop"]);
        assert_eq!(cli.args.name, "shop");
        assert!(cli.args.path.is_none());
        assert!(cli.args.module_prefix.is_none());
    }

    #[test]
    fn test_new_args_with_prefix_and_path() {
        let cli = TestCli::parse_from([
            "test",
            "shop",
            "--path",
            "work/shop",
            "--module-prefix",
            "github.com/acme/shop",
        ]);
        assert_eq!(cli.args.path.as_deref(), Some(std::path::Path::new("work/shop")));
        assert_eq!(cli.args.module_prefix.as_deref(), Some("github.com/acme/shop"));
    }
}
