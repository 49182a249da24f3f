//! forge CLI - scaffolding and build-file sync for Bazel monorepos

use anyhow::Result;
use clap::Parser;
use miette::Diagnostic as _;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use forge::core::ManifestError;
use forge::sync::RegistryError;
use forge::util::diagnostic::{emit, suggestions};
use forge::util::shell::{ColorChoice, Shell};
use forge::util::{Diagnostic, GlobalContext};

/// Options shared by every command.
pub struct GlobalOptions {
    pub shell: Shell,
    pub ctx: GlobalContext,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("forge=debug")
    } else if cli.quiet {
        EnvFilter::new("forge=error")
    } else {
        EnvFilter::new("forge=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(cli.color == ColorChoice::Always)
        .with_target(false)
        .without_time()
        .init();

    let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color, cli.command.wants_json());
    let color = shell.use_color();

    if let Err(e) = run(cli, shell) {
        report_error(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: Shell) -> Result<()> {
    let mut ctx = GlobalContext::new()?;
    ctx.set_verbose(cli.verbose);
    let opts = GlobalOptions { shell, ctx };

    match cli.command {
        Commands::New(args) => commands::new::execute(args, &opts),
        Commands::Generate(args) => commands::generate::execute(args, &opts),
        Commands::Sync(args) => commands::sync::execute(args, &opts),
        Commands::Validate => commands::validate::execute(&opts),
        Commands::List(_) => commands::list::execute(&opts),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

fn report_error(err: &anyhow::Error, color: bool) {
    let mut diag = Diagnostic::error(err.to_string());
    for cause in err.chain().skip(1) {
        diag = diag.with_context(cause.to_string());
    }
    if let Some(help) = help_for(err) {
        diag = diag.with_suggestion(help);
    }
    emit(&diag, color);
}

fn help_for(err: &anyhow::Error) -> Option<String> {
    if let Some(e) = err.downcast_ref::<ManifestError>() {
        return e.help().map(|h| h.to_string());
    }
    if let Some(e) = err.downcast_ref::<RegistryError>() {
        return e.help().map(|h| h.to_string());
    }
    if err.downcast_ref::<commands::sync::OutOfDate>().is_some() {
        return Some(suggestions::STALE_BUILD_FILES.to_string());
    }
    None
}
