//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;

use forge::ops::ProjectKind;
use forge::util::shell::ColorChoice;

/// forge - scaffolding and build-file synchronization for Bazel monorepos
#[derive(Parser)]
#[command(name = "forge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto", value_parser = parse_color)]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

fn parse_color(s: &str) -> Result<ColorChoice, String> {
    s.parse()
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new workspace
    New(NewArgs),

    /// Generate a project inside the current workspace
    #[command(alias = "g")]
    Generate(GenerateArgs),

    /// Regenerate BUILD.bazel and MODULE.bazel files
    Sync(SyncArgs),

    /// Check that the workspace has been synced
    Validate,

    /// List registered projects
    List(ListArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

impl Commands {
    /// Whether the command was asked for machine-readable output.
    pub fn wants_json(&self) -> bool {
        match self {
            Commands::Sync(args) => args.json,
            Commands::List(args) => args.json,
            _ => false,
        }
    }
}

#[derive(Args)]
pub struct NewArgs {
    /// Workspace name
    pub name: String,

    /// Directory to create the workspace in (defaults to name)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Go module prefix for generated modules (defaults to example.com/<name>)
    #[arg(long)]
    pub module_prefix: Option<String>,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[command(subcommand)]
    pub kind: GenerateKind,

    /// Do not run a sync after generating
    #[arg(long, global = true)]
    pub no_sync: bool,
}

#[derive(Subcommand)]
pub enum GenerateKind {
    /// Go HTTP service with a container image
    GoService(NameArgs),

    /// Go library module
    GoLibrary(NameArgs),

    /// NestJS service
    NestService(NameArgs),

    /// Angular application
    AngularApp(NameArgs),

    /// React application
    ReactApp(NameArgs),
}

impl GenerateKind {
    pub fn split(&self) -> (ProjectKind, &str) {
        match self {
            GenerateKind::GoService(a) => (ProjectKind::GoService, &a.name),
            GenerateKind::GoLibrary(a) => (ProjectKind::GoLibrary, &a.name),
            GenerateKind::NestService(a) => (ProjectKind::NestService, &a.name),
            GenerateKind::AngularApp(a) => (ProjectKind::AngularApp, &a.name),
            GenerateKind::ReactApp(a) => (ProjectKind::ReactApp, &a.name),
        }
    }
}

#[derive(Args)]
pub struct NameArgs {
    /// Project name
    pub name: String,
}

#[derive(Args)]
pub struct SyncArgs {
    /// Show what would change without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Fail if any generated file is out of date (writes nothing)
    #[arg(long, conflicts_with = "dry_run")]
    pub check: bool,

    /// Skip the dependency tidy and graph tools
    #[arg(long)]
    pub no_tools: bool,

    /// Print the sync report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Print projects as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: CompletionShell,
}
