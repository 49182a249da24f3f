//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod process;
pub mod shell;

pub use config::{Config, SyncConfig};
pub use context::GlobalContext;
pub use diagnostic::Diagnostic;
pub use process::{CommandOutput, CommandRunner, SystemRunner};
pub use shell::Shell;
