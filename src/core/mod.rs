//! Core data structures for forge.
//!
//! - The workspace manifest (`forge.json`) and its projects
//! - The loaded workspace handed to every operation

pub mod manifest;
pub mod project;
pub mod workspace;

pub use manifest::{ManifestError, WorkspaceManifest, MANIFEST_NAME};
pub use project::{ArchitectTarget, Language, Project, ProjectType};
pub use workspace::{Workspace, GO_MOD, GO_WORK, MODULE_FILE};
