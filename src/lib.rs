//! forge - scaffolding and build-file synchronization for Bazel monorepos
//!
//! This crate provides the library behind the `forge` binary: the workspace
//! manifest, project generators, and the sync engine that keeps generated
//! `BUILD.bazel` and `MODULE.bazel` files in step with the source tree.

pub mod core;
pub mod ops;
pub mod sync;
pub mod templates;
pub mod util;

/// Test utilities and mocks for forge unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides a scripted command runner, a recording
/// template renderer and on-disk workspace fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{manifest::WorkspaceManifest, project::Project, workspace::Workspace};
pub use ops::{SyncOptions, Synchronizer};
pub use sync::SyncReport;
pub use util::context::GlobalContext;
