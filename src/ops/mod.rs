//! High-level operations.
//!
//! This module contains the implementation of forge commands.

pub mod forge_generate;
pub mod forge_new;
pub mod forge_sync;

pub use forge_generate::{generate, GenerateResult, ProjectKind};
pub use forge_new::{new_workspace, validate_name, NewOptions};
pub use forge_sync::{Drift, DriftKind, SyncOptions, SyncPlan, Synchronizer};
