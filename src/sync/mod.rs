//! Workspace synchronization engine.
//!
//! The pieces here are read-only: they discover packages, extract their
//! imports, resolve imports against the module registry, compute fixture
//! dependencies and describe each package as a build-file record. Writing
//! files is left to [`crate::ops::forge_sync`].

pub mod describe;
pub mod discovery;
pub mod fixtures;
pub mod imports;
pub mod registry;
pub mod report;

use std::path::{Path, PathBuf};

use crate::util::fs::{from_slash, to_slash};

pub use describe::{package_files_target, BuildDescriber, PackageFacts};
pub use discovery::{DiscoveredPackage, Discovery, PackageDiscovery, PackageKind};
pub use fixtures::FixtureResolver;
pub use imports::{GoImportExtractor, ImportExtractor};
pub use registry::{ModuleRegistry, RegistryError, WorkspaceModule};
pub use report::{SyncIssue, SyncReport};

/// Label of the default target of a workspace-relative package directory.
///
/// `backend/libs/common` becomes `//backend/libs/common`; the root is `//`.
pub fn package_label(path: &Path) -> String {
    format!("//{}", to_slash(path))
}

/// Label of a named target inside a workspace-relative directory.
pub fn target_label(path: &Path, target: &str) -> String {
    format!("//{}:{}", to_slash(path), target)
}

/// Split `//dir:target` into its directory and target name.
pub fn split_label(label: &str) -> Option<(PathBuf, &str)> {
    let (dir, target) = label.strip_prefix("//")?.split_once(':')?;
    Some((from_slash(dir), target))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(package_label(Path::new("backend/libs/common")), "//backend/libs/common");
        assert_eq!(package_label(Path::new("")), "//");
        assert_eq!(
            target_label(Path::new("backend/services/orders"), "migrations"),
            "//backend/services/orders:migrations"
        );
        assert_eq!(target_label(Path::new(""), "gazelle"), "//:gazelle");
    }

    #[test]
    fn test_split_label() {
        assert_eq!(
            split_label("//services/orders/db:migrations"),
            Some((PathBuf::from("services/orders/db"), "migrations"))
        );
        assert_eq!(split_label("//:migrations"), Some((PathBuf::new(), "migrations")));
        assert_eq!(split_label("@com_github_lib_pq//:pq"), None);
    }
}
