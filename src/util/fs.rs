//! Filesystem utilities.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};

/// Directory names that are never walked, regardless of configuration.
const ALWAYS_SKIPPED: &[&str] = &["node_modules", "vendor"];

/// Check whether a directory should be skipped during tree walks.
///
/// Hidden directories (`.git`, `.forge`, ...), Bazel output symlinks
/// (`bazel-out`, `bazel-<workspace>`) and dependency caches are skipped.
pub fn is_skipped_dir(name: &str, extra: &[String]) -> bool {
    name.starts_with('.')
        || name.starts_with("bazel-")
        || ALWAYS_SKIPPED.contains(&name)
        || extra.iter().any(|e| e == name)
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write a string to a file, creating parent directories if needed.
///
/// The content is written to a temporary file in the same directory and
/// then renamed over the destination, so readers never observe a
/// half-written build file.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;
    tmp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    tmp.persist(path)
        .with_context(|| format!("failed to write file: {}", path.display()))?;
    Ok(())
}

/// Remove a file if it exists. Returns whether a file was removed.
pub fn remove_file_if_exists(path: &Path) -> Result<bool> {
    if path.is_file() {
        fs::remove_file(path)
            .with_context(|| format!("failed to remove file: {}", path.display()))?;
        return Ok(true);
    }
    Ok(false)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a relative path with `/` separators, regardless of platform.
///
/// The workspace root (an empty path or `.`) renders as an empty string.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Parse a `/`-separated relative path, dropping `.` segments.
pub fn from_slash(path: &str) -> PathBuf {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect()
}
