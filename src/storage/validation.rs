//! Path validation
//!
//! Translates client-supplied logical paths into absolute paths that are
//! guaranteed to stay inside the data root.

use log::warn;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;

/// An absolute path proven to be the data root or one of its descendants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    is_root: bool,
}

impl ResolvedPath {
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// True when the path is the data root itself.
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Last path component, if any.
    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Confines every path it hands out to a single canonical data root.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    /// Builds a resolver for an existing data root. The root is canonicalized once here.
    pub fn new(data_root: &Path) -> io::Result<Self> {
        let root = fs::canonicalize(data_root)?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "data root is not a directory",
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a logical path. Empty string and `/` both denote the root.
    pub fn resolve(&self, logical: &str) -> Result<ResolvedPath, StorageError> {
        let segments = match normalize_logical(logical) {
            Some(segments) => segments,
            None => {
                warn!("Rejected logical path {:?}", logical);
                return Err(StorageError::invalid_path());
            }
        };

        let mut candidate = self.root.clone();
        candidate.extend(&segments);

        let canonical = match self.canonicalize_within(&candidate) {
            Some(path) => path,
            None => {
                warn!("Rejected logical path {:?}: escapes data root", logical);
                return Err(StorageError::invalid_path());
            }
        };

        Ok(ResolvedPath {
            is_root: canonical == self.root,
            path: canonical,
        })
    }

    /// Resolves `parent/name`, where `name` must be a single path segment.
    ///
    /// The joined path goes through the full resolution again instead of
    /// trusting an earlier resolution of `parent`.
    pub fn resolve_child(&self, parent: &str, name: &str) -> Result<ResolvedPath, StorageError> {
        let name = validate_leaf_name(name)?;
        let joined = format!("{}/{}", parent.trim_end_matches(['/', '\\']), name);
        self.resolve(&joined)
    }

    /// Component-wise check that `path` is the root or lies beneath it.
    pub fn contains(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Client-visible, `/`-separated path of a resolved location.
    pub fn logical_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .unwrap_or_default()
    }

    /// Canonicalizes through symlinks. Trailing components that do not exist
    /// yet are re-appended to the canonical form of their deepest existing ancestor.
    fn canonicalize_within(&self, candidate: &Path) -> Option<PathBuf> {
        let mut existing = candidate.to_path_buf();
        let mut missing = Vec::new();

        let canonical = loop {
            match fs::canonicalize(&existing) {
                Ok(path) => break path,
                Err(_) => {
                    // Something is there but cannot be followed (dangling or looping link).
                    if fs::symlink_metadata(&existing).is_ok() {
                        return None;
                    }
                    let name = existing.file_name()?.to_os_string();
                    missing.push(name);
                    if !existing.pop() || !existing.starts_with(&self.root) {
                        return None;
                    }
                }
            }
        };

        if !self.contains(&canonical) {
            return None;
        }

        let mut resolved = canonical;
        resolved.extend(missing.iter().rev());
        Some(resolved)
    }
}

/// Validates a leaf name: non-empty, a single segment, no traversal.
pub fn validate_leaf_name(name: &str) -> Result<&str, StorageError> {
    let valid = !name.is_empty()
        && !name.contains(['/', '\\', '\0'])
        && name != "."
        && name != ".."
        && is_single_normal_component(name);

    if valid {
        Ok(name)
    } else {
        warn!("Rejected name {:?}", name);
        Err(StorageError::Rejected("invalid name".into()))
    }
}

/// Lexically normalizes a logical path into plain segments.
///
/// Backslashes count as separators, leading slashes are ignored, `.` is
/// dropped and `..` pops a segment. Returns `None` if the path contains a
/// null byte, climbs above the root, or carries a platform prefix.
fn normalize_logical(logical: &str) -> Option<Vec<String>> {
    if logical.contains('\0') {
        return None;
    }

    let unified = logical.replace('\\', "/");
    let mut segments: Vec<String> = Vec::new();

    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => {
                if !is_single_normal_component(other) {
                    return None;
                }
                segments.push(other.to_string());
            }
        }
    }

    Some(segments)
}

fn is_single_normal_component(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
