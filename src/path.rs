//! Path containment and normalization utilities
//!
//! Everything here is lexical: no function touches the filesystem, so results
//! don't depend on what happens to exist on disk at call time.

use crate::error::ConfigurationError;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Returns true iff `candidate` is `parent` itself or nested under it.
///
/// Comparison is per path component, so `/volume/dir` is not a parent of
/// `/volume/dir-2`. Both arguments must be absolute.
pub fn is_sub_path(parent: &Path, candidate: &Path) -> Result<bool, ConfigurationError> {
    if !parent.is_absolute() {
        return Err(ConfigurationError::NotAbsolute(parent.to_path_buf()));
    }
    if !candidate.is_absolute() {
        return Err(ConfigurationError::NotAbsolute(candidate.to_path_buf()));
    }

    let parent = normalize_lexically(parent);
    let candidate = normalize_lexically(candidate);
    Ok(candidate.starts_with(&parent))
}

/// Join `path` onto `base` and collapse `.` and `..` components.
///
/// The result is not clamped to `base`: `../shared` resolves to a sibling of
/// `base`. An absolute `path` replaces `base` entirely.
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    normalize_lexically(&base.join(path))
}

/// Collapse `.` and `..` components without consulting the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // Popping past the root is a no-op, matching how the OS
                // resolves `/..`.
                let after_parent = matches!(out.components().next_back(), Some(Component::ParentDir));
                if after_parent || (!out.pop() && !path.is_absolute()) {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Relative path of `path` under `root` in the form used for hashing
///
/// Separators are `/` on every platform and the string is NFC normalized, so
/// the same checkout hashes identically wherever it lives. Returns `None` if
/// `path` is not under `root`.
pub fn relative_hash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    Some(normalize_path_string(&joined))
}

/// Normalize a path string for hashing (without filesystem access)
pub fn normalize_path_string(path: &str) -> String {
    let normalized: String = path.nfc().collect();

    // Remove trailing slashes (except root)
    let mut result = normalized;
    if result.len() > 1 {
        while result.ends_with('/') || result.ends_with('\\') {
            result.pop();
        }
    }

    result
}

/// Canonicalize a directory that must exist, falling back to the lexical form
pub fn canonicalize_or_normalize(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| normalize_lexically(path))
}

/// Whether two absolute paths name the same directory
///
/// Lexically equal paths always match. Otherwise both sides are resolved
/// through the filesystem, so a directory reached through a symlink matches
/// its target.
pub fn is_same_location(a: &Path, b: &Path) -> bool {
    normalize_lexically(a) == normalize_lexically(b)
        || canonicalize_or_normalize(a) == canonicalize_or_normalize(b)
}
