//! Hash computation for files, trees and composed versions using BLAKE3

use blake3::Hasher;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Prefix carried by every composed version string.
pub const VERSION_PREFIX: &str = "v-";

/// Number of hex characters kept from a composed version digest.
pub const VERSION_HASH_LENGTH: usize = 10;

/// Content hash of a tree with no files.
pub const NEW_UNIT_VERSION: &str = "0000000000";

/// Compute content hash for file bytes
pub fn compute_content_hash(content: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hex::encode(hasher.finalize().as_bytes())
}

/// Hash a file on disk by streaming its content
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize().as_bytes()))
}

/// Compute the content hash of a tree
///
/// content_hash = hash(path_1 ":" hash_1 "\n" path_2 ":" hash_2 "\n" ...)
///
/// Entries must already be sorted by path. Returns `NEW_UNIT_VERSION` for an
/// empty tree.
pub fn compute_tree_hash<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut hasher = Hasher::new();
    let mut count = 0usize;

    for (path, hash) in entries {
        hasher.update(path.as_bytes());
        hasher.update(b":");
        hasher.update(hash.as_bytes());
        hasher.update(b"\n");
        count += 1;
    }

    if count == 0 {
        return NEW_UNIT_VERSION.to_string();
    }

    hex::encode(hasher.finalize().as_bytes())
}

/// Hash an ordered list of strings into a truncated hex digest
///
/// Strings are joined with `.` before hashing. The caller is responsible for
/// putting them in a canonical order.
pub fn hash_strings<S: AsRef<str>>(parts: &[S]) -> String {
    let mut hasher = Hasher::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b".");
        }
        hasher.update(part.as_ref().as_bytes());
    }
    let digest = hex::encode(hasher.finalize().as_bytes());
    digest[..VERSION_HASH_LENGTH].to_string()
}
