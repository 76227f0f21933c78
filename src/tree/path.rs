//! Path and name resolution
//!
//! Canonical paths are absolute, `/`-separated, carry no trailing slash and
//! no dot segments. Names are NFC-normalized before validation so visually
//! equal names produce byte-equal paths.

use crate::error::VfsError;
use crate::tree::directory::{self, DirDoc};
use crate::types::ROOT_DIR_ID;
use crate::vfs::Vfs;
use unicode_normalization::UnicodeNormalization;

/// Separator for canonical VFS paths.
pub const SEPARATOR: char = '/';

/// Canonical path of the tree root.
pub const ROOT_PATH: &str = "/";

/// Longest accepted name, in bytes after normalization.
pub const MAX_NAME_BYTES: usize = 255;

/// Validate and NFC-normalize a directory or file name.
pub fn validate_name(name: &str) -> Result<String, VfsError> {
    let name: String = name.nfc().collect();
    if name.is_empty() || name == "." || name == ".." {
        return Err(VfsError::InvalidName(name));
    }
    if name.contains(SEPARATOR) || name.contains('\0') {
        return Err(VfsError::InvalidName(name));
    }
    if name.len() > MAX_NAME_BYTES {
        return Err(VfsError::InvalidName(name));
    }
    Ok(name)
}

/// Lexically clean a `/`-separated path: collapse repeated separators, drop
/// `.` segments, resolve `..` against preceding segments, and strip any
/// trailing slash. Cleaning an absolute path always yields an absolute path.
pub fn clean(path: &str) -> String {
    let absolute = path.starts_with(SEPARATOR);
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split(SEPARATOR) {
        match segment {
            "" | "." => {}
            ".." => match stack.last() {
                Some(&"..") => stack.push(".."),
                Some(_) => {
                    stack.pop();
                }
                // `..` cannot climb above the root
                None if absolute => {}
                None => stack.push(".."),
            },
            seg => stack.push(seg),
        }
    }

    if absolute {
        let mut out = String::from(ROOT_PATH);
        out.push_str(&stack.join("/"));
        out
    } else if stack.is_empty() {
        ".".to_string()
    } else {
        stack.join("/")
    }
}

/// Whether a cleaned path is absolute.
pub fn is_abs(path: &str) -> bool {
    path.starts_with(SEPARATOR)
}

/// Directory part of a cleaned path (`"/"` for top-level entries).
pub fn dirname(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(0) => ROOT_PATH,
        Some(idx) => &path[..idx],
        None => ".",
    }
}

/// Final segment of a cleaned path (empty for the root).
pub fn basename(path: &str) -> &str {
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Join a directory path and an entry name, cleaning the result.
pub fn join(dir: &str, name: &str) -> String {
    clean(&format!("{}/{}", dir, name))
}

/// Compute the canonical path for `name` under `parent_id`, returning it
/// together with the resolved parent node.
///
/// The root sentinel short-circuits to the synthetic root; any other parent
/// identifier must resolve to an existing directory document.
pub async fn resolve_child_path(
    vfs: &Vfs,
    name: &str,
    parent_id: &str,
) -> Result<(String, DirDoc), VfsError> {
    let name = validate_name(name)?;
    let parent = if parent_id == ROOT_DIR_ID {
        DirDoc::root()
    } else {
        match directory::get(vfs, parent_id).await {
            Ok(doc) => doc,
            // an id resolving to a file is as useless as one resolving to
            // nothing
            Err(VfsError::NotFound(_)) | Err(VfsError::NotADirectory(_)) => {
                return Err(VfsError::ParentMissing(parent_id.to_string()))
            }
            Err(other) => return Err(other),
        }
    };
    let path = join(&parent.path, &name);
    Ok((path, parent))
}
