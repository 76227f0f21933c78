//! In-memory physical backend
//!
//! Tracks the set of existing directory paths; the root `/` always exists
//! and cannot be created or removed. Rename rewrites the whole subtree under
//! one write lock, which gives it the atomicity and exclusivity the contract
//! assumes of a real backend.

use super::{PhysicalError, PhysicalStore};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::io;

/// In-memory [`PhysicalStore`] used by tests and examples.
#[derive(Debug, Default)]
pub struct MemoryFs {
    entries: RwLock<HashSet<String>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// All existing paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut out: Vec<String> = self.entries.read().iter().cloned().collect();
        out.sort();
        out
    }

    /// Whether an entry exists, without going through the async contract.
    pub fn contains(&self, path: &str) -> bool {
        path == "/" || self.entries.read().contains(path)
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

#[async_trait]
impl PhysicalStore for MemoryFs {
    async fn mkdir(&self, path: &str) -> Result<(), PhysicalError> {
        let mut entries = self.entries.write();
        if path == "/" || entries.contains(path) {
            return Err(PhysicalError::AlreadyExists(path.to_string()));
        }
        let parent = parent_of(path);
        if parent != "/" && !entries.contains(parent) {
            return Err(PhysicalError::NotFound(parent.to_string()));
        }
        entries.insert(path.to_string());
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<bool, PhysicalError> {
        Ok(path == "/" || self.entries.read().contains(path))
    }

    async fn remove(&self, path: &str) -> Result<(), PhysicalError> {
        let mut entries = self.entries.write();
        if !entries.contains(path) {
            return Err(PhysicalError::NotFound(path.to_string()));
        }
        let child_prefix = format!("{}/", path);
        if entries.iter().any(|p| p.starts_with(&child_prefix)) {
            return Err(PhysicalError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!("directory not empty: {}", path),
            )));
        }
        entries.remove(path);
        Ok(())
    }

    async fn rename(&self, old: &str, new: &str) -> Result<(), PhysicalError> {
        let mut entries = self.entries.write();
        if !entries.contains(old) {
            return Err(PhysicalError::NotFound(old.to_string()));
        }
        if new == "/" || entries.contains(new) {
            return Err(PhysicalError::AlreadyExists(new.to_string()));
        }
        let new_parent = parent_of(new);
        if new_parent != "/" && !entries.contains(new_parent) {
            return Err(PhysicalError::NotFound(new_parent.to_string()));
        }

        let old_prefix = format!("{}/", old);
        let moved: Vec<String> = entries
            .iter()
            .filter(|p| p.as_str() == old || p.starts_with(&old_prefix))
            .cloned()
            .collect();
        for path in moved {
            entries.remove(&path);
            let rebased = if path == old {
                new.to_string()
            } else {
                format!("{}{}", new, &path[old.len()..])
            };
            entries.insert(rebased);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mkdir_requires_existing_parent() {
        let fs = MemoryFs::new();
        let err = fs.mkdir("/a/b").await.unwrap_err();
        assert!(matches!(err, PhysicalError::NotFound(ref p) if p == "/a"));

        fs.mkdir("/a").await.unwrap();
        fs.mkdir("/a/b").await.unwrap();
        assert!(fs.stat("/a/b").await.unwrap());
    }

    #[tokio::test]
    async fn test_mkdir_rejects_duplicates_and_root() {
        let fs = MemoryFs::new();
        fs.mkdir("/a").await.unwrap();
        assert!(matches!(
            fs.mkdir("/a").await.unwrap_err(),
            PhysicalError::AlreadyExists(_)
        ));
        assert!(matches!(
            fs.mkdir("/").await.unwrap_err(),
            PhysicalError::AlreadyExists(_)
        ));
    }

    #[tokio::test]
    async fn test_remove_refuses_non_empty() {
        let fs = MemoryFs::new();
        fs.mkdir("/a").await.unwrap();
        fs.mkdir("/a/b").await.unwrap();
        assert!(matches!(
            fs.remove("/a").await.unwrap_err(),
            PhysicalError::Io(_)
        ));
        fs.remove("/a/b").await.unwrap();
        fs.remove("/a").await.unwrap();
        assert!(!fs.stat("/a").await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_carries_the_subtree() {
        let fs = MemoryFs::new();
        fs.mkdir("/docs").await.unwrap();
        fs.mkdir("/docs/photos").await.unwrap();
        fs.mkdir("/docs/photos/raw").await.unwrap();

        fs.rename("/docs", "/archive").await.unwrap();
        assert_eq!(
            fs.paths(),
            vec![
                "/archive".to_string(),
                "/archive/photos".to_string(),
                "/archive/photos/raw".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_rename_is_exclusive() {
        let fs = MemoryFs::new();
        fs.mkdir("/a").await.unwrap();
        fs.mkdir("/b").await.unwrap();
        assert!(matches!(
            fs.rename("/a", "/b").await.unwrap_err(),
            PhysicalError::AlreadyExists(_)
        ));
        assert!(matches!(
            fs.rename("/missing", "/c").await.unwrap_err(),
            PhysicalError::NotFound(_)
        ));
    }
}
