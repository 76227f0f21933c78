//! Local-disk physical backend
//!
//! Maps virtual absolute paths onto a base directory with `tokio::fs`. The
//! base is canonicalized once at construction; virtual paths must arrive
//! cleaned and absolute.

use super::{PhysicalError, PhysicalStore};
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};

/// [`PhysicalStore`] rooted in a directory on the local filesystem.
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Root the backend at `base`, which must already exist.
    pub fn new(base: impl AsRef<Path>) -> Result<Self, PhysicalError> {
        let root = dunce::canonicalize(base.as_ref())?;
        Ok(Self { root })
    }

    /// The canonicalized base directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, PhysicalError> {
        if !path.starts_with('/') || path.split('/').any(|seg| seg == "..") {
            return Err(PhysicalError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a cleaned absolute path: {:?}", path),
            )));
        }
        Ok(self.root.join(path.trim_start_matches('/')))
    }
}

fn io_err(path: &str, err: io::Error) -> PhysicalError {
    match err.kind() {
        io::ErrorKind::NotFound => PhysicalError::NotFound(path.to_string()),
        io::ErrorKind::AlreadyExists => PhysicalError::AlreadyExists(path.to_string()),
        _ => PhysicalError::Io(err),
    }
}

#[async_trait]
impl PhysicalStore for LocalFs {
    async fn mkdir(&self, path: &str) -> Result<(), PhysicalError> {
        let target = self.resolve(path)?;
        tokio::fs::create_dir(&target)
            .await
            .map_err(|e| io_err(path, e))
    }

    async fn stat(&self, path: &str) -> Result<bool, PhysicalError> {
        let target = self.resolve(path)?;
        match tokio::fs::metadata(&target).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PhysicalError::Io(e)),
        }
    }

    async fn remove(&self, path: &str) -> Result<(), PhysicalError> {
        let target = self.resolve(path)?;
        tokio::fs::remove_dir(&target)
            .await
            .map_err(|e| io_err(path, e))
    }

    async fn rename(&self, old: &str, new: &str) -> Result<(), PhysicalError> {
        let from = self.resolve(old)?;
        let to = self.resolve(new)?;
        // rename(2) silently replaces an empty destination directory; the
        // contract wants exclusivity, so probe first. The probe and the
        // rename are two syscalls, not one atomic step.
        if tokio::fs::metadata(&to).await.is_ok() {
            return Err(PhysicalError::AlreadyExists(new.to_string()));
        }
        tokio::fs::rename(&from, &to)
            .await
            .map_err(|e| io_err(old, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_mkdir_and_stat_under_base() {
        let base = TempDir::new().unwrap();
        let fs = LocalFs::new(base.path()).unwrap();

        fs.mkdir("/docs").await.unwrap();
        assert!(fs.stat("/docs").await.unwrap());
        assert!(!fs.stat("/missing").await.unwrap());
        assert!(base.path().join("docs").is_dir());
    }

    #[tokio::test]
    async fn test_rejects_uncleaned_paths() {
        let base = TempDir::new().unwrap();
        let fs = LocalFs::new(base.path()).unwrap();

        assert!(fs.mkdir("relative").await.is_err());
        assert!(fs.mkdir("/docs/../escape").await.is_err());
    }

    #[tokio::test]
    async fn test_rename_moves_subtree_and_is_exclusive() {
        let base = TempDir::new().unwrap();
        let fs = LocalFs::new(base.path()).unwrap();

        fs.mkdir("/docs").await.unwrap();
        fs.mkdir("/docs/photos").await.unwrap();
        fs.mkdir("/archive").await.unwrap();

        let err = fs.rename("/docs", "/archive").await.unwrap_err();
        assert!(matches!(err, PhysicalError::AlreadyExists(_)));

        fs.rename("/docs", "/attic").await.unwrap();
        assert!(base.path().join("attic/photos").is_dir());
        assert!(!base.path().join("docs").exists());
    }

    #[tokio::test]
    async fn test_remove_has_rmdir_semantics() {
        let base = TempDir::new().unwrap();
        let fs = LocalFs::new(base.path()).unwrap();

        fs.mkdir("/a").await.unwrap();
        fs.mkdir("/a/b").await.unwrap();
        assert!(fs.remove("/a").await.is_err());
        fs.remove("/a/b").await.unwrap();
        fs.remove("/a").await.unwrap();
    }
}
