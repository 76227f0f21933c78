//! Physical storage contract
//!
//! Hierarchical byte-level backend addressed by absolute `/`-separated
//! paths. Only the tree-shape operations the directory layer needs are
//! modeled here; content IO belongs to the file layer.

pub mod local;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by physical backends.
#[derive(Debug, Error)]
pub enum PhysicalError {
    /// An entry already occupies the path.
    #[error("entry already exists at {0:?}")]
    AlreadyExists(String),

    /// No entry at the path, or its parent is missing.
    #[error("no entry at {0:?}")]
    NotFound(String),

    /// Any other backend failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Path-addressed hierarchical storage.
///
/// `rename` is the backend's single atomic operation and is exclusive: it
/// fails when the source is missing or the destination exists. `remove` has
/// rmdir semantics, so the entry must be empty.
#[async_trait]
pub trait PhysicalStore: Send + Sync {
    /// Create a directory entry at `path`; the parent must already exist.
    async fn mkdir(&self, path: &str) -> Result<(), PhysicalError>;

    /// Whether any entry exists at `path`.
    async fn stat(&self, path: &str) -> Result<bool, PhysicalError>;

    /// Remove the empty entry at `path`.
    async fn remove(&self, path: &str) -> Result<(), PhysicalError>;

    /// Atomically relocate `old` and everything under it to `new`.
    async fn rename(&self, old: &str, new: &str) -> Result<(), PhysicalError>;
}
