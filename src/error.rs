//! Error taxonomy for directory operations.
//!
//! Validation errors are raised before any mutation. Physical-layer errors
//! abort a move before any document write. Descendant fix-up errors are
//! aggregated into [`VfsError::PartialFailure`] after the fan-in; updates
//! that committed before the failure are not rolled back.

use crate::physical::PhysicalError;
use crate::store::StoreError;
use crate::types::{DocId, Revision};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// One failed descendant fix-up inside a move.
#[derive(Debug, Error)]
#[error("descendant {id} ({path}): {source}")]
pub struct DescendantFailure {
    /// Identifier of the descendant whose update failed.
    pub id: DocId,
    /// Path the descendant held when the fan-out query ran.
    pub path: String,
    /// Why the fix-up failed.
    #[source]
    pub source: Box<VfsError>,
}

/// Errors surfaced by directory operations.
#[derive(Debug, Error)]
pub enum VfsError {
    /// No directory with the requested identifier or path.
    #[error("directory not found: {0}")]
    NotFound(String),

    /// The document exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(DocId),

    /// The parent identifier does not resolve to an existing directory.
    #[error("parent directory does not exist: {0}")]
    ParentMissing(DocId),

    /// Name is empty, contains reserved characters, or is too long.
    #[error("invalid directory name: {0:?}")]
    InvalidName(String),

    /// Path is relative or otherwise malformed.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// A modification timestamp precedes the creation timestamp.
    #[error("updated_at {updated_at} precedes created_at {created_at}")]
    IllegalTimestamp {
        updated_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    },

    /// Destination is the moved directory itself or lies inside its subtree.
    #[error("forbidden move: {new_path:?} is within {old_path:?}")]
    ForbiddenMove { old_path: String, new_path: String },

    /// An entry already occupies the destination.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The supplied revision no longer matches the stored document.
    #[error("revision conflict on {id}: supplied {supplied}")]
    Conflict { id: DocId, supplied: Revision },

    /// One or more descendant fix-ups failed during a move. Fix-ups that
    /// already committed stay committed.
    #[error("move partially applied: {} descendant fix-up(s) failed", .0.len())]
    PartialFailure(Vec<DescendantFailure>),

    /// Unexpected document-store failure.
    #[error("document store error: {0}")]
    Store(StoreError),

    /// Unexpected physical-backend failure.
    #[error("physical backend error: {0}")]
    Physical(PhysicalError),
}

impl VfsError {
    /// Whether the caller can correct the request and retry. Store and
    /// backend failures are operational; everything else is client-side.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            VfsError::PartialFailure(_) | VfsError::Store(_) | VfsError::Physical(_)
        )
    }
}

impl From<StoreError> for VfsError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { id, .. } => VfsError::NotFound(id),
            StoreError::Conflict { id, supplied } => VfsError::Conflict { id, supplied },
            other => VfsError::Store(other),
        }
    }
}

impl From<PhysicalError> for VfsError {
    fn from(err: PhysicalError) -> Self {
        match err {
            PhysicalError::AlreadyExists(path) => VfsError::AlreadyExists(path),
            other => VfsError::Physical(other),
        }
    }
}

impl From<serde_json::Error> for VfsError {
    fn from(err: serde_json::Error) -> Self {
        VfsError::Store(StoreError::Serde(err))
    }
}
