//! Safe rename and descendant path fan-out
//!
//! A move is three steps: validate and relocate the physical entry, rewrite
//! every descendant document's denormalized path, then let the caller
//! persist the moved node itself. The middle step runs one unit of work per
//! descendant with bounded concurrency and joins all of them before
//! reporting; units that committed are not rolled back when later units
//! fail.

use crate::error::{DescendantFailure, VfsError};
use crate::store::{RawDoc, Selector};
use crate::tree::directory::DirDoc;
use crate::tree::path as vpath;
use crate::types::FS_DOC_TYPE;
use crate::vfs::Vfs;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

/// Validate a move of `old_path` to `new_path` and relocate the physical
/// entry.
///
/// Both paths must be absolute once cleaned. A destination equal to the
/// source or inside its subtree would encode a cycle in the path namespace
/// and fails [`VfsError::ForbiddenMove`] before anything is touched; an
/// occupied destination fails [`VfsError::AlreadyExists`]. The relocation
/// itself is the backend's one atomic operation.
pub(crate) async fn safe_rename(vfs: &Vfs, old_path: &str, new_path: &str) -> Result<(), VfsError> {
    let old = vpath::clean(old_path);
    let new = vpath::clean(new_path);

    if !vpath::is_abs(&old) {
        return Err(VfsError::InvalidPath(old));
    }
    if !vpath::is_abs(&new) {
        return Err(VfsError::InvalidPath(new));
    }

    // every absolute path lies under the root, so moving the root is
    // self-containing by definition
    if old == vpath::ROOT_PATH || new == old || new.starts_with(&format!("{}/", old)) {
        return Err(VfsError::ForbiddenMove {
            old_path: old,
            new_path: new,
        });
    }

    if vfs.physical().stat(&new).await? {
        return Err(VfsError::AlreadyExists(new));
    }

    debug!(from = %old, to = %new, "renaming physical directory");
    vfs.physical().rename(&old, &new).await?;
    Ok(())
}

/// Rewrite the denormalized `path` of every descendant of `old_path` so it
/// lives under `new_path`. Returns how many documents were rewritten.
///
/// One unit per descendant document, at most `fanout_width` in flight, no
/// ordering guarantee; the call returns only after every unit has finished.
/// Failed units, a stale revision or a descendant concurrently relocated
/// out of the subtree, are collected into [`VfsError::PartialFailure`].
/// Cancellation is cooperative: dropping the future skips units not yet
/// dispatched and leaves committed updates in place.
pub(crate) async fn bulk_update_descendant_paths(
    vfs: &Vfs,
    old_path: &str,
    new_path: &str,
) -> Result<usize, VfsError> {
    let old = vpath::clean(old_path);
    let prefix = format!("{}/", old);

    let descendants = vfs
        .docs()
        .find(FS_DOC_TYPE, &Selector::starts_with("path", &prefix), None)
        .await?;
    if descendants.is_empty() {
        return Ok(0);
    }

    let total = descendants.len();
    let width = vfs.config().fanout_width.max(1);
    debug!(
        count = total,
        width = width,
        from = %old,
        to = %new_path,
        "rewriting descendant paths"
    );

    let results: Vec<Result<(), DescendantFailure>> = stream::iter(descendants)
        .map(|raw| {
            let prefix = prefix.clone();
            let new_path = new_path.to_string();
            async move { fixup_descendant(vfs, raw, &prefix, &new_path).await }
        })
        .buffer_unordered(width)
        .collect()
        .await;

    let failures: Vec<DescendantFailure> = results.into_iter().filter_map(Result::err).collect();
    if failures.is_empty() {
        Ok(total)
    } else {
        warn!(
            failed = failures.len(),
            total = total,
            "descendant fan-out partially failed"
        );
        Err(VfsError::PartialFailure(failures))
    }
}

/// One fan-out unit: re-check the prefix, rebase the path, CAS-update.
async fn fixup_descendant(
    vfs: &Vfs,
    raw: RawDoc,
    old_prefix: &str,
    new_path: &str,
) -> Result<(), DescendantFailure> {
    let id = raw.id.clone();
    let queried_path = raw
        .data
        .get("path")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match fixup_inner(vfs, raw, old_prefix, new_path).await {
        Ok(()) => Ok(()),
        Err(source) => Err(DescendantFailure {
            id,
            path: queried_path,
            source: Box::new(source),
        }),
    }
}

async fn fixup_inner(
    vfs: &Vfs,
    raw: RawDoc,
    old_prefix: &str,
    new_path: &str,
) -> Result<(), VfsError> {
    let mut doc = DirDoc::from_raw(raw)?;

    // the query result can be stale; never rebase a path that is no longer
    // under the source, and let the revision check below reject anything
    // that changed since the query
    let rest = match doc.path.strip_prefix(old_prefix) {
        Some(rest) => rest.to_string(),
        None => return Err(VfsError::InvalidPath(doc.path)),
    };
    doc.path = vpath::clean(&format!("{}/{}", new_path, rest));

    let update = RawDoc {
        id: doc.id.clone(),
        rev: doc.rev.clone(),
        data: doc.to_data()?,
    };
    vfs.docs().update(FS_DOC_TYPE, &update).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VfsConfig;
    use crate::physical::memory::MemoryFs;
    use crate::physical::PhysicalStore;
    use crate::store::memory::MemoryDocStore;
    use std::sync::Arc;

    fn test_vfs() -> (Vfs, Arc<MemoryFs>) {
        let fs = Arc::new(MemoryFs::new());
        let vfs = Vfs::new(
            Arc::new(MemoryDocStore::new()),
            Arc::clone(&fs) as Arc<dyn PhysicalStore>,
            VfsConfig::default(),
        );
        (vfs, fs)
    }

    #[tokio::test]
    async fn test_safe_rename_rejects_relative_paths() {
        let (vfs, _fs) = test_vfs();
        let err = safe_rename(&vfs, "docs", "/archive").await.unwrap_err();
        assert!(matches!(err, VfsError::InvalidPath(_)));
        let err = safe_rename(&vfs, "/docs", "archive").await.unwrap_err();
        assert!(matches!(err, VfsError::InvalidPath(_)));
    }

    #[tokio::test]
    async fn test_safe_rename_rejects_cycles() {
        let (vfs, _fs) = test_vfs();
        let err = safe_rename(&vfs, "/docs", "/docs").await.unwrap_err();
        assert!(matches!(err, VfsError::ForbiddenMove { .. }));

        let err = safe_rename(&vfs, "/docs", "/docs/sub").await.unwrap_err();
        assert!(matches!(err, VfsError::ForbiddenMove { .. }));

        let err = safe_rename(&vfs, "/", "/anywhere").await.unwrap_err();
        assert!(matches!(err, VfsError::ForbiddenMove { .. }));

        // sibling with a shared name prefix is not a cycle
        let (vfs, fs) = test_vfs();
        fs.mkdir("/docs").await.unwrap();
        safe_rename(&vfs, "/docs", "/docs2").await.unwrap();
    }

    #[tokio::test]
    async fn test_safe_rename_rejects_occupied_destination() {
        let (vfs, fs) = test_vfs();
        fs.mkdir("/docs").await.unwrap();
        fs.mkdir("/archive").await.unwrap();
        let err = safe_rename(&vfs, "/docs", "/archive").await.unwrap_err();
        assert!(matches!(err, VfsError::AlreadyExists(_)));
        // nothing moved
        assert!(fs.contains("/docs"));
    }

    #[tokio::test]
    async fn test_safe_rename_cleans_before_deciding() {
        let (vfs, fs) = test_vfs();
        fs.mkdir("/docs").await.unwrap();
        // destination cleans to a cycle
        let err = safe_rename(&vfs, "/docs", "/docs/x/../y/..")
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::ForbiddenMove { .. }));

        safe_rename(&vfs, "//docs/", "/archive//").await.unwrap();
        assert!(fs.contains("/archive"));
    }

    #[tokio::test]
    async fn test_bulk_update_with_no_descendants_is_a_no_op() {
        let (vfs, _fs) = test_vfs();
        let fixed = bulk_update_descendant_paths(&vfs, "/docs", "/archive")
            .await
            .unwrap();
        assert_eq!(fixed, 0);
    }
}
