//! Direct children of a directory
//!
//! One bounded query, discriminated into file and directory nodes, plus an
//! explicit cache keyed by directory identifier. The cache is a side table
//! so the directory entity itself stays an immutable value.

use crate::error::VfsError;
use crate::store::{RawDoc, Selector};
use crate::tree::directory::DirDoc;
use crate::types::{DocId, Revision, DIR_KIND, FILE_KIND, FS_DOC_TYPE};
use crate::vfs::Vfs;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One file node as the directory layer sees it: metadata only, no content,
/// and no denormalized path. Files are located through their parent, which
/// is what keeps them out of the rename fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileDoc {
    #[serde(skip)]
    pub id: DocId,
    #[serde(skip)]
    pub rev: Revision,
    /// Type discriminator, always `"file"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub parent_id: DocId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub tags: Vec<String>,
}

impl FileDoc {
    pub(crate) fn from_raw(raw: RawDoc) -> Result<Self, VfsError> {
        let mut doc: FileDoc = serde_json::from_value(raw.data)?;
        doc.id = raw.id;
        doc.rev = raw.rev;
        Ok(doc)
    }
}

/// Direct children of one directory, in store arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Children {
    pub files: Vec<FileDoc>,
    pub dirs: Vec<DirDoc>,
}

impl Children {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len() + self.dirs.len()
    }
}

/// Fetch the direct children of `parent`.
///
/// The query is capped at `children_page_size`; larger directories are
/// truncated. Documents with an unknown type discriminator are skipped.
pub async fn fetch(vfs: &Vfs, parent: &DirDoc) -> Result<Children, VfsError> {
    let selector = Selector::equal("parent_id", &parent.id);
    let limit = vfs.config().children_page_size;
    let raws = vfs.docs().find(FS_DOC_TYPE, &selector, Some(limit)).await?;

    let mut out = Children::default();
    for raw in raws {
        match raw.data.get("type").and_then(Value::as_str) {
            Some(DIR_KIND) => out.dirs.push(DirDoc::from_raw(raw)?),
            Some(FILE_KIND) => out.files.push(FileDoc::from_raw(raw)?),
            other => {
                debug!(id = %raw.id, kind = ?other, "skipping child with unknown type");
            }
        }
    }
    Ok(out)
}

/// Side-table cache of fetched children, keyed by directory identifier.
///
/// Entries are point-in-time snapshots; creating, moving, or removing a
/// child does not refresh them. Callers invalidate what they mutate.
#[derive(Default)]
pub struct ChildrenCache {
    entries: RwLock<HashMap<DocId, Arc<Children>>>,
}

impl ChildrenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached children for `parent`, fetching on a miss.
    pub async fn get_or_fetch(
        &self,
        vfs: &Vfs,
        parent: &DirDoc,
    ) -> Result<Arc<Children>, VfsError> {
        if let Some(hit) = self.entries.read().get(&parent.id) {
            return Ok(Arc::clone(hit));
        }
        let fetched = Arc::new(fetch(vfs, parent).await?);
        self.entries
            .write()
            .insert(parent.id.clone(), Arc::clone(&fetched));
        Ok(fetched)
    }

    /// Drop the cached entry for one directory.
    pub fn invalidate(&self, id: &str) {
        self.entries.write().remove(id);
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
