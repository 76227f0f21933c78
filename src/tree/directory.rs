//! Directory documents
//!
//! A directory is one revisioned document plus one physical entry at the
//! same canonical path. The document carries a denormalized `path`, so
//! lookups and subtree queries never walk the ancestor chain; in exchange,
//! renames fan path fix-ups out across the whole subtree (see
//! [`crate::tree::rename`]).

use crate::error::VfsError;
use crate::store::{RawDoc, Selector};
use crate::tree::children::{self, Children};
use crate::tree::path as vpath;
use crate::tree::rename;
use crate::types::{DocId, Revision, DIR_KIND, FS_DOC_TYPE, ROOT_DIR_ID};
use crate::vfs::Vfs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

/// One directory node of the VFS tree.
///
/// Values are immutable snapshots: mutation goes through
/// [`modify_metadata`], which returns the post-mutation node. Children are
/// never embedded; fetch them through [`crate::tree::children`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirDoc {
    /// Store-assigned identifier; [`ROOT_DIR_ID`] for the synthetic root.
    #[serde(skip)]
    pub id: DocId,
    /// Optimistic-concurrency token; empty until first persisted.
    #[serde(skip)]
    pub rev: Revision,
    /// Type discriminator, always `"directory"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Entry name; empty only for the synthetic root.
    pub name: String,
    /// Identifier of the containing directory.
    pub parent_id: DocId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Denormalized canonical path: the parent's path joined with `name`.
    pub path: String,
    pub tags: Vec<String>,
}

impl DirDoc {
    /// Validating constructor. An empty `parent_id` defaults to the tree
    /// root; the canonical path is resolved when the node is created.
    pub fn new(name: &str, parent_id: &str, tags: Vec<String>) -> Result<Self, VfsError> {
        let name = vpath::validate_name(name)?;
        let parent_id = if parent_id.is_empty() {
            ROOT_DIR_ID.to_string()
        } else {
            parent_id.to_string()
        };
        let now = Utc::now();
        Ok(Self {
            id: String::new(),
            rev: String::new(),
            kind: DIR_KIND.to_string(),
            name,
            parent_id,
            created_at: now,
            updated_at: now,
            path: String::new(),
            tags: dedup_tags(tags),
        })
    }

    /// The synthetic root. Never persisted; lookups materialize it on
    /// demand.
    pub fn root() -> Self {
        Self {
            id: ROOT_DIR_ID.to_string(),
            rev: String::new(),
            kind: DIR_KIND.to_string(),
            name: String::new(),
            parent_id: String::new(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
            path: vpath::ROOT_PATH.to_string(),
            tags: Vec::new(),
        }
    }

    /// Whether this node is the synthetic root.
    pub fn is_root(&self) -> bool {
        self.id == ROOT_DIR_ID
    }

    pub(crate) fn from_raw(raw: RawDoc) -> Result<Self, VfsError> {
        let mut doc: DirDoc = serde_json::from_value(raw.data)?;
        doc.id = raw.id;
        doc.rev = raw.rev;
        Ok(doc)
    }

    pub(crate) fn to_data(&self) -> Result<Value, VfsError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Insertion-ordered tag set; first occurrence wins.
fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Union of current and additional tags, insertion order preserved.
fn merge_tags(mut current: Vec<String>, extra: &[String]) -> Vec<String> {
    for tag in extra {
        if !current.contains(tag) {
            current.push(tag.clone());
        }
    }
    current
}

/// Create the directory: resolve its canonical path, create the physical
/// entry, then persist the document.
///
/// The two writes are not atomic. When the document write fails the
/// physical entry is removed best-effort; a crash in between leaves an
/// orphaned physical directory with no document.
pub async fn create(vfs: &Vfs, doc: DirDoc) -> Result<DirDoc, VfsError> {
    let name = vpath::validate_name(&doc.name)?;
    let (path, _parent) = vpath::resolve_child_path(vfs, &name, &doc.parent_id).await?;

    vfs.physical().mkdir(&path).await?;

    let doc = DirDoc { name, path, ..doc };
    match vfs.docs().create(FS_DOC_TYPE, doc.to_data()?).await {
        Ok(raw) => {
            debug!(id = %raw.id, path = %doc.path, "created directory");
            Ok(DirDoc {
                id: raw.id,
                rev: raw.rev,
                ..doc
            })
        }
        Err(err) => {
            if let Err(rm) = vfs.physical().remove(&doc.path).await {
                warn!(path = %doc.path, error = %rm, "compensating removal failed, physical entry orphaned");
            }
            Err(err.into())
        }
    }
}

/// Fetch a directory by identifier. The root sentinel resolves to the
/// synthetic root without touching the store.
pub async fn get(vfs: &Vfs, id: &str) -> Result<DirDoc, VfsError> {
    if id == ROOT_DIR_ID {
        return Ok(DirDoc::root());
    }
    let raw = vfs.docs().get(FS_DOC_TYPE, id).await?;
    // discriminate on the raw payload; file documents do not carry the
    // fields a directory deserializes
    if raw.data.get("type").and_then(Value::as_str) != Some(DIR_KIND) {
        return Err(VfsError::NotADirectory(raw.id));
    }
    DirDoc::from_raw(raw)
}

/// Fetch a directory together with its direct children.
pub async fn get_with_children(vfs: &Vfs, id: &str) -> Result<(DirDoc, Children), VfsError> {
    let doc = get(vfs, id).await?;
    let kids = children::fetch(vfs, &doc).await?;
    Ok((doc, kids))
}

/// Fetch a directory by exact canonical path.
///
/// Path uniqueness is an invariant maintained by the move protocol, not a
/// constraint the store enforces; should duplicates ever exist, an
/// arbitrary match is returned.
pub async fn get_by_path(vfs: &Vfs, path: &str) -> Result<DirDoc, VfsError> {
    let cleaned = vpath::clean(path);
    if cleaned == vpath::ROOT_PATH {
        return Ok(DirDoc::root());
    }
    if !vpath::is_abs(&cleaned) {
        return Err(VfsError::InvalidPath(cleaned));
    }
    let matches = vfs
        .docs()
        .find(FS_DOC_TYPE, &Selector::equal("path", &cleaned), Some(1))
        .await?;
    match matches.into_iter().next() {
        Some(raw) => DirDoc::from_raw(raw),
        None => Err(VfsError::NotFound(cleaned)),
    }
}

/// Fetch a directory by path together with its direct children.
pub async fn get_by_path_with_children(
    vfs: &Vfs,
    path: &str,
) -> Result<(DirDoc, Children), VfsError> {
    let doc = get_by_path(vfs, path).await?;
    let kids = children::fetch(vfs, &doc).await?;
    Ok((doc, kids))
}

/// Sparse update descriptor for [`modify_metadata`]. `None` leaves the
/// field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetadataPatch {
    /// New entry name (rename).
    pub name: Option<String>,
    /// New containing directory (move).
    pub parent_id: Option<DocId>,
    /// Tags to add, merged into the existing set.
    pub tags: Option<Vec<String>>,
    /// New modification timestamp; must not precede `created_at`.
    pub updated_at: Option<DateTime<Utc>>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.parent_id.is_none()
            && self.tags.is_none()
            && self.updated_at.is_none()
    }
}

/// Apply a sparse metadata update: rename, move, retag, and/or touch.
///
/// All validation happens before any mutation. When the canonical path
/// changes, the physical entry is relocated first (see
/// [`rename::safe_rename`]), then every descendant document's `path` is
/// rewritten concurrently, and finally the node's own document is persisted
/// against the revision carried by `current`. Descendant updates that
/// committed before a later failure stay committed; such moves surface
/// [`VfsError::PartialFailure`].
pub async fn modify_metadata(
    vfs: &Vfs,
    current: &DirDoc,
    patch: &MetadataPatch,
) -> Result<DirDoc, VfsError> {
    // the root has no parent and no name; nothing on it can be patched
    if current.is_root() {
        return Err(VfsError::ForbiddenMove {
            old_path: vpath::ROOT_PATH.to_string(),
            new_path: vpath::ROOT_PATH.to_string(),
        });
    }

    let mut name = current.name.clone();
    let mut parent_id = current.parent_id.clone();
    let mut path = current.path.clone();
    let mut tags = current.tags.clone();
    let mut updated_at = current.updated_at;

    if let Some(new_parent) = &patch.parent_id {
        if *new_parent != parent_id {
            parent_id = new_parent.clone();
            let (resolved, _parent) = vpath::resolve_child_path(vfs, &name, &parent_id).await?;
            path = resolved;
        }
    }

    if let Some(new_name) = &patch.name {
        name = vpath::validate_name(new_name)?;
        path = vpath::join(vpath::dirname(&path), &name);
    }

    if let Some(extra) = &patch.tags {
        tags = merge_tags(tags, extra);
    }

    if let Some(ts) = patch.updated_at {
        updated_at = ts;
    }
    if updated_at < current.created_at {
        return Err(VfsError::IllegalTimestamp {
            updated_at,
            created_at: current.created_at,
        });
    }

    let next = DirDoc {
        id: current.id.clone(),
        rev: current.rev.clone(),
        kind: DIR_KIND.to_string(),
        name,
        parent_id,
        created_at: current.created_at,
        updated_at,
        path: path.clone(),
        tags,
    };

    if next.path != current.path {
        rename::safe_rename(vfs, &current.path, &next.path).await?;
        let fixed = rename::bulk_update_descendant_paths(vfs, &current.path, &next.path).await?;
        info!(
            id = %next.id,
            from = %current.path,
            to = %next.path,
            descendants = fixed,
            "moved directory"
        );
    }

    let raw = RawDoc {
        id: next.id.clone(),
        rev: next.rev.clone(),
        data: next.to_data()?,
    };
    let new_rev = vfs.docs().update(FS_DOC_TYPE, &raw).await?;
    debug!(id = %next.id, rev = %new_rev, "updated directory metadata");
    Ok(DirDoc { rev: new_rev, ..next })
}
