//! Durable document store on sled
//!
//! One sled tree per doctype; values are JSON-encoded [`RawDoc`]s. Updates
//! go through `compare_and_swap` keyed on the serialized current record, so
//! the revision check and the write land as one atomic step. sled calls are
//! blocking and run on the tokio blocking pool.

use super::{assign_id, next_revision, DocumentStore, RawDoc, Selector, StoreError};
use crate::types::Revision;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// [`DocumentStore`] persisted in an embedded sled database.
pub struct SledDocStore {
    db: sled::Db,
    seq: AtomicU64,
}

impl SledDocStore {
    /// Open (or create) a store under `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path).map_err(backend)?;
        Ok(Self {
            db,
            seq: AtomicU64::new(0),
        })
    }

    /// Wrap an already opened database.
    pub fn from_db(db: sled::Db) -> Self {
        Self {
            db,
            seq: AtomicU64::new(0),
        }
    }

    fn tree(&self, doctype: &str) -> Result<sled::Tree, StoreError> {
        self.db.open_tree(doctype).map_err(backend)
    }
}

fn backend(err: sled::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn join_err(err: tokio::task::JoinError) -> StoreError {
    StoreError::Backend(format!("blocking task failed: {}", err))
}

#[async_trait]
impl DocumentStore for SledDocStore {
    async fn create(&self, doctype: &str, data: Value) -> Result<RawDoc, StoreError> {
        let tree = self.tree(doctype)?;
        let id = assign_id(self.seq.fetch_add(1, Ordering::Relaxed));
        let rev = next_revision(None, &data)?;
        let doc = RawDoc {
            id: id.clone(),
            rev,
            data,
        };
        let bytes = serde_json::to_vec(&doc)?;

        let inserted = tokio::task::spawn_blocking(move || {
            tree.compare_and_swap(id.as_bytes(), None as Option<&[u8]>, Some(bytes))
        })
        .await
        .map_err(join_err)?
        .map_err(backend)?;

        match inserted {
            Ok(()) => Ok(doc),
            Err(_) => Err(StoreError::Backend(format!(
                "identifier collision on {}",
                doc.id
            ))),
        }
    }

    async fn get(&self, doctype: &str, id: &str) -> Result<RawDoc, StoreError> {
        let tree = self.tree(doctype)?;
        let key = id.to_string();
        let found = tokio::task::spawn_blocking(move || tree.get(key.as_bytes()))
            .await
            .map_err(join_err)?
            .map_err(backend)?;

        match found {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Err(StoreError::NotFound {
                doctype: doctype.to_string(),
                id: id.to_string(),
            }),
        }
    }

    async fn update(&self, doctype: &str, doc: &RawDoc) -> Result<Revision, StoreError> {
        let tree = self.tree(doctype)?;
        let key = doc.id.clone();

        let current = {
            let tree = tree.clone();
            let key = key.clone();
            tokio::task::spawn_blocking(move || tree.get(key.as_bytes()))
                .await
                .map_err(join_err)?
                .map_err(backend)?
        };
        let current_bytes = current.ok_or_else(|| StoreError::NotFound {
            doctype: doctype.to_string(),
            id: doc.id.clone(),
        })?;

        let stored: RawDoc = serde_json::from_slice(&current_bytes)?;
        if stored.rev != doc.rev {
            return Err(StoreError::Conflict {
                id: doc.id.clone(),
                supplied: doc.rev.clone(),
            });
        }

        let rev = next_revision(Some(&stored.rev), &doc.data)?;
        let next = RawDoc {
            id: doc.id.clone(),
            rev: rev.clone(),
            data: doc.data.clone(),
        };
        let next_bytes = serde_json::to_vec(&next)?;

        // keyed on the exact bytes read above; a concurrent writer makes
        // this fail instead of clobbering
        let swapped = tokio::task::spawn_blocking(move || {
            tree.compare_and_swap(key.as_bytes(), Some(current_bytes), Some(next_bytes))
        })
        .await
        .map_err(join_err)?
        .map_err(backend)?;

        match swapped {
            Ok(()) => Ok(rev),
            Err(_) => Err(StoreError::Conflict {
                id: doc.id.clone(),
                supplied: doc.rev.clone(),
            }),
        }
    }

    async fn find(
        &self,
        doctype: &str,
        selector: &Selector,
        limit: Option<usize>,
    ) -> Result<Vec<RawDoc>, StoreError> {
        let tree = self.tree(doctype)?;
        let selector = selector.clone();

        // full scan; acceptable at metadata scale, and callers bound the
        // hot queries with a page limit
        tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            for entry in tree.iter() {
                if limit.map_or(false, |l| out.len() >= l) {
                    break;
                }
                let (_, bytes) = entry.map_err(backend)?;
                let doc: RawDoc = serde_json::from_slice(&bytes)?;
                if selector.matches(&doc.data) {
                    out.push(doc);
                }
            }
            Ok(out)
        })
        .await
        .map_err(join_err)?
    }
}
