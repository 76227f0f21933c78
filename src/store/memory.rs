//! In-memory document store
//!
//! Reference [`DocumentStore`] implementation used by tests and examples.
//! Documents live in one map per doctype behind a read-write lock, with the
//! same revision discipline as the durable backend.

use super::{assign_id, next_revision, DocumentStore, RawDoc, Selector, StoreError};
use crate::types::{DocId, Revision};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory [`DocumentStore`] with revision compare-and-swap.
#[derive(Default)]
pub struct MemoryDocStore {
    docs: RwLock<HashMap<String, HashMap<DocId, RawDoc>>>,
    seq: AtomicU64,
}

impl MemoryDocStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents stored under `doctype`.
    pub fn len(&self, doctype: &str) -> usize {
        self.docs.read().get(doctype).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, doctype: &str) -> bool {
        self.len(doctype) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocStore {
    async fn create(&self, doctype: &str, data: Value) -> Result<RawDoc, StoreError> {
        let id = assign_id(self.seq.fetch_add(1, Ordering::Relaxed));
        let rev = next_revision(None, &data)?;
        let doc = RawDoc {
            id: id.clone(),
            rev,
            data,
        };
        self.docs
            .write()
            .entry(doctype.to_string())
            .or_default()
            .insert(id, doc.clone());
        Ok(doc)
    }

    async fn get(&self, doctype: &str, id: &str) -> Result<RawDoc, StoreError> {
        self.docs
            .read()
            .get(doctype)
            .and_then(|m| m.get(id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                doctype: doctype.to_string(),
                id: id.to_string(),
            })
    }

    async fn update(&self, doctype: &str, doc: &RawDoc) -> Result<Revision, StoreError> {
        let mut docs = self.docs.write();
        let stored = docs
            .get_mut(doctype)
            .and_then(|m| m.get_mut(&doc.id))
            .ok_or_else(|| StoreError::NotFound {
                doctype: doctype.to_string(),
                id: doc.id.clone(),
            })?;
        if stored.rev != doc.rev {
            return Err(StoreError::Conflict {
                id: doc.id.clone(),
                supplied: doc.rev.clone(),
            });
        }
        let rev = next_revision(Some(&stored.rev), &doc.data)?;
        stored.rev = rev.clone();
        stored.data = doc.data.clone();
        Ok(rev)
    }

    async fn find(
        &self,
        doctype: &str,
        selector: &Selector,
        limit: Option<usize>,
    ) -> Result<Vec<RawDoc>, StoreError> {
        let docs = self.docs.read();
        let bucket = match docs.get(doctype) {
            Some(bucket) => bucket,
            None => return Ok(Vec::new()),
        };
        let mut out = Vec::new();
        for doc in bucket.values() {
            if limit.map_or(false, |l| out.len() >= l) {
                break;
            }
            if selector.matches(&doc.data) {
                out.push(doc.clone());
            }
        }
        Ok(out)
    }
}
