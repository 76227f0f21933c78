//! Shared helpers for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use canopy::config::VfsConfig;
use canopy::physical::memory::MemoryFs;
use canopy::store::memory::MemoryDocStore;
use canopy::store::{DocumentStore, RawDoc, Selector, StoreError};
use canopy::tree::directory::{self, DirDoc};
use canopy::tree::path;
use canopy::types::{Revision, DIR_KIND, FILE_KIND, FS_DOC_TYPE};
use canopy::vfs::Vfs;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

/// Fresh in-memory context plus typed handles on both stores.
pub fn memory_vfs() -> (Vfs, Arc<MemoryDocStore>, Arc<MemoryFs>) {
    memory_vfs_with(VfsConfig::default())
}

pub fn memory_vfs_with(config: VfsConfig) -> (Vfs, Arc<MemoryDocStore>, Arc<MemoryFs>) {
    let docs = Arc::new(MemoryDocStore::new());
    let fs = Arc::new(MemoryFs::new());
    let vfs = Vfs::new(
        Arc::clone(&docs) as Arc<dyn DocumentStore>,
        Arc::clone(&fs) as Arc<dyn canopy::physical::PhysicalStore>,
        config,
    );
    (vfs, docs, fs)
}

/// Create a directory under `parent_id` ("" means the root).
pub async fn mkdir(vfs: &Vfs, name: &str, parent_id: &str) -> DirDoc {
    directory::create(vfs, DirDoc::new(name, parent_id, vec![]).unwrap())
        .await
        .unwrap()
}

/// Assert the core tree invariant over every stored directory: its
/// denormalized path is its parent's path joined with its own name.
pub async fn assert_tree_paths_consistent(vfs: &Vfs) {
    let dirs = vfs
        .docs()
        .find(FS_DOC_TYPE, &Selector::equal("type", DIR_KIND), None)
        .await
        .unwrap();
    for raw in dirs {
        let doc = directory::get(vfs, &raw.id).await.unwrap();
        let parent = directory::get(vfs, &doc.parent_id).await.unwrap();
        assert_eq!(
            doc.path,
            path::join(&parent.path, &doc.name),
            "path invariant broken for directory {}",
            doc.id
        );
    }
}

/// Seed a bare file document under `parent_id`.
pub async fn seed_file(vfs: &Vfs, name: &str, parent_id: &str) -> RawDoc {
    let now = chrono::Utc::now();
    vfs.docs()
        .create(
            FS_DOC_TYPE,
            json!({
                "type": FILE_KIND,
                "name": name,
                "parent_id": parent_id,
                "created_at": now,
                "updated_at": now,
                "tags": [],
            }),
        )
        .await
        .unwrap()
}

/// Document store wrapper that injects failures for chosen payloads.
///
/// A write fails when its payload carries a `path` listed for that write
/// kind; everything else is delegated to the in-memory store.
pub struct FailingDocStore {
    inner: MemoryDocStore,
    fail_create_paths: HashSet<String>,
    fail_update_paths: HashSet<String>,
}

impl FailingDocStore {
    pub fn new(fail_create_paths: &[&str], fail_update_paths: &[&str]) -> Self {
        Self {
            inner: MemoryDocStore::new(),
            fail_create_paths: fail_create_paths.iter().map(|s| s.to_string()).collect(),
            fail_update_paths: fail_update_paths.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn inner(&self) -> &MemoryDocStore {
        &self.inner
    }
}

fn payload_path(data: &Value) -> Option<&str> {
    data.get("path").and_then(Value::as_str)
}

#[async_trait]
impl DocumentStore for FailingDocStore {
    async fn create(&self, doctype: &str, data: Value) -> Result<RawDoc, StoreError> {
        if let Some(path) = payload_path(&data) {
            if self.fail_create_paths.contains(path) {
                return Err(StoreError::Backend(format!(
                    "injected create failure for {}",
                    path
                )));
            }
        }
        self.inner.create(doctype, data).await
    }

    async fn get(&self, doctype: &str, id: &str) -> Result<RawDoc, StoreError> {
        self.inner.get(doctype, id).await
    }

    async fn update(&self, doctype: &str, doc: &RawDoc) -> Result<Revision, StoreError> {
        if let Some(path) = payload_path(&doc.data) {
            if self.fail_update_paths.contains(path) {
                return Err(StoreError::Backend(format!(
                    "injected update failure for {}",
                    path
                )));
            }
        }
        self.inner.update(doctype, doc).await
    }

    async fn find(
        &self,
        doctype: &str,
        selector: &Selector,
        limit: Option<usize>,
    ) -> Result<Vec<RawDoc>, StoreError> {
        self.inner.find(doctype, selector, limit).await
    }
}

/// Context over a [`FailingDocStore`] and an in-memory physical backend.
pub fn failing_vfs(
    fail_create_paths: &[&str],
    fail_update_paths: &[&str],
) -> (Vfs, Arc<FailingDocStore>, Arc<MemoryFs>) {
    let docs = Arc::new(FailingDocStore::new(fail_create_paths, fail_update_paths));
    let fs = Arc::new(MemoryFs::new());
    let vfs = Vfs::new(
        Arc::clone(&docs) as Arc<dyn DocumentStore>,
        Arc::clone(&fs) as Arc<dyn canopy::physical::PhysicalStore>,
        VfsConfig::default(),
    );
    (vfs, docs, fs)
}
