//! VFS context handle
//!
//! Every directory operation receives an explicit [`Vfs`] naming the
//! document store, the physical backend, and the runtime configuration.
//! There is no ambient or process-global store state; two handles over
//! different stores are fully independent.

use crate::config::VfsConfig;
use crate::physical::PhysicalStore;
use crate::store::DocumentStore;
use std::sync::Arc;

/// Handle bundling the stores a directory operation works against.
///
/// Cheap to clone; clones share the same underlying stores.
#[derive(Clone)]
pub struct Vfs {
    docs: Arc<dyn DocumentStore>,
    physical: Arc<dyn PhysicalStore>,
    config: Arc<VfsConfig>,
}

impl Vfs {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        physical: Arc<dyn PhysicalStore>,
        config: VfsConfig,
    ) -> Self {
        Self {
            docs,
            physical,
            config: Arc::new(config),
        }
    }

    /// The document store behind this handle.
    pub fn docs(&self) -> &dyn DocumentStore {
        self.docs.as_ref()
    }

    /// The physical backend behind this handle.
    pub fn physical(&self) -> &dyn PhysicalStore {
        self.physical.as_ref()
    }

    pub fn config(&self) -> &VfsConfig {
        &self.config
    }
}
