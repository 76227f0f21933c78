//! Core identifier types and document constants for the VFS layer.

/// DocId: opaque identifier assigned by the document store.
pub type DocId = String;

/// Revision: opaque optimistic-concurrency token; compared, never interpreted.
pub type Revision = String;

/// Document type under which all filesystem records are stored.
pub const FS_DOC_TYPE: &str = "fs-node";

/// Type discriminator carried by directory documents.
pub const DIR_KIND: &str = "directory";

/// Type discriminator carried by file documents.
pub const FILE_KIND: &str = "file";

/// Well-known identifier of the tree root. The root is synthesized on lookup
/// and never persisted as a document.
pub const ROOT_DIR_ID: &str = "root-dir";
