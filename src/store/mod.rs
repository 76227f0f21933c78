//! Document store contract
//!
//! Revisioned document persistence with per-document optimistic concurrency
//! and a small selector language for field queries. The directory layer
//! talks to the store exclusively through [`DocumentStore`].

pub mod memory;
pub mod sled;

use crate::types::{DocId, Revision};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by document-store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found: {doctype}/{id}")]
    NotFound { doctype: String, id: DocId },

    #[error("revision conflict on {id}: supplied {supplied}")]
    Conflict { id: DocId, supplied: Revision },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

/// A raw revisioned record as held by a [`DocumentStore`].
///
/// `id` and `rev` live on the envelope; `data` is the JSON payload carrying
/// the `type` discriminator and everything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDoc {
    pub id: DocId,
    pub rev: Revision,
    pub data: Value,
}

/// Field selectors understood by [`DocumentStore::find`].
#[derive(Debug, Clone)]
pub enum Selector {
    /// String field equals the given value.
    Equal { field: String, value: String },
    /// String field starts with the given prefix.
    StartsWith { field: String, prefix: String },
}

impl Selector {
    pub fn equal(field: &str, value: &str) -> Self {
        Selector::Equal {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub fn starts_with(field: &str, prefix: &str) -> Self {
        Selector::StartsWith {
            field: field.to_string(),
            prefix: prefix.to_string(),
        }
    }

    /// Whether a document payload matches this selector. Documents missing
    /// the field never match.
    pub fn matches(&self, data: &Value) -> bool {
        match self {
            Selector::Equal { field, value } => {
                data.get(field).and_then(Value::as_str) == Some(value.as_str())
            }
            Selector::StartsWith { field, prefix } => data
                .get(field)
                .and_then(Value::as_str)
                .map(|s| s.starts_with(prefix.as_str()))
                .unwrap_or(false),
        }
    }
}

/// Revisioned document database with per-document optimistic concurrency.
///
/// There are no multi-document transactions; every method is atomic for
/// exactly one document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new document. The store assigns the identifier and the
    /// first revision.
    async fn create(&self, doctype: &str, data: Value) -> Result<RawDoc, StoreError>;

    /// Fetch one document by identifier.
    async fn get(&self, doctype: &str, id: &str) -> Result<RawDoc, StoreError>;

    /// Compare-and-swap update: `doc.rev` must match the stored revision.
    /// Returns the newly assigned revision.
    async fn update(&self, doctype: &str, doc: &RawDoc) -> Result<Revision, StoreError>;

    /// All documents matching `selector`, unordered, capped at `limit`.
    async fn find(
        &self,
        doctype: &str,
        selector: &Selector,
        limit: Option<usize>,
    ) -> Result<Vec<RawDoc>, StoreError>;
}

/// Next revision token for a payload: `"<generation>-<digest>"`.
///
/// The generation counts successful mutations of the document; the digest
/// folds the payload so tokens differ across contents.
pub(crate) fn next_revision(current: Option<&str>, data: &Value) -> Result<Revision, StoreError> {
    let generation = match current {
        Some(rev) => {
            rev.split('-')
                .next()
                .and_then(|g| g.parse::<u64>().ok())
                .unwrap_or(0)
                + 1
        }
        None => 1,
    };
    let bytes = serde_json::to_vec(data)?;
    let digest = blake3::hash(&bytes);
    Ok(format!(
        "{}-{}",
        generation,
        hex::encode(&digest.as_bytes()[..8])
    ))
}

/// Mint a fresh opaque document identifier.
///
/// The wall-clock component keeps identifiers unique across restarts even
/// though the sequence counter starts over.
pub(crate) fn assign_id(seq: u64) -> DocId {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let digest = blake3::hash(format!("{}:{}", seq, now.as_nanos()).as_bytes());
    hex::encode(&digest.as_bytes()[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_selector_equal_matches_string_field() {
        let doc = json!({"parent_id": "abc", "name": "docs"});
        assert!(Selector::equal("parent_id", "abc").matches(&doc));
        assert!(!Selector::equal("parent_id", "xyz").matches(&doc));
        assert!(!Selector::equal("missing", "abc").matches(&doc));
    }

    #[test]
    fn test_selector_starts_with_matches_prefix() {
        let doc = json!({"path": "/docs/photos"});
        assert!(Selector::starts_with("path", "/docs/").matches(&doc));
        assert!(!Selector::starts_with("path", "/archive/").matches(&doc));
    }

    #[test]
    fn test_selector_ignores_non_string_fields() {
        let doc = json!({"path": 42});
        assert!(!Selector::equal("path", "42").matches(&doc));
        assert!(!Selector::starts_with("path", "4").matches(&doc));
    }

    #[test]
    fn test_next_revision_increments_generation() {
        let data = json!({"name": "docs"});
        let first = next_revision(None, &data).unwrap();
        assert!(first.starts_with("1-"));
        let second = next_revision(Some(&first), &data).unwrap();
        assert!(second.starts_with("2-"));
    }

    #[test]
    fn test_next_revision_digest_tracks_payload() {
        let a = next_revision(None, &json!({"name": "a"})).unwrap();
        let b = next_revision(None, &json!({"name": "b"})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_assign_id_is_unique_per_sequence() {
        let a = assign_id(1);
        let b = assign_id(2);
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
    }
}
