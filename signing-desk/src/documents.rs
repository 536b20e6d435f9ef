//! Locally held originals, served to the renderer by URL.
//!
//! The renderer loads the original PDF from the desk rather than from the
//! backend. Each upload gets an opaque blob id that lives until the workspace
//! is reset or the connection closes.

use bytes::Bytes;
use dashmap::DashMap;
use tracing::debug;

/// An original PDF as uploaded by the user
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub filename: String,
    pub bytes: Bytes,
}

/// Shared store of uploaded originals, keyed by blob id
#[derive(Default)]
pub struct DocumentStore {
    documents: DashMap<String, StoredDocument>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a document and return its blob id
    pub fn insert(&self, filename: &str, bytes: Bytes) -> String {
        let blob_id = uuid::Uuid::new_v4().to_string();
        debug!(blob_id = %blob_id, filename = %filename, size = bytes.len(), "Stored original");
        self.documents.insert(
            blob_id.clone(),
            StoredDocument {
                filename: filename.to_string(),
                bytes,
            },
        );
        blob_id
    }

    pub fn get(&self, blob_id: &str) -> Option<StoredDocument> {
        self.documents.get(blob_id).map(|entry| entry.value().clone())
    }

    /// Forget a document; later requests for its URL get a 404
    pub fn revoke(&self, blob_id: &str) {
        if self.documents.remove(blob_id).is_some() {
            debug!(blob_id = %blob_id, "Revoked original");
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Path the renderer fetches the original from
    pub fn url_for(blob_id: &str) -> String {
        format!("/documents/{}", blob_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_revoke() {
        let store = DocumentStore::new();
        let id = store.insert("doc.pdf", Bytes::from_static(b"%PDF-1.4"));
        assert_eq!(store.len(), 1);

        let doc = store.get(&id).unwrap();
        assert_eq!(doc.filename, "doc.pdf");
        assert_eq!(&doc.bytes[..], b"%PDF-1.4");
        assert_eq!(DocumentStore::url_for(&id), format!("/documents/{}", id));

        store.revoke(&id);
        assert!(store.get(&id).is_none());
        assert_eq!(store.len(), 0);

        // Revoking twice is harmless
        store.revoke(&id);
    }

    #[test]
    fn test_ids_are_unique() {
        let store = DocumentStore::new();
        let a = store.insert("a.pdf", Bytes::from_static(b"%PDF-a"));
        let b = store.insert("a.pdf", Bytes::from_static(b"%PDF-b"));
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }
}
