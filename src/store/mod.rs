pub mod memory;
pub mod postgres;

use crate::known_errors::NewsbreakResult;

/// A stored document: a flat map of named JSON fields.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Extracts the field map from a `serde_json::json!` object literal.
pub fn fields(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// Keyed document storage.
///
/// No multi-key transaction is exposed; `create` is the only conditional
/// primitive, and it must be atomic per key in every implementation. The
/// username registry relies on that to keep claims linearizable per name.
pub trait DocumentStore: Clone + Send + Sync + 'static {
    async fn read(&self, collection: &str, key: &str) -> NewsbreakResult<Option<Document>>;

    /// Writes a document. With `merge` the given fields are folded into the
    /// existing document; without it the document is replaced.
    async fn write(
        &self,
        collection: &str,
        key: &str,
        doc: Document,
        merge: bool,
    ) -> NewsbreakResult<()>;

    /// Create-if-absent. Returns `false` without writing when the key
    /// already holds a document.
    async fn create(&self, collection: &str, key: &str, doc: Document) -> NewsbreakResult<bool>;

    async fn delete(&self, collection: &str, key: &str) -> NewsbreakResult<()>;
}
