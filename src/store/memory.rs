use super::{Document, DocumentStore};
use crate::known_errors::NewsbreakResult;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// In-memory document storage, used by tests and the dev server.
#[derive(Clone)]
pub struct MemoryDocumentStore {
    documents: Arc<DashMap<(String, String), Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(DashMap::new()),
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn read(&self, collection: &str, key: &str) -> NewsbreakResult<Option<Document>> {
        Ok(self
            .documents
            .get(&(collection.to_string(), key.to_string()))
            .map(|doc| (*doc).clone()))
    }

    async fn write(
        &self,
        collection: &str,
        key: &str,
        doc: Document,
        merge: bool,
    ) -> NewsbreakResult<()> {
        let mut entry = self
            .documents
            .entry((collection.to_string(), key.to_string()))
            .or_default();
        if merge {
            for (field, value) in doc {
                entry.insert(field, value);
            }
        } else {
            *entry = doc;
        }
        Ok(())
    }

    async fn create(&self, collection: &str, key: &str, doc: Document) -> NewsbreakResult<bool> {
        // the entry guard makes create-if-absent atomic per key
        match self
            .documents
            .entry((collection.to_string(), key.to_string()))
        {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                vacant.insert(doc);
                Ok(true)
            }
        }
    }

    async fn delete(&self, collection: &str, key: &str) -> NewsbreakResult<()> {
        self.documents
            .remove(&(collection.to_string(), key.to_string()));
        Ok(())
    }
}
