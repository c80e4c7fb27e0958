//! In-memory store collaborators with scripted failures

use async_trait::async_trait;
use dualstore_document::Document;
use dualstore_migration::{IndexSpec, KeyspaceDescriptor, LegacyStatement, LegacyStore, StoreError, TargetStore};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::fixtures::catalog_row;

/// Legacy store serving fixed keyspaces
#[derive(Debug, Default)]
pub struct InMemoryLegacyStore {
    catalog: Vec<Document>,
    keyspaces: HashMap<String, Vec<Document>>,
    failures: Mutex<HashMap<String, u32>>,
    catalog_down: bool,
    statements: Mutex<Vec<String>>,
}

impl InMemoryLegacyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a keyspace and its catalog row
    pub fn with_keyspace(mut self, keyspace: &KeyspaceDescriptor, records: Vec<Document>) -> Self {
        self.catalog
            .push(catalog_row(&keyspace.bucket, &keyspace.scope, &keyspace.collection));
        self.keyspaces.insert(keyspace.id(), records);
        self
    }

    /// Append a raw catalog row
    pub fn with_catalog_row(mut self, row: Document) -> Self {
        self.catalog.push(row);
        self
    }

    /// Fail the next `times` projections of a keyspace
    pub fn failing(self, keyspace: &KeyspaceDescriptor, times: u32) -> Self {
        self.failures.lock().insert(keyspace.id(), times);
        self
    }

    /// Fail every catalog query
    pub fn with_catalog_down(mut self) -> Self {
        self.catalog_down = true;
        self
    }

    /// Statements executed, in order
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    /// Projections executed against a keyspace
    pub fn projections_of(&self, keyspace: &KeyspaceDescriptor) -> usize {
        let statement = LegacyStatement::KeyspaceProjection(keyspace.clone()).to_string();
        self.statements.lock().iter().filter(|s| **s == statement).count()
    }
}

#[async_trait]
impl LegacyStore for InMemoryLegacyStore {
    async fn query(&self, statement: &LegacyStatement) -> Result<Vec<Document>, StoreError> {
        self.statements.lock().push(statement.to_string());
        match statement {
            LegacyStatement::Catalog if self.catalog_down => {
                Err(StoreError::Unavailable("catalog offline".into()))
            }
            LegacyStatement::Catalog => Ok(self.catalog.clone()),
            LegacyStatement::KeyspaceProjection(keyspace) => {
                let id = keyspace.id();
                if let Some(remaining) = self.failures.lock().get_mut(&id) {
                    if *remaining > 0 {
                        *remaining -= 1;
                        return Err(StoreError::query(statement, "scripted failure"));
                    }
                }
                Ok(self.keyspaces.get(&id).cloned().unwrap_or_default())
            }
        }
    }
}

/// Target store recording every call
#[derive(Debug, Default)]
pub struct RecordingTargetStore {
    collections: Mutex<BTreeMap<String, Vec<Document>>>,
    batches: Mutex<Vec<(String, usize)>>,
    indexes: Mutex<Vec<(String, IndexSpec)>>,
    insert_failures: Mutex<HashMap<String, u32>>,
    index_failures: HashSet<String>,
}

impl RecordingTargetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` bulk inserts into a collection
    pub fn failing_inserts(self, collection: &str, times: u32) -> Self {
        self.insert_failures.lock().insert(collection.to_string(), times);
        self
    }

    /// Fail every index on a collection
    pub fn failing_indexes(mut self, collection: &str) -> Self {
        self.index_failures.insert(collection.to_string());
        self
    }

    /// Batch sizes written to a collection, in order
    pub fn batch_sizes(&self, collection: &str) -> Vec<usize> {
        self.batches
            .lock()
            .iter()
            .filter(|(c, _)| c == collection)
            .map(|(_, size)| *size)
            .collect()
    }

    /// Documents stored in a collection
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections.lock().get(collection).cloned().unwrap_or_default()
    }

    /// Collections written, sorted
    pub fn collections(&self) -> Vec<String> {
        self.collections.lock().keys().cloned().collect()
    }

    /// Indexes ensured
    pub fn indexes(&self) -> Vec<(String, IndexSpec)> {
        self.indexes.lock().clone()
    }
}

#[async_trait]
impl TargetStore for RecordingTargetStore {
    async fn bulk_insert(&self, collection: &str, documents: Vec<Document>) -> Result<(), StoreError> {
        if let Some(remaining) = self.insert_failures.lock().get_mut(collection) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(StoreError::write(collection, "scripted failure"));
            }
        }
        self.batches.lock().push((collection.to_string(), documents.len()));
        self.collections
            .lock()
            .entry(collection.to_string())
            .or_default()
            .extend(documents);
        Ok(())
    }

    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> Result<(), StoreError> {
        if self.index_failures.contains(collection) {
            return Err(StoreError::write(collection, "index build rejected"));
        }
        self.indexes.lock().push((collection.to_string(), index.clone()));
        Ok(())
    }
}
