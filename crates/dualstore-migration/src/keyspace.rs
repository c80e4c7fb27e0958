//! Keyspace enumeration
//!
//! Discovers the migratable collections from the legacy store's system
//! catalog. Malformed catalog rows are skipped; catalog order is kept.

use crate::error::StoreError;
use crate::store::LegacyStore;
use dualstore_document::Document;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use tracing::{debug, info};

/// Bucket/scope/collection triple naming one legacy keyspace
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyspaceDescriptor {
    /// Container (bucket)
    pub bucket: String,
    /// Scope
    pub scope: String,
    /// Collection
    pub collection: String,
}

impl KeyspaceDescriptor {
    /// Create descriptor
    #[must_use]
    pub fn new(bucket: impl Into<String>, scope: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            scope: scope.into(),
            collection: collection.into(),
        }
    }

    /// Read a descriptor from a catalog row
    ///
    /// Accepts the catalog's nested shape (`{"keyspaces": {"bucket", "scope",
    /// "id"}}`) and a flat row with the same fields. Returns `None` when any
    /// field is missing or not a string.
    #[must_use]
    pub fn from_catalog_row(row: &Document) -> Option<Self> {
        let entry = row.get_document("keyspaces").unwrap_or(row);
        Some(Self::new(
            entry.get_str("bucket")?,
            entry.get_str("scope")?,
            entry.get_str("id")?,
        ))
    }

    /// Identifier used in reports: `bucket_scope_collection`
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}_{}_{}", self.bucket, self.scope, self.collection)
    }

    /// Target store collection receiving this keyspace
    #[inline]
    #[must_use]
    pub fn target_collection(&self) -> &str {
        &self.collection
    }
}

impl Display for KeyspaceDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.bucket, self.scope, self.collection)
    }
}

/// Lists migratable keyspaces from the legacy catalog
pub struct KeyspaceEnumerator<L: ?Sized> {
    legacy: Arc<L>,
}

impl<L: LegacyStore + ?Sized> KeyspaceEnumerator<L> {
    /// Create enumerator
    #[must_use]
    pub fn new(legacy: Arc<L>) -> Self {
        Self { legacy }
    }

    /// Descriptors in catalog order
    ///
    /// # Errors
    /// Returns `StoreError` if the catalog query fails
    pub async fn list_keyspaces(&self) -> Result<Vec<KeyspaceDescriptor>, StoreError> {
        let rows = self.legacy.list_catalog_keyspaces().await?;
        let total = rows.len();

        let keyspaces: Vec<_> = rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                let descriptor = KeyspaceDescriptor::from_catalog_row(row);
                if descriptor.is_none() {
                    debug!(row = idx, "skipping malformed catalog row");
                }
                descriptor
            })
            .collect();

        info!(found = keyspaces.len(), skipped = total - keyspaces.len(), "listed legacy keyspaces");
        Ok(keyspaces)
    }
}
