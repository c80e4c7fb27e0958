//! Store collaborators
//!
//! The migration core talks to both stores through two narrow traits. Query
//! execution, connection handling and timeouts stay inside implementations.

use crate::error::StoreError;
use crate::keyspace::KeyspaceDescriptor;
use async_trait::async_trait;
use dualstore_document::Document;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Statement issued against the legacy store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyStatement {
    /// System catalog listing every keyspace
    Catalog,
    /// Every record of one keyspace plus its native identifier as `_id`
    KeyspaceProjection(KeyspaceDescriptor),
}

impl Display for LegacyStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => f.write_str("SELECT * FROM system:keyspaces"),
            Self::KeyspaceProjection(ks) => write!(
                f,
                "SELECT META().id as _id, `{c}`.* FROM `{b}`.`{s}`.`{c}`",
                b = ks.bucket,
                s = ks.scope,
                c = ks.collection
            ),
        }
    }
}

/// Legacy store client
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LegacyStore: Send + Sync {
    /// Execute a statement and return its rows
    async fn query(&self, statement: &LegacyStatement) -> Result<Vec<Document>, StoreError>;

    /// Raw system catalog rows
    async fn list_catalog_keyspaces(&self) -> Result<Vec<Document>, StoreError> {
        self.query(&LegacyStatement::Catalog).await
    }
}

/// Sort direction of an index key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexOrder {
    /// Ascending
    Ascending,
    /// Descending
    Descending,
}

/// One indexed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum IndexKey {
    /// Ordered key
    Ordered { field: String, order: IndexOrder },
    /// Full-text key with relevance weight
    Text { field: String, weight: f32 },
}

impl IndexKey {
    /// Ascending key
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self::Ordered {
            field: field.into(),
            order: IndexOrder::Ascending,
        }
    }

    /// Weighted text key
    #[must_use]
    pub fn text(field: impl Into<String>, weight: f32) -> Self {
        Self::Text {
            field: field.into(),
            weight,
        }
    }

    /// Indexed field name
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Ordered { field, .. } | Self::Text { field, .. } => field,
        }
    }
}

/// Target store index definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSpec {
    /// Explicit name; stores derive one from the keys when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Keys in index order
    pub keys: Vec<IndexKey>,
    /// Reject duplicate key values
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    /// Index over the given keys
    #[must_use]
    pub fn new(keys: Vec<IndexKey>) -> Self {
        Self {
            name: None,
            keys,
            unique: false,
        }
    }

    /// Single ascending key
    #[must_use]
    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(vec![IndexKey::ascending(field)])
    }

    /// Set name
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mark unique
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Explicit name or one derived from the keys (`field_1_other_1`)
    #[must_use]
    pub fn effective_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.keys
            .iter()
            .map(|key| match key {
                IndexKey::Ordered {
                    field,
                    order: IndexOrder::Ascending,
                } => format!("{field}_1"),
                IndexKey::Ordered {
                    field,
                    order: IndexOrder::Descending,
                } => format!("{field}_-1"),
                IndexKey::Text { field, .. } => format!("{field}_text"),
            })
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Target store client
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Insert documents into a collection in one call
    ///
    /// Each document carries its own `_id`.
    async fn bulk_insert(&self, collection: &str, documents: Vec<Document>) -> Result<(), StoreError>;

    /// Create the index if it does not exist
    async fn ensure_index(&self, collection: &str, index: &IndexSpec) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_statement_text() {
        assert_eq!(
            LegacyStatement::Catalog.to_string(),
            "SELECT * FROM system:keyspaces"
        );
    }

    #[test]
    fn projection_statement_text() {
        let ks = KeyspaceDescriptor::new("travel-sample", "inventory", "airline");
        assert_eq!(
            LegacyStatement::KeyspaceProjection(ks).to_string(),
            "SELECT META().id as _id, `airline`.* FROM `travel-sample`.`inventory`.`airline`"
        );
    }

    #[test]
    fn index_names() {
        let route = IndexSpec::new(vec![
            IndexKey::ascending("sourceairport"),
            IndexKey::ascending("destinationairport"),
        ]);
        assert_eq!(route.effective_name(), "sourceairport_1_destinationairport_1");
        assert_eq!(route.named("route_idx").effective_name(), "route_idx");
        assert!(IndexSpec::ascending("username").unique().unique);
    }
}
