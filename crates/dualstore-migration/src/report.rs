//! Migration and bootstrap reports
//!
//! Built incrementally during a run and returned to the caller. Nothing is
//! persisted.

use serde::{Deserialize, Serialize};

/// A keyspace that migrated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyspaceOutcome {
    /// `bucket_scope_collection`
    pub keyspace: String,
    /// Target collection written
    pub collection: String,
    /// Documents inserted by the successful attempt
    pub documents: u64,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Result of one migration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Keyspaces migrated, in processing order
    pub completed: Vec<KeyspaceOutcome>,
    /// Keyspaces that failed every attempt
    pub failed: Vec<String>,
    /// Keyspaces with no records
    pub skipped_empty: Vec<String>,
    /// Documents inserted across completed keyspaces
    pub documents_migrated: u64,
    /// Catalog listing failure; no keyspace was processed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_error: Option<String>,
    /// Run stopped by cancellation
    pub cancelled: bool,
}

impl MigrationReport {
    /// Nothing failed and the run was not cancelled
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.catalog_error.is_none() && !self.cancelled
    }

    /// Keyspaces that reached a final outcome
    #[must_use]
    pub fn processed(&self) -> usize {
        self.completed.len() + self.failed.len() + self.skipped_empty.len()
    }

    pub(crate) fn record_completed(&mut self, outcome: KeyspaceOutcome) {
        self.documents_migrated += outcome.documents;
        self.completed.push(outcome);
    }
}

/// Result of target index bootstrap
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// `collection.index` created or already present
    pub ensured: Vec<String>,
    /// `collection.index` that could not be created
    pub failed: Vec<String>,
}

impl BootstrapReport {
    /// Every index is in place
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_only_without_failures_or_cancellation() {
        let mut report = MigrationReport::default();
        assert!(report.is_clean());

        report.record_completed(KeyspaceOutcome {
            keyspace: "b_s_route".into(),
            collection: "route".into(),
            documents: 250,
            attempts: 1,
        });
        assert!(report.is_clean());
        assert_eq!(report.documents_migrated, 250);

        report.failed.push("b_s_hotel".into());
        assert!(!report.is_clean());
        assert_eq!(report.processed(), 2);

        let cancelled = MigrationReport {
            cancelled: true,
            ..MigrationReport::default()
        };
        assert!(!cancelled.is_clean());
    }

    #[test]
    fn report_serializes_without_empty_catalog_error() {
        let json = serde_json::to_value(MigrationReport::default()).unwrap();
        assert!(json.get("catalog_error").is_none());
        assert_eq!(json["cancelled"], serde_json::json!(false));
    }
}
