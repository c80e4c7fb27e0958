//! Target index bootstrap
//!
//! Indexes the application's queries rely on in the target store. Each index
//! is ensured independently; a failure is logged and reported, never fatal.

use crate::report::BootstrapReport;
use crate::store::{IndexKey, IndexSpec, TargetStore};
use tracing::{error, info};

/// Index to ensure on a collection
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedIndex {
    /// Target collection
    pub collection: String,
    /// Index definition
    pub spec: IndexSpec,
}

impl PlannedIndex {
    /// Create planned index
    #[must_use]
    pub fn new(collection: impl Into<String>, spec: IndexSpec) -> Self {
        Self {
            collection: collection.into(),
            spec,
        }
    }

    /// `collection.index`
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}.{}", self.collection, self.spec.effective_name())
    }
}

/// Indexes used by hotel search, airport lookup, route search, bookings and users
#[must_use]
pub fn default_index_plan() -> Vec<PlannedIndex> {
    vec![
        PlannedIndex::new(
            "hotel",
            IndexSpec::new(vec![
                IndexKey::text("name", 3.0),
                IndexKey::text("description", 2.0),
                IndexKey::text("city", 2.0),
                IndexKey::text("country", 2.0),
                IndexKey::text("state", 1.0),
                IndexKey::text("address", 1.0),
            ])
            .named("hotels-index"),
        ),
        PlannedIndex::new("airport", IndexSpec::ascending("faa")),
        PlannedIndex::new("airport", IndexSpec::ascending("icao")),
        PlannedIndex::new("airport", IndexSpec::ascending("airportname")),
        PlannedIndex::new(
            "route",
            IndexSpec::new(vec![
                IndexKey::ascending("sourceairport"),
                IndexKey::ascending("destinationairport"),
            ])
            .named("route_idx"),
        ),
        PlannedIndex::new("bookings", IndexSpec::ascending("username")),
        PlannedIndex::new("users", IndexSpec::ascending("username").unique()),
    ]
}

/// Ensure every planned index, continuing past failures
pub async fn ensure_indexes<T>(target: &T, plan: &[PlannedIndex]) -> BootstrapReport
where
    T: TargetStore + ?Sized,
{
    let mut report = BootstrapReport::default();
    for planned in plan {
        let label = planned.label();
        match target.ensure_index(&planned.collection, &planned.spec).await {
            Ok(()) => {
                info!(index = %label, "index ensured");
                report.ensured.push(label);
            }
            Err(err) => {
                error!(index = %label, error = %err, "failed to ensure index");
                report.failed.push(label);
            }
        }
    }
    info!(
        ensured = report.ensured.len(),
        failed = report.failed.len(),
        "target index bootstrap finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MockTargetStore;

    #[test]
    fn default_plan_covers_application_queries() {
        let labels: Vec<_> = default_index_plan().iter().map(PlannedIndex::label).collect();
        assert_eq!(
            labels,
            vec![
                "hotel.hotels-index",
                "airport.faa_1",
                "airport.icao_1",
                "airport.airportname_1",
                "route.route_idx",
                "bookings.username_1",
                "users.username_1",
            ]
        );

        let users = default_index_plan().pop().unwrap();
        assert!(users.spec.unique);
    }

    #[tokio::test]
    async fn failures_do_not_stop_remaining_indexes() {
        let mut target = MockTargetStore::new();
        target
            .expect_ensure_index()
            .returning(|collection, _| {
                if collection == "airport" {
                    Err(StoreError::write(collection, "permission denied"))
                } else {
                    Ok(())
                }
            });

        let report = ensure_indexes(&target, &default_index_plan()).await;

        assert_eq!(report.failed.len(), 3);
        assert_eq!(report.ensured.len(), 4);
        assert!(!report.is_clean());
    }
}
