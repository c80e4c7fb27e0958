//! Consistency validation
//!
//! Compares the result of a read against the same read on the other store.
//! Only list lengths are compared. Single entities, documents and scalars
//! have no cardinality and are skipped.
//!
//! Validation never fails the caller. Mismatches are logged at warn, passes
//! at debug, and a panicking comparison is swallowed and counted as skipped.

use dualstore_document::{Document, Value};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, warn};

/// Metric name for validation outcomes
pub const CONSISTENCY_CHECKS_METRIC: &str = "dualstore_consistency_checks_total";

/// Result shapes that can be compared by size
pub trait Cardinality {
    /// Element count, if the shape has one
    fn cardinality(&self) -> Option<usize> {
        None
    }
}

impl<T> Cardinality for Vec<T> {
    fn cardinality(&self) -> Option<usize> {
        Some(self.len())
    }
}

impl<T: Cardinality> Cardinality for Option<T> {
    fn cardinality(&self) -> Option<usize> {
        self.as_ref().and_then(Cardinality::cardinality)
    }
}

impl Cardinality for Document {}

impl Cardinality for Value {
    fn cardinality(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            _ => None,
        }
    }
}

impl Cardinality for () {}

/// Outcome of one comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Sizes agree
    Passed { count: usize },
    /// Sizes differ
    Mismatch { primary: usize, secondary: usize },
    /// Not comparable
    Skipped,
}

impl ValidationOutcome {
    /// Metric label
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Passed { .. } => "passed",
            Self::Mismatch { .. } => "mismatch",
            Self::Skipped => "skipped",
        }
    }
}

/// Validator counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidatorStats {
    /// Comparisons that agreed
    pub passed: u64,
    /// Comparisons that disagreed
    pub mismatched: u64,
    /// Comparisons that could not be made
    pub skipped: u64,
}

/// Cardinality comparator between the two stores' results
#[derive(Debug, Default)]
pub struct ConsistencyValidator {
    passed: AtomicU64,
    mismatched: AtomicU64,
    skipped: AtomicU64,
}

impl ConsistencyValidator {
    /// Create validator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare two results of `operation`
    ///
    /// Never panics and never returns an error.
    pub fn validate<T>(&self, operation: &str, primary: &T, secondary: &T) -> ValidationOutcome
    where
        T: Cardinality + ?Sized,
    {
        let compared = catch_unwind(AssertUnwindSafe(|| {
            (primary.cardinality(), secondary.cardinality())
        }));

        let outcome = match compared {
            Ok((Some(p), Some(s))) if p == s => {
                debug!(operation, count = p, "consistency check passed");
                ValidationOutcome::Passed { count: p }
            }
            Ok((Some(p), Some(s))) => {
                warn!(operation, primary = p, secondary = s, "consistency mismatch");
                ValidationOutcome::Mismatch {
                    primary: p,
                    secondary: s,
                }
            }
            Ok(_) => {
                debug!(operation, "result not comparable, skipping consistency check");
                ValidationOutcome::Skipped
            }
            Err(_) => {
                error!(operation, "consistency check panicked");
                ValidationOutcome::Skipped
            }
        };

        self.record(operation, outcome);
        outcome
    }

    /// Compare two fallible results; a failure on either side is skipped
    pub fn validate_results<T, E>(
        &self,
        operation: &str,
        primary: &Result<T, E>,
        secondary: &Result<T, E>,
    ) -> ValidationOutcome
    where
        T: Cardinality,
    {
        match (primary, secondary) {
            (Ok(p), Ok(s)) => self.validate(operation, p, s),
            _ => {
                debug!(operation, "read failed, skipping consistency check");
                self.record_skipped(operation);
                ValidationOutcome::Skipped
            }
        }
    }

    /// Count a check that could not run, e.g. the secondary read failed
    pub fn record_skipped(&self, operation: &str) {
        self.record(operation, ValidationOutcome::Skipped);
    }

    fn record(&self, operation: &str, outcome: ValidationOutcome) {
        let counter = match outcome {
            ValidationOutcome::Passed { .. } => &self.passed,
            ValidationOutcome::Mismatch { .. } => &self.mismatched,
            ValidationOutcome::Skipped => &self.skipped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            CONSISTENCY_CHECKS_METRIC,
            "operation" => operation.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }

    /// Snapshot counters
    #[must_use]
    pub fn stats(&self) -> ValidatorStats {
        ValidatorStats {
            passed: self.passed.load(Ordering::Relaxed),
            mismatched: self.mismatched.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}
