//! Migration engine
//!
//! One run, one background worker:
//! 1. Wait the grace period (cancellable)
//! 2. Enumerate keyspaces from the legacy catalog
//! 3. Per keyspace, sequentially: fetch, transform, chunked bulk insert,
//!    retried as a whole up to the attempt bound
//!
//! A keyspace that exhausts its attempts is reported and the run moves on.
//! Chunks inserted by a failed attempt are not rolled back, so a retried
//! keyspace may hit duplicate identifiers in the target store.

use crate::bootstrap::{default_index_plan, ensure_indexes, PlannedIndex};
use crate::error::MigrationError;
use crate::keyspace::{KeyspaceDescriptor, KeyspaceEnumerator};
use crate::report::{BootstrapReport, KeyspaceOutcome, MigrationReport};
use crate::retry::AttemptState;
use crate::settings::MigrationSettings;
use crate::store::{LegacyStatement, LegacyStore, TargetStore};
use dualstore_document::{transform, Document, Value};
use dualstore_routing::FeatureConfig;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Metric name for keyspace outcomes
pub const MIGRATION_KEYSPACES_METRIC: &str = "dualstore_migration_keyspaces_total";

/// Metric name for inserted documents
pub const MIGRATION_DOCUMENTS_METRIC: &str = "dualstore_migration_documents_total";

/// Field carrying the native identifier
pub const ID_FIELD: &str = "_id";

/// Prepare one fetched record for the target store
///
/// The native identifier is lifted out before normalization and re-attached
/// verbatim, so it survives even when another field normalizes to `id`.
///
/// # Errors
/// Returns `MigrationError::MissingIdentifier` if `_id` is absent or not a string
pub fn prepare_record(
    keyspace: &KeyspaceDescriptor,
    index: usize,
    mut record: Document,
) -> Result<Document, MigrationError> {
    let Some(Value::String(id)) = record.remove(ID_FIELD) else {
        return Err(MigrationError::MissingIdentifier {
            keyspace: keyspace.id(),
            index,
        });
    };
    let mut document = transform(&record);
    document.insert(ID_FIELD, id);
    Ok(document)
}

enum AttemptResult {
    Migrated(u64),
    Empty,
}

/// Moves every legacy keyspace into the target store
pub struct MigrationEngine<L: ?Sized, T: ?Sized> {
    legacy: Arc<L>,
    target: Arc<T>,
    settings: MigrationSettings,
}

impl<L, T> MigrationEngine<L, T>
where
    L: LegacyStore + ?Sized,
    T: TargetStore + ?Sized,
{
    /// Create engine with default settings
    #[must_use]
    pub fn new(legacy: Arc<L>, target: Arc<T>) -> Self {
        Self {
            legacy,
            target,
            settings: MigrationSettings::default(),
        }
    }

    /// Replace settings
    #[must_use]
    pub fn with_settings(mut self, settings: MigrationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Current settings
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &MigrationSettings {
        &self.settings
    }

    /// Ensure the default target indexes
    pub async fn bootstrap(&self) -> BootstrapReport {
        self.bootstrap_with(&default_index_plan()).await
    }

    /// Ensure a custom set of target indexes
    pub async fn bootstrap_with(&self, plan: &[PlannedIndex]) -> BootstrapReport {
        ensure_indexes(self.target.as_ref(), plan).await
    }

    /// Wait the grace period, then migrate every keyspace
    pub async fn run(&self, cancel: &CancellationToken) -> MigrationReport {
        let grace = self.settings.grace_period();
        if !grace.is_zero() {
            info!(grace_secs = grace.as_secs(), "waiting for both stores before migrating");
            tokio::select! {
                () = cancel.cancelled() => {
                    warn!("migration cancelled during grace period");
                    return MigrationReport {
                        cancelled: true,
                        ..MigrationReport::default()
                    };
                }
                () = tokio::time::sleep(grace) => {}
            }
        }
        self.migrate_all(cancel).await
    }

    /// Migrate every keyspace now, without the grace period
    pub async fn migrate_all(&self, cancel: &CancellationToken) -> MigrationReport {
        info!("starting migration from legacy to target store");
        let mut report = MigrationReport::default();

        let enumerator = KeyspaceEnumerator::new(Arc::clone(&self.legacy));
        let keyspaces = match enumerator.list_keyspaces().await {
            Ok(keyspaces) => keyspaces,
            Err(err) => {
                error!(error = %err, "failed to list legacy keyspaces");
                report.catalog_error = Some(err.to_string());
                return report;
            }
        };

        for keyspace in &keyspaces {
            if cancel.is_cancelled() {
                warn!(remaining = keyspaces.len() - report.processed(), "migration cancelled");
                report.cancelled = true;
                break;
            }
            if let Err(MigrationError::Cancelled) = self.migrate_with_retry(keyspace, cancel, &mut report).await {
                report.cancelled = true;
                break;
            }
        }

        if report.failed.is_empty() {
            info!(
                completed = report.completed.len(),
                empty = report.skipped_empty.len(),
                documents = report.documents_migrated,
                "migration finished"
            );
        } else {
            warn!(
                failed = ?report.failed,
                completed = report.completed.len(),
                documents = report.documents_migrated,
                "migration finished with failed keyspaces"
            );
        }
        report
    }

    async fn migrate_with_retry(
        &self,
        keyspace: &KeyspaceDescriptor,
        cancel: &CancellationToken,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        let max_attempts = self.settings.max_attempts();
        let mut state = AttemptState::start();

        loop {
            match state {
                AttemptState::Attempting(attempt) => match self.migrate_keyspace(keyspace, cancel).await {
                    Ok(AttemptResult::Empty) => {
                        info!(keyspace = %keyspace, "keyspace empty, skipping");
                        metrics::counter!(MIGRATION_KEYSPACES_METRIC, "outcome" => "empty").increment(1);
                        report.skipped_empty.push(keyspace.id());
                        state = state.on_success();
                    }
                    Ok(AttemptResult::Migrated(documents)) => {
                        info!(keyspace = %keyspace, documents, attempt, "keyspace migrated");
                        metrics::counter!(MIGRATION_KEYSPACES_METRIC, "outcome" => "completed").increment(1);
                        report.record_completed(KeyspaceOutcome {
                            keyspace: keyspace.id(),
                            collection: keyspace.target_collection().to_string(),
                            documents,
                            attempts: attempt,
                        });
                        state = state.on_success();
                    }
                    Err(err) if !err.is_retryable() => {
                        warn!(keyspace = %keyspace, attempt, error = %err, "keyspace migration stopped");
                        return Err(err);
                    }
                    Err(err) => {
                        error!(keyspace = %keyspace, attempt, max_attempts, error = %err, "keyspace migration attempt failed");
                        state = state.on_failure(max_attempts);
                        if !state.is_terminal() {
                            self.pause_before_retry(cancel).await?;
                        }
                    }
                },
                AttemptState::Succeeded => return Ok(()),
                AttemptState::Failed => {
                    metrics::counter!(MIGRATION_KEYSPACES_METRIC, "outcome" => "failed").increment(1);
                    report.failed.push(keyspace.id());
                    return Ok(());
                }
            }
        }
    }

    async fn pause_before_retry(&self, cancel: &CancellationToken) -> Result<(), MigrationError> {
        let pause = self.settings.retry_pause();
        if pause.is_zero() {
            return if cancel.is_cancelled() {
                Err(MigrationError::Cancelled)
            } else {
                Ok(())
            };
        }
        tokio::select! {
            () = cancel.cancelled() => Err(MigrationError::Cancelled),
            () = tokio::time::sleep(pause) => Ok(()),
        }
    }

    async fn migrate_keyspace(
        &self,
        keyspace: &KeyspaceDescriptor,
        cancel: &CancellationToken,
    ) -> Result<AttemptResult, MigrationError> {
        let statement = LegacyStatement::KeyspaceProjection(keyspace.clone());
        debug!(keyspace = %keyspace, statement = %statement, "fetching keyspace");

        let records = self.legacy.query(&statement).await?;
        if records.is_empty() {
            return Ok(AttemptResult::Empty);
        }

        let mut pending = records
            .into_iter()
            .enumerate()
            .map(|(index, record)| prepare_record(keyspace, index, record))
            .collect::<Result<Vec<_>, _>>()?;

        let collection = keyspace.target_collection();
        let total = pending.len();
        let chunk_size = self.settings.chunk_size();
        let mut inserted = 0_usize;

        while !pending.is_empty() {
            if cancel.is_cancelled() {
                return Err(MigrationError::Cancelled);
            }
            let rest = pending.split_off(chunk_size.min(pending.len()));
            let batch = std::mem::replace(&mut pending, rest);
            let size = batch.len();

            debug!(collection, from = inserted, to = inserted + size, total, "inserting chunk");
            self.target.bulk_insert(collection, batch).await?;
            inserted += size;
            metrics::counter!(MIGRATION_DOCUMENTS_METRIC).increment(size as u64);
        }

        Ok(AttemptResult::Migrated(inserted as u64))
    }
}

/// Start bootstrap and migration on a background task when enabled
///
/// Returns `None`, without spawning, when migration is disabled.
pub fn spawn_on_startup<L, T>(
    config: &FeatureConfig,
    engine: Arc<MigrationEngine<L, T>>,
    cancel: CancellationToken,
) -> Option<JoinHandle<MigrationReport>>
where
    L: LegacyStore + ?Sized + 'static,
    T: TargetStore + ?Sized + 'static,
{
    if !config.migration_enabled {
        info!("data migration disabled");
        return None;
    }

    info!("data migration enabled, scheduling background run");
    Some(tokio::spawn(async move {
        let bootstrap = engine.bootstrap().await;
        if !bootstrap.is_clean() {
            warn!(failed = ?bootstrap.failed, "continuing migration without some target indexes");
        }
        engine.run(&cancel).await
    }))
}
