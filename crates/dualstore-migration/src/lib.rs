//! Dualstore Migration
//!
//! Bulk migration of historical data from the legacy store into the target
//! store:
//! - Keyspace discovery from the legacy system catalog
//! - Per-keyspace fetch, key normalization and chunked bulk insert
//! - Bounded per-keyspace retry that never aborts the run
//! - Target index bootstrap and a cancellable startup hook
//!
//! # Example
//!
//! ```rust,ignore
//! use dualstore_migration::{MigrationEngine, MigrationSettings};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(legacy: Arc<dyn LegacyStore>, target: Arc<dyn TargetStore>) {
//! let engine = MigrationEngine::new(legacy, target)
//!     .with_settings(MigrationSettings::new().without_grace_period());
//!
//! let report = engine.run(&CancellationToken::new()).await;
//! println!("failed keyspaces: {:?}", report.failed);
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod keyspace;
pub mod report;
pub mod retry;
pub mod settings;
pub mod store;

// Re-exports for convenience
pub use bootstrap::{default_index_plan, ensure_indexes, PlannedIndex};
pub use engine::{prepare_record, spawn_on_startup, MigrationEngine, ID_FIELD};
pub use error::{MigrationError, StoreError};
pub use keyspace::{KeyspaceDescriptor, KeyspaceEnumerator};
pub use report::{BootstrapReport, KeyspaceOutcome, MigrationReport};
pub use retry::AttemptState;
pub use settings::MigrationSettings;
pub use store::{IndexKey, IndexOrder, IndexSpec, LegacyStatement, LegacyStore, TargetStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
