//! Testing utilities for the dualstore workspace
//!
//! Shared fakes and fixtures: in-memory legacy/target stores with scripted
//! failures, in-memory entity services, and sample travel data.

#![allow(missing_docs)]

pub mod fixtures;
pub mod services;
pub mod stores;

pub use fixtures::{catalog_row, doc, legacy_records, sample_booking, sample_hotels, sample_routes};
pub use services::{InMemoryBookingService, InMemoryFlightPathService, InMemoryHotelService};
pub use stores::{InMemoryLegacyStore, RecordingTargetStore};

use dualstore_routing::{FeatureConfig, SequenceSource, ShadowDispatcher, ShadowWriterPool};
use dualstore_services::RoutingContext;
use std::sync::Arc;

/// Dispatcher over two services with a small pool
pub fn dispatcher<S>(legacy: Arc<S>, target: Arc<S>) -> ShadowDispatcher<S>
where
    S: ?Sized + Send + Sync + 'static,
{
    ShadowDispatcher::new(legacy, target, Arc::new(ShadowWriterPool::new(2, 16)))
}

/// Routing context with a fixed configuration and scripted draws
pub fn context(config: FeatureConfig, draws: impl Into<Vec<u32>>) -> RoutingContext {
    let (tx, rx) = dualstore_routing::config_channel(config);
    // receivers keep the last value once the sender is gone
    drop(tx);
    RoutingContext::new(rx).with_draws(Arc::new(SequenceSource::new(draws)))
}
