//! Shadow dispatcher
//!
//! Per-operation facade over a pair of store-specific services implementing
//! the same contract `S`:
//! - Reads go to the routed store; with validation on, the other store is
//!   read too (synchronously) and both results are compared.
//! - Writes go to the primary store and its result is returned unchanged.
//!   In shadow mode a successful primary write is mirrored to the other store
//!   through the [`ShadowWriterPool`], never awaited.
//!
//! Secondary failures are logged and never reach the caller.

use crate::config::{FeatureConfig, Store};
use crate::policy::{PercentSource, RoutingPolicy};
use crate::pool::ShadowWriterPool;
use crate::validator::{Cardinality, ConsistencyValidator};
use std::fmt::{self, Display};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Routes one entity contract across the legacy and target stores
pub struct ShadowDispatcher<S: ?Sized> {
    legacy: Arc<S>,
    target: Arc<S>,
    validator: Arc<ConsistencyValidator>,
    pool: Arc<ShadowWriterPool>,
}

impl<S: ?Sized> Clone for ShadowDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            legacy: Arc::clone(&self.legacy),
            target: Arc::clone(&self.target),
            validator: Arc::clone(&self.validator),
            pool: Arc::clone(&self.pool),
        }
    }
}

impl<S: ?Sized> fmt::Debug for ShadowDispatcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowDispatcher")
            .field("validator", &self.validator.stats())
            .field("pool", &self.pool.stats())
            .finish_non_exhaustive()
    }
}

impl<S: ?Sized + Send + Sync + 'static> ShadowDispatcher<S> {
    /// Create dispatcher with its own validator
    #[must_use]
    pub fn new(legacy: Arc<S>, target: Arc<S>, pool: Arc<ShadowWriterPool>) -> Self {
        Self {
            legacy,
            target,
            validator: Arc::new(ConsistencyValidator::new()),
            pool,
        }
    }

    /// Share a validator across dispatchers
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<ConsistencyValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Service backing a store
    #[inline]
    #[must_use]
    pub fn service(&self, store: Store) -> Arc<S> {
        match store {
            Store::Legacy => Arc::clone(&self.legacy),
            Store::Target => Arc::clone(&self.target),
        }
    }

    /// Validator used for reads
    #[inline]
    #[must_use]
    pub fn validator(&self) -> &ConsistencyValidator {
        &self.validator
    }

    /// Pool used for shadow writes
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &ShadowWriterPool {
        &self.pool
    }

    /// Run a read on the routed store
    ///
    /// # Errors
    /// The primary store's error, unchanged.
    pub async fn read<T, E, F, Fut>(
        &self,
        operation: &'static str,
        config: &FeatureConfig,
        draws: &dyn PercentSource,
        op: F,
    ) -> Result<T, E>
    where
        F: Fn(Arc<S>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        T: Cardinality,
        E: Display,
    {
        let primary = RoutingPolicy::route_read(config, draws);
        debug!(operation, store = %primary, "routing read");

        let result = op(self.service(primary)).await;
        if let Err(err) = &result {
            warn!(operation, store = %primary, error = %err, "primary read failed");
            return result;
        }

        if config.validate_consistency {
            let secondary_store = primary.other();
            let secondary = op(self.service(secondary_store)).await;
            if let Err(err) = &secondary {
                warn!(operation, store = %secondary_store, error = %err, "validation read failed");
            }
            self.validator.validate_results(operation, &result, &secondary);
        }

        result
    }

    /// Run a write on the primary store, mirroring it in shadow mode
    ///
    /// # Errors
    /// The primary store's error, unchanged. Shadow failures are only logged.
    pub async fn write<P, T, E, F, Fut>(
        &self,
        operation: &'static str,
        config: &FeatureConfig,
        payload: P,
        op: F,
    ) -> Result<T, E>
    where
        P: Clone + Send + 'static,
        F: Fn(Arc<S>, P) -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        let targets = RoutingPolicy::decide_write(config);
        let primary = RoutingPolicy::primary_write(config);
        if targets.is_empty() {
            warn!(operation, store = %primary, "no write store enabled, using read store");
        }
        debug!(operation, store = %primary, shadow = targets.is_shadow(), "routing write");

        let shadow_payload = targets.is_shadow().then(|| payload.clone());
        let result = op(self.service(primary), payload).await;

        match (&result, shadow_payload) {
            (Ok(_), Some(payload)) => {
                let secondary = primary.other();
                let pending = op(self.service(secondary), payload);
                let task = async move { pending.await.map(drop).map_err(|err| err.to_string()) };
                // rejection is logged and counted by the pool
                let _ = self.pool.submit(operation, secondary, task);
            }
            (Err(err), _) => {
                warn!(operation, store = %primary, error = %err, "primary write failed");
            }
            (Ok(_), None) => {}
        }

        result
    }
}
