//! Per-call routing inputs shared by the shadow services

use dualstore_routing::{snapshot, ConfigReceiver, FeatureConfig, PercentSource, ThreadRngSource};
use std::fmt;
use std::sync::Arc;

/// Live configuration and draw source for shadow services
#[derive(Clone)]
pub struct RoutingContext {
    config: ConfigReceiver,
    draws: Arc<dyn PercentSource>,
}

impl RoutingContext {
    /// Context drawing from the thread-local generator
    #[must_use]
    pub fn new(config: ConfigReceiver) -> Self {
        Self {
            config,
            draws: Arc::new(ThreadRngSource),
        }
    }

    /// Replace the draw source
    #[must_use]
    pub fn with_draws(mut self, draws: Arc<dyn PercentSource>) -> Self {
        self.draws = draws;
        self
    }

    /// Configuration snapshot for one call
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> Arc<FeatureConfig> {
        snapshot(&self.config)
    }

    /// Draw source
    #[inline]
    #[must_use]
    pub fn draws(&self) -> &dyn PercentSource {
        self.draws.as_ref()
    }
}

impl fmt::Debug for RoutingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingContext")
            .field("config", &*self.snapshot())
            .finish_non_exhaustive()
    }
}
