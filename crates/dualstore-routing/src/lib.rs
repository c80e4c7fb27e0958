//! Dualstore Routing
//!
//! Runtime routing between a legacy and a target document store:
//! - Feature configuration (properties, TOML, environment) behind a watch channel
//! - Stateless read/write routing with percentage-based shadow reads
//! - Cardinality-based consistency validation
//! - Bounded, best-effort shadow writes
//! - A generic dispatcher tying the above to store-specific services
//!
//! # Example
//!
//! ```rust
//! use dualstore_routing::prelude::*;
//!
//! let config = FeatureConfig::from_properties(
//!     "feature.database.read=auto\nfeature.shadow.percentage=100\n",
//! )
//! .unwrap();
//!
//! let store = RoutingPolicy::route_read(&config, &SeededSource::new(7));
//! assert_eq!(store, Store::Target);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod policy;
pub mod pool;
pub mod validator;

// Re-exports for convenience
pub use config::{
    config_channel, snapshot, ConfigReceiver, ConfigSender, DeploymentProfile, FeatureConfig,
    ReadMode, ShadowPercentage, Store, WriteMode,
};
pub use dispatcher::ShadowDispatcher;
pub use error::{ConfigError, ShadowPoolError};
pub use policy::{
    PercentSource, RoutingDecision, RoutingPolicy, SeededSource, SequenceSource, ThreadRngSource,
    WriteTargets,
};
pub use pool::{ShadowPoolStats, ShadowWriterPool};
pub use validator::{Cardinality, ConsistencyValidator, ValidationOutcome, ValidatorStats};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for routing across the two stores
    pub use crate::{
        Cardinality, ConsistencyValidator, FeatureConfig, PercentSource, ReadMode, RoutingPolicy,
        SeededSource, ShadowDispatcher, ShadowWriterPool, Store, ThreadRngSource, WriteMode,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn reconfiguration_is_seen_by_next_decision() {
        let (tx, rx) = config_channel(FeatureConfig::new());
        let draws = SequenceSource::new([0]);

        assert_eq!(RoutingPolicy::route_read(&snapshot(&rx), &draws), Store::Legacy);

        tx.send_replace(std::sync::Arc::new(
            FeatureConfig::new().with_profile(DeploymentProfile::Target),
        ));
        assert_eq!(RoutingPolicy::route_read(&snapshot(&rx), &draws), Store::Target);
    }

    #[test]
    fn properties_drive_shadow_writes() {
        let config = FeatureConfig::from_properties(
            "feature.database.write.couchbase=true\nfeature.database.write.mongodb=true\n",
        )
        .unwrap();
        let decision = RoutingPolicy::decide(&config, &ThreadRngSource);
        assert!(decision.write_targets.is_shadow());
        assert_eq!(decision.primary_write, Store::Legacy);
        assert!(!decision.should_validate);
    }
}
