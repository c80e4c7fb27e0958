//! Routing policy
//!
//! Stateless decisions from a [`FeatureConfig`] snapshot to the store(s) an
//! operation touches. Nothing is cached: every call re-reads the snapshot and,
//! for percentage shadowing, takes a fresh draw from the injected
//! [`PercentSource`].
//!
//! # Resolution
//!
//! - Read: explicit `couchbase`/`mongodb` wins; `auto` follows the deployment
//!   profile. On a legacy deployment, an `auto` read is additionally sent to
//!   the target store when a draw in `[0, 100)` falls below the shadow
//!   percentage.
//! - Write, per store: explicit `true`/`false` wins; `auto` writes to the
//!   store the deployment profile points at.
//! - Shadow write: both stores resolve to writable.

use crate::config::{FeatureConfig, ReadMode, Store, WriteMode};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws in `[0, 100)`
pub trait PercentSource: Send + Sync {
    /// Draw the next value, uniform over `0..100`
    fn draw_percent(&self) -> u32;
}

/// Draws from the calling thread's generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngSource;

impl PercentSource for ThreadRngSource {
    fn draw_percent(&self) -> u32 {
        rand::rng().random_range(0..100)
    }
}

/// Reproducible draws from a seeded generator
#[derive(Debug)]
pub struct SeededSource {
    rng: Mutex<StdRng>,
}

impl SeededSource {
    /// Create from seed
    #[inline]
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl PercentSource for SeededSource {
    fn draw_percent(&self) -> u32 {
        self.rng.lock().random_range(0..100)
    }
}

/// Replays a fixed cycle of draws
///
/// Values are taken modulo 100.
#[derive(Debug)]
pub struct SequenceSource {
    draws: Vec<u32>,
    cursor: Mutex<usize>,
}

impl SequenceSource {
    /// Create from draws; an empty list always yields 0
    #[must_use]
    pub fn new(draws: impl Into<Vec<u32>>) -> Self {
        Self {
            draws: draws.into(),
            cursor: Mutex::new(0),
        }
    }
}

impl PercentSource for SequenceSource {
    fn draw_percent(&self) -> u32 {
        if self.draws.is_empty() {
            return 0;
        }
        let mut cursor = self.cursor.lock();
        let value = self.draws[*cursor % self.draws.len()] % 100;
        *cursor += 1;
        value
    }
}

/// Set of stores a write goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteTargets {
    legacy: bool,
    target: bool,
}

impl WriteTargets {
    /// Build from flags
    #[inline]
    #[must_use]
    pub const fn new(legacy: bool, target: bool) -> Self {
        Self { legacy, target }
    }

    /// Check membership
    #[inline]
    #[must_use]
    pub const fn contains(&self, store: Store) -> bool {
        match store {
            Store::Legacy => self.legacy,
            Store::Target => self.target,
        }
    }

    /// Both stores are written
    #[inline]
    #[must_use]
    pub const fn is_shadow(&self) -> bool {
        self.legacy && self.target
    }

    /// No store is written
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.legacy && !self.target
    }

    /// Members, legacy first
    pub fn iter(&self) -> impl Iterator<Item = Store> + '_ {
        [Store::Legacy, Store::Target]
            .into_iter()
            .filter(move |s| self.contains(*s))
    }
}

/// Per-call routing decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Store serving the read
    pub read_target: Store,
    /// Stores the write goes to
    pub write_targets: WriteTargets,
    /// Store whose write result is returned to the caller
    pub primary_write: Store,
    /// Compare the read against the other store
    pub should_validate: bool,
}

/// Stateless routing decisions
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingPolicy;

impl RoutingPolicy {
    /// Read store ignoring percentage shadowing
    #[must_use]
    pub fn decide_read(config: &FeatureConfig) -> Store {
        config
            .read
            .explicit()
            .unwrap_or_else(|| config.profile.store())
    }

    /// Stores a write goes to
    #[must_use]
    pub fn decide_write(config: &FeatureConfig) -> WriteTargets {
        let profile_store = config.profile.store();
        let resolve = |mode: WriteMode, store: Store| match mode {
            WriteMode::On => true,
            WriteMode::Off => false,
            WriteMode::Auto => profile_store == store,
        };
        WriteTargets::new(
            resolve(config.write_legacy, Store::Legacy),
            resolve(config.write_target, Store::Target),
        )
    }

    /// Whether a draw falls inside the shadow percentage
    ///
    /// `draw` is expected in `[0, 100)`: 0% never shadows, 100% always does.
    #[inline]
    #[must_use]
    pub fn should_shadow_to_target(config: &FeatureConfig, draw: u32) -> bool {
        draw < config.shadow_percentage.get()
    }

    /// Read store including percentage shadowing
    ///
    /// A draw is only taken when the percentage can matter.
    pub fn route_read(config: &FeatureConfig, draws: &dyn PercentSource) -> Store {
        if config.read != ReadMode::Auto {
            return Self::decide_read(config);
        }
        let base = Self::decide_read(config);
        if base == Store::Legacy
            && config.shadow_percentage.get() > 0
            && Self::should_shadow_to_target(config, draws.draw_percent())
        {
            Store::Target
        } else {
            base
        }
    }

    /// Store whose write is authoritative for the caller
    ///
    /// A single resolved write target is primary. With both (shadow mode) or
    /// neither, the read preference without percentage decides, so a caller's
    /// write always lands somewhere.
    #[must_use]
    pub fn primary_write(config: &FeatureConfig) -> Store {
        let targets = Self::decide_write(config);
        match (targets.contains(Store::Legacy), targets.contains(Store::Target)) {
            (true, false) => Store::Legacy,
            (false, true) => Store::Target,
            _ => Self::decide_read(config),
        }
    }

    /// Full decision for one call
    pub fn decide(config: &FeatureConfig, draws: &dyn PercentSource) -> RoutingDecision {
        RoutingDecision {
            read_target: Self::route_read(config, draws),
            write_targets: Self::decide_write(config),
            primary_write: Self::primary_write(config),
            should_validate: config.validate_consistency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeploymentProfile, ShadowPercentage};

    fn pct(p: i64) -> ShadowPercentage {
        ShadowPercentage::new(p).unwrap()
    }

    #[test]
    fn explicit_read_wins_over_profile_and_percentage() {
        for profile in [DeploymentProfile::Legacy, DeploymentProfile::Target] {
            let config = FeatureConfig::new()
                .with_read(ReadMode::Legacy)
                .with_profile(profile)
                .with_shadow_percentage(ShadowPercentage::ALL);
            assert_eq!(RoutingPolicy::decide_read(&config), Store::Legacy);
            assert_eq!(RoutingPolicy::route_read(&config, &SequenceSource::new([0])), Store::Legacy);
        }

        let config = FeatureConfig::new().with_read(ReadMode::Target);
        assert_eq!(RoutingPolicy::decide_read(&config), Store::Target);
    }

    #[test]
    fn auto_on_target_profile_reads_and_writes_target() {
        let config = FeatureConfig::new().with_profile(DeploymentProfile::Target);
        assert_eq!(RoutingPolicy::decide_read(&config), Store::Target);
        assert_eq!(RoutingPolicy::decide_write(&config), WriteTargets::new(false, true));
        assert_eq!(RoutingPolicy::primary_write(&config), Store::Target);
    }

    #[test]
    fn auto_on_legacy_profile_reads_and_writes_legacy() {
        let config = FeatureConfig::new();
        assert_eq!(RoutingPolicy::decide_read(&config), Store::Legacy);
        assert_eq!(RoutingPolicy::decide_write(&config), WriteTargets::new(true, false));
    }

    #[test]
    fn explicit_write_flags_override_profile() {
        let config = FeatureConfig::new().with_writes(WriteMode::On, WriteMode::On);
        let targets = RoutingPolicy::decide_write(&config);
        assert!(targets.is_shadow());
        assert_eq!(targets.iter().collect::<Vec<_>>(), vec![Store::Legacy, Store::Target]);

        let config = FeatureConfig::new()
            .with_profile(DeploymentProfile::Target)
            .with_writes(WriteMode::Auto, WriteMode::Off);
        assert!(RoutingPolicy::decide_write(&config).is_empty());
    }

    #[test]
    fn primary_write_in_shadow_mode_follows_read_preference() {
        let config = FeatureConfig::new()
            .with_writes(WriteMode::On, WriteMode::On)
            .with_read(ReadMode::Target);
        assert_eq!(RoutingPolicy::primary_write(&config), Store::Target);

        let config = FeatureConfig::new().with_writes(WriteMode::On, WriteMode::On);
        assert_eq!(RoutingPolicy::primary_write(&config), Store::Legacy);
    }

    #[test]
    fn primary_write_ignores_percentage() {
        let config = FeatureConfig::new()
            .with_writes(WriteMode::On, WriteMode::On)
            .with_shadow_percentage(ShadowPercentage::ALL);
        assert_eq!(RoutingPolicy::primary_write(&config), Store::Legacy);
    }

    #[test]
    fn percentage_boundaries() {
        let never = FeatureConfig::new().with_shadow_percentage(ShadowPercentage::NONE);
        let always = FeatureConfig::new().with_shadow_percentage(ShadowPercentage::ALL);
        for draw in 0..100 {
            assert!(!RoutingPolicy::should_shadow_to_target(&never, draw));
            assert!(RoutingPolicy::should_shadow_to_target(&always, draw));
        }
    }

    #[test]
    fn percentage_threshold_is_strict() {
        let config = FeatureConfig::new().with_shadow_percentage(pct(30));
        assert!(RoutingPolicy::should_shadow_to_target(&config, 29));
        assert!(!RoutingPolicy::should_shadow_to_target(&config, 30));
    }

    #[test]
    fn zero_percentage_takes_no_draw() {
        let source = SequenceSource::new([0, 0, 0]);
        let config = FeatureConfig::new();
        assert_eq!(RoutingPolicy::route_read(&config, &source), Store::Legacy);
        assert_eq!(*source.cursor.lock(), 0);
    }

    #[test]
    fn shadow_split_matches_percentage() {
        let config = FeatureConfig::new().with_shadow_percentage(pct(30));
        let source = SeededSource::new(0x5EED);
        let trials = 10_000;
        let to_target = (0..trials)
            .filter(|_| RoutingPolicy::route_read(&config, &source) == Store::Target)
            .count();
        #[allow(clippy::cast_precision_loss)]
        let fraction = to_target as f64 / f64::from(trials);
        assert!((fraction - 0.30).abs() <= 0.02, "fraction was {fraction}");
    }

    #[test]
    fn decision_is_recomputed_per_call() {
        let config = FeatureConfig::new().with_shadow_percentage(pct(50));
        let source = SequenceSource::new([10, 90]);
        assert_eq!(RoutingPolicy::decide(&config, &source).read_target, Store::Target);
        assert_eq!(RoutingPolicy::decide(&config, &source).read_target, Store::Legacy);
    }

    #[test]
    fn sequence_source_cycles() {
        let source = SequenceSource::new([1, 250]);
        assert_eq!(source.draw_percent(), 1);
        assert_eq!(source.draw_percent(), 50);
        assert_eq!(source.draw_percent(), 1);
        assert_eq!(SequenceSource::new(Vec::new()).draw_percent(), 0);
    }
}
