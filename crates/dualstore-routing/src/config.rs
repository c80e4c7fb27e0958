//! Feature configuration
//!
//! An immutable [`FeatureConfig`] snapshot drives every routing decision and
//! the migration start-up. Snapshots are built from flat `key=value`
//! properties, from TOML, and from environment overrides; live changes are
//! published through a [`tokio::sync::watch`] channel so each decision reads
//! exactly one snapshot.
//!
//! # Keys
//!
//! | key | values |
//! |---|---|
//! | `feature.database.read` | `couchbase` \| `mongodb` \| `auto` |
//! | `feature.database.write.couchbase` | `true` \| `false` \| `auto` |
//! | `feature.database.write.mongodb` | `true` \| `false` \| `auto` |
//! | `feature.database.validate` | bool |
//! | `feature.migration.enabled` | bool |
//! | `feature.shadow.percentage` | 0-100 |
//! | `deployment.profiles` | comma-separated profile names |

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

/// Read target override
pub const KEY_READ: &str = "feature.database.read";
/// Legacy store write mode
pub const KEY_WRITE_LEGACY: &str = "feature.database.write.couchbase";
/// Target store write mode
pub const KEY_WRITE_TARGET: &str = "feature.database.write.mongodb";
/// Consistency validation toggle
pub const KEY_VALIDATE: &str = "feature.database.validate";
/// Migration toggle
pub const KEY_MIGRATION_ENABLED: &str = "feature.migration.enabled";
/// Share of auto reads sent to the target store
pub const KEY_SHADOW_PERCENTAGE: &str = "feature.shadow.percentage";
/// Active deployment profiles
pub const KEY_PROFILES: &str = "deployment.profiles";

/// Environment variable → property key
const ENV_OVERRIDES: [(&str, &str); 7] = [
    ("FEATURE_DATABASE_READ", KEY_READ),
    ("FEATURE_DATABASE_WRITE_COUCHBASE", KEY_WRITE_LEGACY),
    ("FEATURE_DATABASE_WRITE_MONGODB", KEY_WRITE_TARGET),
    ("FEATURE_DATABASE_VALIDATE", KEY_VALIDATE),
    ("FEATURE_MIGRATION_ENABLED", KEY_MIGRATION_ENABLED),
    ("FEATURE_SHADOW_PERCENTAGE", KEY_SHADOW_PERCENTAGE),
    ("DEPLOYMENT_PROFILES", KEY_PROFILES),
];

/// Profile name that marks a target-store deployment
const TARGET_PROFILE: &str = "mongodb";

/// One of the two document stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    /// Store A, the system of record being migrated away from
    Legacy,
    /// Store B, the migration destination
    Target,
}

impl Store {
    /// The opposite store
    #[inline]
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Legacy => Self::Target,
            Self::Target => Self::Legacy,
        }
    }

    /// Stable label for logs and metrics
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Legacy => "legacy",
            Self::Target => "target",
        }
    }
}

impl Display for Store {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read target mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// Always read from the legacy store
    Legacy,
    /// Always read from the target store
    Target,
    /// Follow the deployment profile, with percentage shadowing
    #[default]
    Auto,
}

impl ReadMode {
    /// Explicit store, if any
    #[inline]
    #[must_use]
    pub const fn explicit(self) -> Option<Store> {
        match self {
            Self::Legacy => Some(Store::Legacy),
            Self::Target => Some(Store::Target),
            Self::Auto => None,
        }
    }
}

impl FromStr for ReadMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "couchbase" | "legacy" => Ok(Self::Legacy),
            "mongodb" | "target" => Ok(Self::Target),
            "auto" => Ok(Self::Auto),
            _ => Err(ConfigError::invalid(KEY_READ, s, "couchbase|mongodb|auto")),
        }
    }
}

impl Display for ReadMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Legacy => "couchbase",
            Self::Target => "mongodb",
            Self::Auto => "auto",
        })
    }
}

/// Per-store write mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Always write to this store
    On,
    /// Never write to this store
    Off,
    /// Write when the deployment profile points at this store
    #[default]
    Auto,
}

impl WriteMode {
    fn parse(key: &str, s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" => Ok(Self::On),
            "false" | "off" => Ok(Self::Off),
            "auto" => Ok(Self::Auto),
            _ => Err(ConfigError::invalid(key, s, "true|false|auto")),
        }
    }
}

impl Display for WriteMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::On => "true",
            Self::Off => "false",
            Self::Auto => "auto",
        })
    }
}

/// Active deployment profile
///
/// "Profile B" in routing terms is [`DeploymentProfile::Target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentProfile {
    /// Deployed against the legacy store
    #[default]
    Legacy,
    /// Deployed against the target store
    Target,
}

impl DeploymentProfile {
    /// Resolve from a comma-separated list of active profile names
    #[must_use]
    pub fn from_active_profiles(profiles: &str) -> Self {
        let is_target = profiles
            .split(',')
            .map(str::trim)
            .any(|p| p.eq_ignore_ascii_case(TARGET_PROFILE));
        if is_target {
            Self::Target
        } else {
            Self::Legacy
        }
    }

    /// Store this profile points at
    #[inline]
    #[must_use]
    pub const fn store(self) -> Store {
        match self {
            Self::Legacy => Store::Legacy,
            Self::Target => Store::Target,
        }
    }
}

/// Share of auto-mode reads sent to the target store, 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct ShadowPercentage(u8);

impl ShadowPercentage {
    /// Never shadow
    pub const NONE: Self = Self(0);
    /// Always shadow
    pub const ALL: Self = Self(100);

    /// Validate and wrap
    ///
    /// # Errors
    /// Returns `ConfigError::PercentageOutOfRange` outside 0..=100
    pub fn new(value: i64) -> Result<Self, ConfigError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= 100)
            .map(Self)
            .ok_or(ConfigError::PercentageOutOfRange(value))
    }

    /// Raw percentage
    #[inline]
    #[must_use]
    pub fn get(self) -> u32 {
        u32::from(self.0)
    }
}

impl TryFrom<i64> for ShadowPercentage {
    type Error = ConfigError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ShadowPercentage> for u8 {
    fn from(p: ShadowPercentage) -> Self {
        p.0
    }
}

/// Immutable feature configuration snapshot
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Read target mode
    pub read: ReadMode,
    /// Legacy store write mode
    pub write_legacy: WriteMode,
    /// Target store write mode
    pub write_target: WriteMode,
    /// Compare primary reads against the other store
    pub validate_consistency: bool,
    /// Run the bulk migration at start-up
    pub migration_enabled: bool,
    /// Share of auto reads sent to the target store
    pub shadow_percentage: ShadowPercentage,
    /// Active deployment profile
    pub profile: DeploymentProfile,
}

impl FeatureConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With read mode
    #[inline]
    #[must_use]
    pub fn with_read(mut self, read: ReadMode) -> Self {
        self.read = read;
        self
    }

    /// With both write modes
    #[inline]
    #[must_use]
    pub fn with_writes(mut self, legacy: WriteMode, target: WriteMode) -> Self {
        self.write_legacy = legacy;
        self.write_target = target;
        self
    }

    /// With consistency validation
    #[inline]
    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.validate_consistency = enabled;
        self
    }

    /// With migration toggle
    #[inline]
    #[must_use]
    pub fn with_migration(mut self, enabled: bool) -> Self {
        self.migration_enabled = enabled;
        self
    }

    /// With shadow percentage
    #[inline]
    #[must_use]
    pub fn with_shadow_percentage(mut self, percentage: ShadowPercentage) -> Self {
        self.shadow_percentage = percentage;
        self
    }

    /// With deployment profile
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, profile: DeploymentProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Whether the shadow percentage can influence any read
    ///
    /// Only auto reads on a legacy deployment are split; everywhere else the
    /// percentage is inert.
    #[must_use]
    pub fn shadow_percentage_effective(&self) -> bool {
        self.shadow_percentage.get() > 0
            && self.read == ReadMode::Auto
            && self.profile == DeploymentProfile::Legacy
    }

    /// Apply one property
    ///
    /// Returns `Ok(false)` for keys this configuration does not own.
    ///
    /// # Errors
    /// Returns `ConfigError` if the value is not valid for the key
    pub fn apply(&mut self, key: &str, value: &str) -> Result<bool, ConfigError> {
        let value = value.trim();
        match key {
            KEY_READ => self.read = value.parse()?,
            KEY_WRITE_LEGACY => self.write_legacy = WriteMode::parse(key, value)?,
            KEY_WRITE_TARGET => self.write_target = WriteMode::parse(key, value)?,
            KEY_VALIDATE => self.validate_consistency = parse_bool(key, value)?,
            KEY_MIGRATION_ENABLED => self.migration_enabled = parse_bool(key, value)?,
            KEY_SHADOW_PERCENTAGE => {
                let raw: i64 = value
                    .parse()
                    .map_err(|_| ConfigError::invalid(key, value, "integer 0-100"))?;
                self.shadow_percentage = ShadowPercentage::new(raw)?;
            }
            KEY_PROFILES => self.profile = DeploymentProfile::from_active_profiles(value),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Parse flat `key=value` properties
    ///
    /// Blank lines and lines starting with `#` or `!` are skipped; unknown
    /// keys are ignored.
    ///
    /// # Errors
    /// Returns `ConfigError` on a line without `=` or an invalid value
    pub fn from_properties(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::MalformedLine {
                line: idx + 1,
                content: line.to_string(),
            })?;
            let key = key.trim();
            if !config.apply(key, value)? {
                tracing::debug!(key, "ignoring unrecognised property");
            }
        }
        Ok(config)
    }

    /// Parse TOML with tables mirroring the dotted keys
    ///
    /// ```toml
    /// [feature.database]
    /// read = "auto"
    /// validate = true
    ///
    /// [feature.database.write]
    /// couchbase = true
    /// mongodb = "auto"
    ///
    /// [feature.shadow]
    /// percentage = 30
    /// ```
    ///
    /// # Errors
    /// Returns `ConfigError` on malformed TOML or an invalid value
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(text)?;
        let mut config = Self::default();
        for (key, value) in raw.into_properties() {
            config.apply(key, &value)?;
        }
        Ok(config)
    }

    /// Load from a file: `.toml` as TOML, anything else as properties
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&text)
        } else {
            Self::from_properties(&text)
        }
    }

    /// Overlay process environment variables
    ///
    /// # Errors
    /// Returns `ConfigError` if an override holds an invalid value
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(std::env::vars())
    }

    /// Overlay `(variable, value)` pairs using the environment naming
    ///
    /// # Errors
    /// Returns `ConfigError` if an override holds an invalid value
    pub fn with_overrides_from<I, K, V>(mut self, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            if let Some((_, key)) = ENV_OVERRIDES.iter().find(|(env, _)| *env == name.as_ref()) {
                self.apply(key, value.as_ref())?;
            }
        }
        Ok(self)
    }

    /// Log the resolved snapshot
    pub fn log_summary(&self) {
        tracing::info!(
            read = %self.read,
            write_legacy = %self.write_legacy,
            write_target = %self.write_target,
            validate = self.validate_consistency,
            migration = self.migration_enabled,
            shadow_percentage = self.shadow_percentage.get(),
            profile = ?self.profile,
            "feature configuration loaded"
        );
        if self.shadow_percentage.get() > 0 && !self.shadow_percentage_effective() {
            tracing::warn!(
                shadow_percentage = self.shadow_percentage.get(),
                "shadow percentage has no effect unless reads are auto on a legacy deployment"
            );
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "true|false")),
    }
}

/// Live configuration publisher
pub type ConfigSender = watch::Sender<Arc<FeatureConfig>>;

/// Live configuration subscriber
pub type ConfigReceiver = watch::Receiver<Arc<FeatureConfig>>;

/// Create a live configuration channel seeded with `initial`
#[must_use]
pub fn config_channel(initial: FeatureConfig) -> (ConfigSender, ConfigReceiver) {
    watch::channel(Arc::new(initial))
}

/// Take the current snapshot without holding the channel borrow
#[inline]
#[must_use]
pub fn snapshot(receiver: &ConfigReceiver) -> Arc<FeatureConfig> {
    Arc::clone(&receiver.borrow())
}

// TOML mirror of the dotted keys. Every field is optional so partial files
// layer over the defaults.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    feature: RawFeature,
    deployment: RawDeployment,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFeature {
    database: RawDatabase,
    migration: RawToggle,
    shadow: RawShadow,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDatabase {
    read: Option<String>,
    write: RawWrites,
    validate: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWrites {
    couchbase: Option<RawWriteMode>,
    mongodb: Option<RawWriteMode>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawWriteMode {
    Flag(bool),
    Text(String),
}

impl RawWriteMode {
    fn into_text(self) -> String {
        match self {
            Self::Flag(b) => b.to_string(),
            Self::Text(s) => s,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawToggle {
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawShadow {
    percentage: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawDeployment {
    profiles: Option<String>,
}

impl RawConfig {
    fn into_properties(self) -> Vec<(&'static str, String)> {
        let db = self.feature.database;
        [
            (KEY_READ, db.read),
            (KEY_WRITE_LEGACY, db.write.couchbase.map(RawWriteMode::into_text)),
            (KEY_WRITE_TARGET, db.write.mongodb.map(RawWriteMode::into_text)),
            (KEY_VALIDATE, db.validate.map(|b| b.to_string())),
            (
                KEY_MIGRATION_ENABLED,
                self.feature.migration.enabled.map(|b| b.to_string()),
            ),
            (
                KEY_SHADOW_PERCENTAGE,
                self.feature.shadow.percentage.map(|p| p.to_string()),
            ),
            (KEY_PROFILES, self.deployment.profiles),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_documented_values() {
        let config = FeatureConfig::default();
        assert_eq!(config.read, ReadMode::Auto);
        assert_eq!(config.write_legacy, WriteMode::Auto);
        assert_eq!(config.write_target, WriteMode::Auto);
        assert!(!config.validate_consistency);
        assert!(!config.migration_enabled);
        assert_eq!(config.shadow_percentage, ShadowPercentage::NONE);
        assert_eq!(config.profile, DeploymentProfile::Legacy);
    }

    #[test]
    fn properties_parse_every_key() {
        let text = "\
# shadow rollout
feature.database.read=MongoDB
feature.database.write.couchbase = true
feature.database.write.mongodb=auto
feature.database.validate=true
feature.migration.enabled=TRUE
feature.shadow.percentage=25
deployment.profiles=shadow, mongodb
server.port=8080
";
        let config = FeatureConfig::from_properties(text).unwrap();
        assert_eq!(
            config,
            FeatureConfig {
                read: ReadMode::Target,
                write_legacy: WriteMode::On,
                write_target: WriteMode::Auto,
                validate_consistency: true,
                migration_enabled: true,
                shadow_percentage: ShadowPercentage::new(25).unwrap(),
                profile: DeploymentProfile::Target,
            }
        );
    }

    #[test]
    fn properties_reject_bad_values() {
        assert!(matches!(
            FeatureConfig::from_properties("feature.database.read=postgres"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            FeatureConfig::from_properties("feature.shadow.percentage=101"),
            Err(ConfigError::PercentageOutOfRange(101))
        ));
        assert!(matches!(
            FeatureConfig::from_properties("feature.shadow.percentage=-1"),
            Err(ConfigError::PercentageOutOfRange(-1))
        ));
        assert!(matches!(
            FeatureConfig::from_properties("feature.database.validate=yes"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            FeatureConfig::from_properties("just a line"),
            Err(ConfigError::MalformedLine { line: 1, .. })
        ));
    }

    #[test]
    fn toml_accepts_bool_or_auto_for_writes() {
        let text = r#"
[feature.database]
read = "couchbase"
validate = true

[feature.database.write]
couchbase = true
mongodb = "auto"

[feature.migration]
enabled = true

[feature.shadow]
percentage = 100

[deployment]
profiles = "mongodb"
"#;
        let config = FeatureConfig::from_toml_str(text).unwrap();
        assert_eq!(config.read, ReadMode::Legacy);
        assert_eq!(config.write_legacy, WriteMode::On);
        assert_eq!(config.write_target, WriteMode::Auto);
        assert!(config.validate_consistency);
        assert!(config.migration_enabled);
        assert_eq!(config.shadow_percentage, ShadowPercentage::ALL);
        assert_eq!(config.profile, DeploymentProfile::Target);
    }

    #[test]
    fn toml_partial_file_keeps_defaults() {
        let config = FeatureConfig::from_toml_str("[feature.shadow]\npercentage = 5\n").unwrap();
        assert_eq!(config.read, ReadMode::Auto);
        assert_eq!(config.shadow_percentage.get(), 5);
    }

    #[test]
    fn env_overrides_layer_on_top() {
        let base = FeatureConfig::from_properties("feature.database.read=couchbase").unwrap();
        let config = base
            .with_overrides_from([
                ("FEATURE_DATABASE_READ", "auto"),
                ("FEATURE_SHADOW_PERCENTAGE", "40"),
                ("UNRELATED", "x"),
            ])
            .unwrap();
        assert_eq!(config.read, ReadMode::Auto);
        assert_eq!(config.shadow_percentage.get(), 40);
    }

    #[test]
    fn load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("features.toml");
        std::fs::write(&toml_path, "[feature.migration]\nenabled = true\n").unwrap();
        let props_path = dir.path().join("application.properties");
        std::fs::write(&props_path, "feature.migration.enabled=true\n").unwrap();

        assert!(FeatureConfig::load(&toml_path).unwrap().migration_enabled);
        assert!(FeatureConfig::load(&props_path).unwrap().migration_enabled);
        assert!(matches!(
            FeatureConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn profile_matching_is_by_name() {
        assert_eq!(
            DeploymentProfile::from_active_profiles("couchbase,shadow"),
            DeploymentProfile::Legacy
        );
        assert_eq!(
            DeploymentProfile::from_active_profiles(" MongoDB "),
            DeploymentProfile::Target
        );
        assert_eq!(DeploymentProfile::from_active_profiles(""), DeploymentProfile::Legacy);
    }

    #[test]
    fn percentage_effectiveness() {
        let pct = ShadowPercentage::new(30).unwrap();
        let base = FeatureConfig::new().with_shadow_percentage(pct);
        assert!(base.shadow_percentage_effective());
        assert!(!base.clone().with_read(ReadMode::Legacy).shadow_percentage_effective());
        assert!(!base.with_profile(DeploymentProfile::Target).shadow_percentage_effective());
    }

    #[test]
    fn live_channel_publishes_new_snapshots() {
        let (tx, rx) = config_channel(FeatureConfig::default());
        let before = snapshot(&rx);
        tx.send_replace(Arc::new(FeatureConfig::new().with_validation(true)));
        let after = snapshot(&rx);
        assert!(!before.validate_consistency);
        assert!(after.validate_consistency);
    }
}
