//! Run configuration
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! environment variables (optionally loaded from an env file), then whatever the
//! caller sets explicitly (the CLI applies its flags last).

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::{EntityKind, Percentage};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// I/O error reading a config file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed YAML
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Malformed env file
    #[error("Env file error: {0}")]
    EnvFile(#[from] dotenvy::Error),

    /// A value is out of range or unparsable
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Inclusive count range `min..=max`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub const fn new(min: usize, max: usize) -> Self {
        CountRange { min, max }
    }

    fn check(&self, key: &str) -> ConfigResult<()> {
        if self.min > self.max {
            return Err(invalid(key, format!("min {} > max {}", self.min, self.max)));
        }
        Ok(())
    }
}

/// Generation date range; `end` is the run's notion of "today"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for DateRange {
    fn default() -> Self {
        let end = Utc::now().date_naive();
        DateRange {
            start: end - Duration::days(30 * 365),
            end,
        }
    }
}

/// Generation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub num_institutions: usize,
    pub subsidiaries_per_institution: CountRange,
    pub addresses_per_entity: CountRange,
    pub beneficial_owners_per_entity: CountRange,
    pub risk_assessments_per_entity: CountRange,
    pub authorized_persons_per_entity: CountRange,
    pub documents_per_entity: CountRange,
    pub jurisdictions_per_entity: CountRange,
    pub accounts_per_entity: CountRange,
    pub transactions_per_account: CountRange,
    pub compliance_events_per_account: CountRange,
    pub date_range: DateRange,
    /// Fixed seed for reproducible runs; entropy-seeded when absent
    pub seed: Option<u64>,
    /// Probability that an institution is rated high risk
    pub high_risk_percentage: f64,
    /// Smallest beneficial-owner share, in percent
    pub min_owner_share: f64,
    /// How far back transactions may be dated
    pub transaction_lookback_days: i64,
    /// Whether subsidiaries get their own satellite records and accounts
    pub satellites_for_subsidiaries: bool,
    /// Institution fragments grouped into one persistence round
    pub institutions_per_round: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            num_institutions: 2,
            subsidiaries_per_institution: CountRange::new(1, 3),
            addresses_per_entity: CountRange::new(1, 3),
            beneficial_owners_per_entity: CountRange::new(1, 3),
            risk_assessments_per_entity: CountRange::new(2, 4),
            authorized_persons_per_entity: CountRange::new(2, 5),
            documents_per_entity: CountRange::new(1, 5),
            jurisdictions_per_entity: CountRange::new(1, 4),
            accounts_per_entity: CountRange::new(1, 5),
            transactions_per_account: CountRange::new(50, 200),
            compliance_events_per_account: CountRange::new(2, 6),
            date_range: DateRange::default(),
            seed: None,
            high_risk_percentage: 0.1,
            min_owner_share: 5.0,
            transaction_lookback_days: 730,
            satellites_for_subsidiaries: true,
            institutions_per_round: 100,
        }
    }
}

impl GeneratorConfig {
    pub fn min_owner_share(&self) -> Percentage {
        Percentage::from_f64(self.min_owner_share)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let ranges = [
            ("subsidiaries_per_institution", self.subsidiaries_per_institution),
            ("addresses_per_entity", self.addresses_per_entity),
            ("beneficial_owners_per_entity", self.beneficial_owners_per_entity),
            ("risk_assessments_per_entity", self.risk_assessments_per_entity),
            ("authorized_persons_per_entity", self.authorized_persons_per_entity),
            ("documents_per_entity", self.documents_per_entity),
            ("jurisdictions_per_entity", self.jurisdictions_per_entity),
            ("accounts_per_entity", self.accounts_per_entity),
            ("transactions_per_account", self.transactions_per_account),
            ("compliance_events_per_account", self.compliance_events_per_account),
        ];
        for (key, range) in ranges {
            range.check(key)?;
        }

        if (self.date_range.end - self.date_range.start).num_days() < 2 * 365 {
            return Err(invalid(
                "date_range",
                "must span at least two years so incorporation and onboarding windows exist",
            ));
        }
        if !(0.0..=1.0).contains(&self.high_risk_percentage) {
            return Err(invalid("high_risk_percentage", "must be within [0, 1]"));
        }
        let max_owners = self.beneficial_owners_per_entity.max as u64;
        let min_share = u64::from(self.min_owner_share().hundredths().max(1));
        if self.min_owner_share <= 0.0 || max_owners * min_share > 10_000 {
            return Err(invalid(
                "min_owner_share",
                format!("{} owners cannot each hold {}%", max_owners, self.min_owner_share),
            ));
        }
        if self.beneficial_owners_per_entity.min == 0 {
            return Err(invalid("beneficial_owners_per_entity", "every entity needs an owner"));
        }
        if self.transaction_lookback_days <= 0 {
            return Err(invalid("transaction_lookback_days", "must be positive"));
        }
        if self.institutions_per_round == 0 {
            return Err(invalid("institutions_per_round", "must be positive"));
        }
        Ok(())
    }
}

/// Sub-batching and worker-pool settings for persistence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Records per adapter call unless overridden per kind
    pub default_size: usize,
    pub per_kind: HashMap<EntityKind, usize>,
    /// Sub-batches of one kind in flight at once, per store
    pub max_parallel_sub_batches: usize,
    /// Deadline for one adapter call
    pub call_timeout_ms: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            default_size: 1000,
            per_kind: HashMap::new(),
            max_parallel_sub_batches: 4,
            call_timeout_ms: 30_000,
        }
    }
}

impl BatchSettings {
    pub fn size_for(&self, kind: EntityKind) -> usize {
        self.per_kind
            .get(&kind)
            .copied()
            .unwrap_or(self.default_size)
            .max(1)
    }

    pub fn call_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.call_timeout_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_size == 0 || self.per_kind.values().any(|&size| size == 0) {
            return Err(invalid("batch.size", "must be positive"));
        }
        if self.max_parallel_sub_batches == 0 {
            return Err(invalid("batch.max_parallel_sub_batches", "must be positive"));
        }
        if self.call_timeout_ms == 0 {
            return Err(invalid("batch.call_timeout_ms", "must be positive"));
        }
        Ok(())
    }
}

/// Which graph backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphBackendKind {
    /// In-process property graph
    #[default]
    Embedded,
    /// Neo4j over Bolt (requires the `neo4j` feature)
    Neo4j,
}

impl std::str::FromStr for GraphBackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "embedded" | "memory" => Ok(GraphBackendKind::Embedded),
            "neo4j" => Ok(GraphBackendKind::Neo4j),
            other => Err(invalid("graph_backend", format!("unknown backend '{}'", other))),
        }
    }
}

/// Store connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite URL, e.g. `sqlite://finsynth.db?mode=rwc` or `sqlite::memory:`
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
    pub graph_backend: GraphBackendKind,
    pub neo4j_uri: String,
    pub neo4j_user: String,
    pub neo4j_password: String,
    /// JSON snapshot file for the embedded graph
    pub graph_snapshot: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://finsynth.db?mode=rwc".to_string(),
            max_connections: 5,
            acquire_timeout_ms: 10_000,
            graph_backend: GraphBackendKind::Embedded,
            neo4j_uri: "127.0.0.1:7687".to_string(),
            neo4j_user: "neo4j".to_string(),
            neo4j_password: String::new(),
            graph_snapshot: None,
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generator: GeneratorConfig,
    pub batch: BatchSettings,
    pub store: StoreConfig,
}

impl Config {
    /// Load from a YAML file; missing sections keep their defaults
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Overlay values from the process environment
    pub fn apply_process_env(&mut self) -> ConfigResult<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary key lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.store.database_url = url;
        }
        if let Some(backend) = lookup("GRAPH_BACKEND") {
            self.store.graph_backend = backend.parse()?;
        }
        if let Some(uri) = lookup("NEO4J_URI") {
            self.store.neo4j_uri = uri;
        }
        if let Some(user) = lookup("NEO4J_USER") {
            self.store.neo4j_user = user;
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.store.neo4j_password = password;
        }
        if let Some(path) = lookup("GRAPH_SNAPSHOT") {
            self.store.graph_snapshot = Some(PathBuf::from(path));
        }
        if let Some(n) = parse_env(&lookup, "DATAGEN_NUM_INSTITUTIONS")? {
            self.generator.num_institutions = n;
        }
        if let Some(n) = parse_env(&lookup, "DATAGEN_MIN_TRANSACTIONS")? {
            self.generator.transactions_per_account.min = n;
        }
        if let Some(n) = parse_env(&lookup, "DATAGEN_MAX_TRANSACTIONS")? {
            self.generator.transactions_per_account.max = n;
        }
        if let Some(seed) = parse_env(&lookup, "DATAGEN_SEED")? {
            self.generator.seed = Some(seed);
        }
        if let Some(size) = parse_env(&lookup, "DATAGEN_BATCH_SIZE")? {
            self.batch.default_size = size;
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.generator.validate()?;
        self.batch.validate()?;
        if self.store.max_connections == 0 {
            return Err(invalid("store.max_connections", "must be positive"));
        }
        Ok(())
    }
}

fn parse_env<F, T>(lookup: &F, key: &str) -> ConfigResult<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| invalid(key, e.to_string())),
    }
}

/// Load `KEY=VALUE` pairs from an env file into the process environment.
///
/// Variables already set in the environment win. Returns `false` when the file
/// does not exist.
pub fn load_env_file(path: impl AsRef<Path>) -> ConfigResult<bool> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("Env file {:?} not found", path);
        return Ok(false);
    }
    dotenvy::from_path(path)?;
    info!("Loaded environment from {:?}", path);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.generator.num_institutions, 2);
        assert_eq!(config.batch.size_for(EntityKind::Transaction), 1000);
    }

    #[test]
    fn test_yaml_overrides_only_named_fields() {
        let yaml = r#"
generator:
  num_institutions: 7
  seed: 42
  subsidiaries_per_institution: { min: 1, max: 2 }
batch:
  default_size: 250
  per_kind:
    transaction: 500
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.generator.num_institutions, 7);
        assert_eq!(config.generator.seed, Some(42));
        assert_eq!(config.generator.subsidiaries_per_institution, CountRange::new(1, 2));
        assert_eq!(config.generator.addresses_per_entity, CountRange::new(1, 3));
        assert_eq!(config.batch.size_for(EntityKind::Transaction), 500);
        assert_eq!(config.batch.size_for(EntityKind::Account), 250);
    }

    #[test]
    fn test_env_overlay() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("DATABASE_URL", "sqlite::memory:"),
                ("GRAPH_BACKEND", "embedded"),
                ("DATAGEN_NUM_INSTITUTIONS", "12"),
                ("DATAGEN_MIN_TRANSACTIONS", "5"),
                ("DATAGEN_MAX_TRANSACTIONS", "9"),
                ("DATAGEN_SEED", "99"),
            ]))
            .unwrap();
        assert_eq!(config.store.database_url, "sqlite::memory:");
        assert_eq!(config.generator.num_institutions, 12);
        assert_eq!(config.generator.transactions_per_account, CountRange::new(5, 9));
        assert_eq!(config.generator.seed, Some(99));
    }

    #[test]
    fn test_env_rejects_garbage() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("DATAGEN_NUM_INSTITUTIONS", "many")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "DATAGEN_NUM_INSTITUTIONS"));

        let err = config.apply_env(env(&[("GRAPH_BACKEND", "tinkerpop")])).unwrap_err();
        assert!(err.to_string().contains("tinkerpop"));
    }

    #[test]
    fn test_validation_catches_inverted_ranges() {
        let mut config = Config::default();
        config.generator.transactions_per_account = CountRange::new(10, 5);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.generator.min_owner_share = 40.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.batch.max_parallel_sub_batches = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_env_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!load_env_file(dir.path().join("absent.env")).unwrap());

        let path = dir.path().join("test.env");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "FINSYNTH_CONFIG_TEST_KEY=from-file").unwrap();
        assert!(load_env_file(&path).unwrap());
        assert_eq!(
            std::env::var("FINSYNTH_CONFIG_TEST_KEY").unwrap(),
            "from-file"
        );
    }
}
