//! Spooler configuration.

use std::time::Duration;

use db::DbConfig;
use serde::{Deserialize, Serialize};
use spool_core::{Discipline, InvalidDiscipline};

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error(transparent)]
    Discipline(#[from] InvalidDiscipline),

    #[error("At least one worker is required")]
    NoWorkers,
}

/// Runtime settings for a spooler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoolerConfig {
    /// Number of workers.
    pub workers: usize,
    /// Time the simulated printer spends on each page, in milliseconds.
    pub page_ms: u64,
    /// Discipline at startup.
    pub discipline: Discipline,
    /// RocksDB directory for the completion registry. In-memory when unset.
    pub db_path: Option<String>,
    /// Jobs to submit at startup.
    pub demo_jobs: usize,
}

impl Default for SpoolerConfig {
    fn default() -> Self {
        Self {
            workers: 3,
            page_ms: 10_000,
            discipline: Discipline::Fifo,
            db_path: None,
            demo_jobs: 0,
        }
    }
}

impl SpoolerConfig {
    /// Read `SPOOLER_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, e.g. a map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup("SPOOLER_WORKERS") {
            config.workers = parse_number("SPOOLER_WORKERS", &value)?;
        }
        if let Some(value) = lookup("SPOOLER_PAGE_MS") {
            config.page_ms = parse_number("SPOOLER_PAGE_MS", &value)?;
        }
        if let Some(value) = lookup("SPOOLER_DISCIPLINE") {
            config.discipline = value.trim().parse()?;
        }
        if let Some(value) = lookup("SPOOLER_DB_PATH") {
            let value = value.trim();
            config.db_path = (!value.is_empty()).then(|| value.to_string());
        }
        if let Some(value) = lookup("SPOOLER_DEMO_JOBS") {
            config.demo_jobs = parse_number("SPOOLER_DEMO_JOBS", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_discipline(mut self, discipline: Discipline) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }

    pub fn page_duration(&self) -> Duration {
        Duration::from_millis(self.page_ms)
    }

    /// Registry database: RocksDB at `db_path`, or in-memory.
    pub fn db_config(&self) -> DbConfig {
        match &self.db_path {
            Some(path) => DbConfig::rocksdb(path.clone()),
            None => DbConfig::memory(),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    })
}
