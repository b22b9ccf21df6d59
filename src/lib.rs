use chrono::Duration;
use config::{Config, ConfigError};
use serde::Deserialize;

pub mod domain;
pub mod infrastructure;
pub mod scheduler;

use crate::domain::court::BookingPolicy;

#[derive(Clone, Debug, Deserialize)]
pub struct CourtConfig {
    pub store: Store,
    pub policy: Policy,
    pub logger: Logger,
}

impl CourtConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(config::File::with_name("court").required(false))
            .add_source(
                config::Environment::with_prefix("COURT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<CourtConfig>()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("store.kind", "file")?
            .set_default("store.path", "tennis_court.json")?
            .set_default("store.url", "esdb://localhost:2113?tls=false")?
            .set_default("store.stream", "tennis_court")?
            .set_default("policy.lead_time_minutes", 60)?
            .set_default("policy.weekly_limit", 2)?
            .set_default("policy.granularity_minutes", 30)?
            .set_default("policy.search_horizon_days", 365)?
            .set_default("logger.level", "INFO")
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Store {
    pub kind: StoreKind,
    pub path: String,
    pub url: String,
    pub stream: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    File,
    EventStore,
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Policy {
    pub lead_time_minutes: i64,
    pub weekly_limit: usize,
    pub granularity_minutes: i64,
    pub search_horizon_days: i64,
}

impl From<&Policy> for BookingPolicy {
    fn from(value: &Policy) -> Self {
        BookingPolicy {
            lead_time: Duration::minutes(value.lead_time_minutes),
            weekly_limit: value.weekly_limit,
            granularity: Duration::minutes(value.granularity_minutes),
            search_horizon: Duration::days(value.search_horizon_days),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Logger {
    pub level: Level,
}

#[derive(Clone, Debug, Deserialize)]
pub enum Level {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<&Level> for tracing::Level {
    fn from(value: &Level) -> Self {
        match value {
            Level::TRACE => tracing::Level::TRACE,
            Level::DEBUG => tracing::Level::DEBUG,
            Level::INFO => tracing::Level::INFO,
            Level::WARN => tracing::Level::WARN,
            Level::ERROR => tracing::Level::ERROR,
        }
    }
}
