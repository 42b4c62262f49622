//! Engine settings.
//!
//! Values come from an optional file (TOML, JSON or YAML, by extension) overridden by
//! environment variables prefixed with `SCHEDULE_ENGINE`, using `__` between nested keys:
//!
//! - `SCHEDULE_ENGINE__WEIGHTING=duration_weighted`
//! - `SCHEDULE_ENGINE__ALERTS__UPCOMING_DAYS=14`
//!
//! Anything unset falls back to [`EngineConfig::default`].

use crate::calculations::alerts::AlertConfig;
use crate::calculations::progress::WeightingStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const ENV_PREFIX: &str = "SCHEDULE_ENGINE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub alerts: AlertConfig,
    pub weighting: WeightingStrategy,
}

impl EngineConfig {
    /// Loads and validates configuration from `path` (if any) plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let loaded: Self = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        tracing::debug!(
            weighting = loaded.weighting.as_str(),
            upcoming_days = loaded.alerts.upcoming_days,
            delay_threshold_days = loaded.alerts.delay_threshold_days,
            "engine configuration loaded"
        );
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let alerts = &self.alerts;
        if alerts.upcoming_days < 0 {
            return Err(ConfigError::Invalid(format!(
                "alerts.upcoming_days must not be negative (got {})",
                alerts.upcoming_days
            )));
        }
        if alerts.delay_threshold_days < 0 {
            return Err(ConfigError::Invalid(format!(
                "alerts.delay_threshold_days must not be negative (got {})",
                alerts.delay_threshold_days
            )));
        }
        if alerts.delay_threshold_days > alerts.upcoming_days {
            return Err(ConfigError::Invalid(format!(
                "alerts.delay_threshold_days ({}) exceeds alerts.upcoming_days ({})",
                alerts.delay_threshold_days, alerts.upcoming_days
            )));
        }
        Ok(())
    }
}
