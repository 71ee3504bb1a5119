//! Configuration for the coordination engine.
//!
//! Configuration can be set via environment variables:
//! - `CONSENSUS_THRESHOLD` - Optional. Default agreement threshold in [0, 1]. Defaults to `0.66`.
//! - `REVIEW_MODE` - Optional. `advisory` or `enforcing`. Defaults to `advisory`.
//! - `MAX_CONCURRENT_TASKS` - Optional. Cap on concurrently executing tasks. Defaults to `8`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// What a supervisor review does to a result.
///
/// The reference behavior computed reviews but never applied them; here
/// the effect is an explicit choice instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewMode {
    /// Review is recorded on the result but does not change the verdict
    #[default]
    Advisory,
    /// Review approval is folded into `success` and its quality score adopted
    Enforcing,
}

impl std::str::FromStr for ReviewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(Self::Advisory),
            "enforcing" => Ok(Self::Enforcing),
            other => Err(format!("unknown review mode '{other}'")),
        }
    }
}

/// Coordinator configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default agreement threshold for consensus rounds, in [0, 1]
    pub consensus_threshold: f64,

    /// Effect of supervisor reviews on results
    pub review_mode: ReviewMode,

    /// Cap on concurrently executing tasks in the multi-task entry points
    pub max_concurrent_tasks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            consensus_threshold: 0.66,
            review_mode: ReviewMode::default(),
            max_concurrent_tasks: 8,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparseable or out-of-range
    /// values.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("CONSENSUS_THRESHOLD") {
            let threshold: f64 = raw
                .parse()
                .map_err(|e| ConfigError::InvalidValue("CONSENSUS_THRESHOLD".to_string(), format!("{e}")))?;
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::InvalidValue(
                    "CONSENSUS_THRESHOLD".to_string(),
                    format!("{threshold} is outside [0, 1]"),
                ));
            }
            config.consensus_threshold = threshold;
        }

        if let Ok(raw) = std::env::var("REVIEW_MODE") {
            config.review_mode = raw
                .parse()
                .map_err(|e: String| ConfigError::InvalidValue("REVIEW_MODE".to_string(), e))?;
        }

        if let Ok(raw) = std::env::var("MAX_CONCURRENT_TASKS") {
            config.max_concurrent_tasks = raw
                .parse()
                .map_err(|e| ConfigError::InvalidValue("MAX_CONCURRENT_TASKS".to_string(), format!("{e}")))?;
        }

        Ok(config)
    }
}
