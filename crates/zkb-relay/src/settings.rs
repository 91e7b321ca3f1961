//! Relay settings, loaded from an optional JSON file layered with
//! `ZKB_RELAY_*` environment variables.

use std::path::Path;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use zkb_core::base::Address;

/// Prefix of environment variables overriding file settings.
pub const ENV_PREFIX: &str = "ZKB_RELAY";

/// Default delay between polls of a ledger's event log.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
/// Default number of events read per page.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Maximum number of retry attempts for transient errors
pub const DEFAULT_MAX_RETRY_ATTEMPTS: u32 = 5;
/// Initial retry delay in milliseconds
pub const DEFAULT_INITIAL_RETRY_DELAY_MS: u64 = 500;
/// Maximum retry delay in milliseconds
pub const DEFAULT_MAX_RETRY_DELAY_MS: u64 = 10_000;
/// Factor for exponential backoff
pub const DEFAULT_BACKOFF_FACTOR: u32 = 2;
/// Default capacity of the stranded-deposit operator channel.
pub const DEFAULT_OPERATOR_CHANNEL_CAPACITY: usize = 64;

/// Errors that can occur when loading or validating relay settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file or environment could not be read or deserialized.
    #[error("Failed to load relay configuration: {0}")]
    Load(#[from] config::ConfigError),
    /// A setting that must be positive is zero.
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
    /// The retry delay bounds are inverted.
    #[error(
        "`max_retry_delay_ms` ({max}) must not be smaller than `initial_retry_delay_ms` ({initial})"
    )]
    RetryDelayOrder {
        /// Initial delay in milliseconds.
        initial: u64,
        /// Maximum delay in milliseconds.
        max: u64,
    },
}

/// Relay settings as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RelayConfig {
    /// Account the relay inserts commitments as. Defaults to each ledger's
    /// configured relayer, or its owner when none is set.
    #[schemars(with = "Option<String>")]
    pub relayer: Option<Address>,
    /// Delay between polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Number of events read per page.
    pub batch_size: usize,
    /// Retries after the first attempt of a transient failure.
    pub max_retry_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Upper bound on the retry delay, in milliseconds.
    pub max_retry_delay_ms: u64,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: u32,
    /// Capacity of the channel publishing stranded deposits.
    pub operator_channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            relayer: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
            initial_retry_delay_ms: DEFAULT_INITIAL_RETRY_DELAY_MS,
            max_retry_delay_ms: DEFAULT_MAX_RETRY_DELAY_MS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            operator_channel_capacity: DEFAULT_OPERATOR_CHANNEL_CAPACITY,
        }
    }
}

/// Relay settings that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRelayConfig {
    /// Account override for commitment inserts.
    pub relayer: Option<Address>,
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Number of events read per page.
    pub batch_size: usize,
    /// Retries after the first attempt.
    pub max_retry_attempts: u32,
    /// Delay before the first retry.
    pub initial_retry_delay: Duration,
    /// Upper bound on the retry delay.
    pub max_retry_delay: Duration,
    /// Backoff multiplier.
    pub backoff_factor: u32,
    /// Capacity of the operator channel.
    pub operator_channel_capacity: usize,
}

impl RelayConfig {
    /// Load settings from `path` (if given) with `ZKB_RELAY_*` overrides.
    ///
    /// # Errors
    /// Returns an error if the file is unreadable or a value has the wrong type.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`Self::load`], reading overrides from `env` instead of the process
    /// environment when given.
    pub(crate) fn load_with_env(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(true),
            );
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// JSON schema of the configuration file.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Self)
    }

    /// Check the settings and convert delays to durations.
    ///
    /// # Errors
    /// Returns an error if a count or delay that must be positive is zero, or
    /// the maximum retry delay is below the initial one.
    pub fn validate(self) -> Result<ValidatedRelayConfig, ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Zero("poll_interval_ms"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Zero("batch_size"));
        }
        if self.backoff_factor == 0 {
            return Err(ConfigError::Zero("backoff_factor"));
        }
        if self.operator_channel_capacity == 0 {
            return Err(ConfigError::Zero("operator_channel_capacity"));
        }
        if self.max_retry_delay_ms < self.initial_retry_delay_ms {
            return Err(ConfigError::RetryDelayOrder {
                initial: self.initial_retry_delay_ms,
                max: self.max_retry_delay_ms,
            });
        }

        Ok(ValidatedRelayConfig {
            relayer: self.relayer,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            batch_size: self.batch_size,
            max_retry_attempts: self.max_retry_attempts,
            initial_retry_delay: Duration::from_millis(self.initial_retry_delay_ms),
            max_retry_delay: Duration::from_millis(self.max_retry_delay_ms),
            backoff_factor: self.backoff_factor,
            operator_channel_capacity: self.operator_channel_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use test_utils::address;

    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RelayConfig::load_with_env(None, Some(config::Map::new()))
            .expect("defaults load");
        assert_eq!(config, RelayConfig::default());
        let validated = config.validate().expect("defaults validate");
        assert_eq!(validated.poll_interval, Duration::from_secs(2));
        assert_eq!(validated.max_retry_delay, Duration::from_secs(10));
    }

    #[test]
    fn file_values_are_overridden_by_env() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("temp file");
        write!(
            file,
            r#"{{ "batch_size": 7, "poll_interval_ms": 50, "relayer": "{}" }}"#,
            address!(0x0f)
        )
        .expect("write config");

        let env = config::Map::from([("ZKB_RELAY_BATCH_SIZE".to_owned(), "3".to_owned())]);
        let config = RelayConfig::load_with_env(Some(file.path()), Some(env)).expect("load");

        assert_eq!(config.batch_size, 3);
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.relayer, Some(address!(0x0f)));
        assert_eq!(config.max_retry_attempts, DEFAULT_MAX_RETRY_ATTEMPTS);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("relay.json");
        let result = RelayConfig::load_with_env(Some(&missing), Some(config::Map::new()));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let zero_batch = RelayConfig {
            batch_size: 0,
            ..RelayConfig::default()
        };
        assert!(matches!(
            zero_batch.validate(),
            Err(ConfigError::Zero("batch_size"))
        ));

        let inverted = RelayConfig {
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 10,
            ..RelayConfig::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigError::RetryDelayOrder {
                initial: 100,
                max: 10
            })
        ));
    }

    #[test]
    fn schema_lists_settings() {
        let schema = serde_json::to_value(RelayConfig::json_schema()).expect("schema to json");
        let properties = schema
            .get("properties")
            .and_then(serde_json::Value::as_object)
            .expect("object schema");
        assert!(properties.contains_key("batch_size"));
        assert!(properties.contains_key("relayer"));
    }
}
