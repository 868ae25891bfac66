//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use backend_storage::queue::QueueConfig;
use chrono::TimeDelta;

/// Default number of days a ledger entry is kept
const DEFAULT_LEDGER_RETENTION_DAYS: i64 = 90;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Whether logs should be emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// Returns the number of processor tasks, honouring `NUM_WORKERS`
    #[must_use]
    pub fn num_workers(&self) -> usize {
        env::var("NUM_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(match self {
                Self::Production => 20,
                Self::Staging | Self::Development => 10,
            })
    }

    /// Returns the channel capacity between the poller and the processors
    #[must_use]
    pub fn channel_capacity(&self) -> usize {
        self.num_workers() * 2
    }

    /// Returns the bucket uploads land in
    ///
    /// # Panics
    ///
    /// Panics if the `S3_BUCKET_NAME` environment variable is not set outside development
    #[must_use]
    pub fn s3_bucket(&self) -> String {
        self.required_var("S3_BUCKET_NAME", "uploads-bucket")
    }

    /// Returns the idempotency ledger table name
    ///
    /// # Panics
    ///
    /// Panics if the `UPLOAD_LEDGER_TABLE_NAME` environment variable is not set outside development
    #[must_use]
    pub fn ledger_table_name(&self) -> String {
        self.required_var("UPLOAD_LEDGER_TABLE_NAME", "upload-ledger")
    }

    /// How long ledger entries are retained
    ///
    /// # Panics
    ///
    /// Panics if `LEDGER_RETENTION_DAYS` is set but not a positive number
    #[must_use]
    pub fn ledger_retention(&self) -> TimeDelta {
        let days = env::var("LEDGER_RETENTION_DAYS").map_or(DEFAULT_LEDGER_RETENTION_DAYS, |raw| {
            raw.trim()
                .parse::<i64>()
                .ok()
                .filter(|d| *d > 0)
                .unwrap_or_else(|| panic!("Invalid value for LEDGER_RETENTION_DAYS: {raw}"))
        });
        TimeDelta::days(days)
    }

    /// Returns the topic processing results are published to
    ///
    /// # Panics
    ///
    /// Panics if the `UPLOAD_RESULTS_TOPIC_ARN` environment variable is not set outside development
    #[must_use]
    pub fn results_topic_arn(&self) -> String {
        self.required_var(
            "UPLOAD_RESULTS_TOPIC_ARN",
            "arn:aws:sns:us-east-1:000000000000:upload-results",
        )
    }

    /// Returns the storage event queue configuration
    ///
    /// # Panics
    ///
    /// Panics if the `UPLOAD_EVENTS_QUEUE_URL` environment variable is not set outside development
    #[must_use]
    pub fn upload_events_queue_config(&self) -> QueueConfig {
        QueueConfig {
            queue_url: self.required_var(
                "UPLOAD_EVENTS_QUEUE_URL",
                "http://localhost:4566/000000000000/upload-events",
            ),
            default_max_messages: 10,
            // Processing budget of one delivery, including reading the object
            default_visibility_timeout: 120,
            default_wait_time_seconds: 20,
        }
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        if matches!(self, Self::Development) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }

    fn required_var(&self, name: &str, development_default: &str) -> String {
        match self {
            Self::Production | Self::Staging => env::var(name)
                .unwrap_or_else(|_| panic!("{name} environment variable is not set")),
            Self::Development => {
                env::var(name).unwrap_or_else(|_| development_default.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_environment_from_env() {
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Development);

        env::set_var("APP_ENV", "staging");
        assert_eq!(Environment::from_env(), Environment::Staging);

        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn test_num_workers_override() {
        env::remove_var("NUM_WORKERS");
        assert_eq!(Environment::Production.num_workers(), 20);
        assert_eq!(Environment::Development.num_workers(), 10);
        assert_eq!(Environment::Development.channel_capacity(), 20);

        env::set_var("NUM_WORKERS", "4");
        assert_eq!(Environment::Production.num_workers(), 4);

        env::set_var("NUM_WORKERS", "0");
        assert_eq!(Environment::Production.num_workers(), 20);

        env::remove_var("NUM_WORKERS");
    }

    #[test]
    #[serial]
    fn test_development_defaults() {
        for name in [
            "S3_BUCKET_NAME",
            "UPLOAD_LEDGER_TABLE_NAME",
            "UPLOAD_EVENTS_QUEUE_URL",
            "LEDGER_RETENTION_DAYS",
        ] {
            env::remove_var(name);
        }

        let env = Environment::Development;
        assert_eq!(env.s3_bucket(), "uploads-bucket");
        assert_eq!(env.ledger_table_name(), "upload-ledger");
        assert_eq!(env.ledger_retention(), TimeDelta::days(90));
        assert_eq!(
            env.upload_events_queue_config().queue_url,
            "http://localhost:4566/000000000000/upload-events"
        );
    }

    #[test]
    #[serial]
    #[should_panic(expected = "UPLOAD_LEDGER_TABLE_NAME environment variable is not set")]
    fn test_production_requires_table_name() {
        env::remove_var("UPLOAD_LEDGER_TABLE_NAME");
        let _ = Environment::Production.ledger_table_name();
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid value for LEDGER_RETENTION_DAYS")]
    fn test_invalid_retention() {
        env::set_var("LEDGER_RETENTION_DAYS", "-3");
        let _ = Environment::Development.ledger_retention();
    }
}
